// Messaging - Commands to the audio thread and notifications back to the UI

pub mod channels;
pub mod command;
pub mod notification;
