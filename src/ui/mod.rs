// Host window

pub mod app;
