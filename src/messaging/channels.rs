// Lock-free channels between the control side and the audio callback

use crate::messaging::command::AudioCommand;
use crate::messaging::notification::Notification;
use ringbuf::{HeapRb, traits::Split};

/// Room for a few lookahead windows of clicks plus an asset swap
pub const COMMAND_CAPACITY: usize = 64;
pub const NOTIFICATION_CAPACITY: usize = 32;

pub type CommandProducer = ringbuf::HeapProd<AudioCommand>;
pub type CommandConsumer = ringbuf::HeapCons<AudioCommand>;

pub fn create_command_channel(capacity: usize) -> (CommandProducer, CommandConsumer) {
    let rb = HeapRb::<AudioCommand>::new(capacity);
    rb.split()
}

pub type NotificationProducer = ringbuf::HeapProd<Notification>;
pub type NotificationConsumer = ringbuf::HeapCons<Notification>;

pub fn create_notification_channel(
    capacity: usize,
) -> (NotificationProducer, NotificationConsumer) {
    let rb = HeapRb::<Notification>::new(capacity);
    rb.split()
}
