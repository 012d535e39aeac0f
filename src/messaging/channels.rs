// Canal de notifications lock-free vers l'UI

use crate::messaging::notification::Notification;
use ringbuf::traits::Producer;
use ringbuf::{HeapRb, traits::Split};
use std::sync::{Arc, Mutex};

pub type NotificationProducer = ringbuf::HeapProd<Notification>;
pub type NotificationConsumer = ringbuf::HeapCons<Notification>;

/// Producer shared by every thread that reports to the UI
pub type SharedNotifier = Arc<Mutex<NotificationProducer>>;

pub fn create_notification_channel(
    capacity: usize,
) -> (NotificationProducer, NotificationConsumer) {
    let rb = HeapRb::<Notification>::new(capacity);
    rb.split()
}

/// Push without blocking; dropped when the producer is busy or the queue full
pub fn notify(notifier: &SharedNotifier, notification: Notification) -> bool {
    match notifier.try_lock() {
        Ok(mut tx) => tx.try_push(notification).is_ok(),
        Err(_) => false,
    }
}
