use super::*;
use std::sync::{Arc, Mutex};

// ============================================================================
// Subscription tests
// ============================================================================

#[test]
fn test_send_reaches_every_subscriber_in_order() {
    let sender: EventSender<u32> = EventSender::new();
    let received = Arc::new(Mutex::new(Vec::new()));

    let first = received.clone();
    sender.subscribe(move |value| first.lock().unwrap().push(("first", *value)));
    let second = received.clone();
    sender.subscribe(move |value| second.lock().unwrap().push(("second", *value)));

    sender.send(&7);

    assert_eq!(*received.lock().unwrap(), vec![("first", 7), ("second", 7)]);
}

#[test]
fn test_unsubscribe_stops_delivery() {
    let sender: EventSender<()> = EventSender::new();
    let count = Arc::new(Mutex::new(0));

    let counter = count.clone();
    let id = sender.subscribe(move |_| *counter.lock().unwrap() += 1);
    sender.send(&());
    sender.unsubscribe(id);
    sender.send(&());

    assert_eq!(*count.lock().unwrap(), 1);
    assert_eq!(sender.subscriber_count(), 0);
}

#[test]
fn test_unsubscribe_unknown_id_is_ignored() {
    let sender: EventSender<u8> = EventSender::default();
    sender.subscribe(|_| {});
    sender.unsubscribe(42);
    assert_eq!(sender.subscriber_count(), 1);
}

#[test]
fn test_handlers_keep_state_between_events() {
    let sender: EventSender<i32> = EventSender::new();
    let total = Arc::new(Mutex::new(0));

    let sink = total.clone();
    let mut calls = 0;
    sender.subscribe(move |value| {
        calls += 1;
        *sink.lock().unwrap() = calls * *value;
    });

    sender.send(&5);
    sender.send(&5);

    assert_eq!(*total.lock().unwrap(), 10);
}
