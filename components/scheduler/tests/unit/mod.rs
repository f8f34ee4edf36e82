//! Unit tests for the scheduling primitives

use scheduler::{CallbackQueue, Ticker, TimerRegistry};
use std::time::Duration;

#[test]
fn callbacks_run_fifo_one_at_a_time() {
    let mut queue = CallbackQueue::new();
    for i in 1..=3 {
        queue.enqueue(i);
    }

    let mut order = Vec::new();
    while let Some(callback) = queue.claim() {
        assert!(queue.claim().is_none());
        order.push(callback);
        queue.release();
    }
    assert_eq!(order, vec![1, 2, 3]);
}

#[test]
fn callback_enqueued_while_slot_taken_waits() {
    let mut queue = CallbackQueue::new();
    queue.enqueue("first");
    let running = queue.claim();
    queue.enqueue("second");

    assert_eq!(running, Some("first"));
    assert_eq!(queue.len(), 1);
    assert!(queue.claim().is_none());
    queue.release();
    assert_eq!(queue.claim(), Some("second"));
}

#[test]
fn timers_fire_in_registration_order() {
    let mut timers = TimerRegistry::new();
    timers.register(20, "slow", 0);
    timers.register(10, "fast", 0);

    assert_eq!(timers.due(10), vec!["fast"]);
    assert_eq!(timers.due(20), vec!["slow", "fast"]);
}

#[test]
fn clearing_timers_detaches_everything() {
    let mut timers = TimerRegistry::new();
    timers.register(5, (), 0);
    timers.register(5, (), 0);
    timers.clear();
    assert!(timers.is_empty());
    assert!(timers.due(100).is_empty());
}

#[test]
fn speed_limit_spreads_steps_over_ticks() {
    let mut ticker = Ticker::new(Duration::from_millis(100), Duration::from_millis(50), Some(25));
    let steps: Vec<usize> = (0..4).map(|_| ticker.step_allowance().unwrap()).collect();
    assert_eq!(steps.iter().sum::<usize>(), 10);
    assert!(steps.iter().all(|&s| s == 2 || s == 3));
}

#[test]
fn changing_speed_resets_carry() {
    let mut ticker = Ticker::new(Duration::from_millis(100), Duration::from_millis(50), Some(5));
    assert_eq!(ticker.step_allowance(), Some(0));
    ticker.set_speed(Some(20));
    assert_eq!(ticker.step_allowance(), Some(2));
    ticker.set_speed(None);
    assert_eq!(ticker.step_allowance(), None);
}
