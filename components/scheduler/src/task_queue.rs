//! Queue of externally triggered callbacks.
//!
//! At most one callback interrupts the main program at a time. That
//! callback occupies the reserved slot until it finishes or suspends; the
//! others wait in FIFO order behind it.

use std::collections::VecDeque;

/// FIFO callback queue with a single reserved slot.
///
/// # Examples
///
/// ```
/// use scheduler::CallbackQueue;
///
/// let mut queue = CallbackQueue::new();
/// queue.enqueue("key pressed");
/// queue.enqueue("timer");
///
/// assert_eq!(queue.claim(), Some("key pressed"));
/// assert_eq!(queue.claim(), None); // slot taken
/// queue.release();
/// assert_eq!(queue.claim(), Some("timer"));
/// ```
#[derive(Debug)]
pub struct CallbackQueue<T> {
    waiting: VecDeque<T>,
    slot_taken: bool,
}

impl<T> Default for CallbackQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> CallbackQueue<T> {
    /// Creates an empty queue with a free slot.
    pub fn new() -> Self {
        Self {
            waiting: VecDeque::new(),
            slot_taken: false,
        }
    }

    /// Adds a callback to the end of the queue.
    pub fn enqueue(&mut self, callback: T) {
        self.waiting.push_back(callback);
    }

    /// Takes the oldest waiting callback into the reserved slot.
    ///
    /// Returns `None` while the slot is occupied or nothing is waiting.
    pub fn claim(&mut self) -> Option<T> {
        if self.slot_taken {
            return None;
        }
        let callback = self.waiting.pop_front()?;
        self.slot_taken = true;
        Some(callback)
    }

    /// Frees the reserved slot once its callback finished or suspended.
    pub fn release(&mut self) {
        self.slot_taken = false;
    }

    /// Returns true while a callback occupies the reserved slot.
    pub fn is_slot_taken(&self) -> bool {
        self.slot_taken
    }

    /// Returns the number of waiting callbacks.
    pub fn len(&self) -> usize {
        self.waiting.len()
    }

    /// Returns true if no callback is waiting.
    pub fn is_empty(&self) -> bool {
        self.waiting.is_empty()
    }

    /// Drops all waiting callbacks and frees the slot.
    pub fn clear(&mut self) {
        self.waiting.clear();
        self.slot_taken = false;
    }
}
