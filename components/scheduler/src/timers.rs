//! Registry of repeating user timers.

/// Handle of a registered timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u32);

#[derive(Debug)]
struct Timer<T> {
    id: TimerId,
    interval_ms: u64,
    next_due_ms: u64,
    payload: T,
}

/// Repeating timers keyed by [`TimerId`].
///
/// Time is passed in explicitly as milliseconds since the host's epoch, so
/// the registry itself never reads a clock.
///
/// # Examples
///
/// ```
/// use scheduler::TimerRegistry;
///
/// let mut timers = TimerRegistry::new();
/// let id = timers.register(100, "tick", 0);
/// assert!(timers.due(50).is_empty());
/// assert_eq!(timers.due(100), vec!["tick"]);
/// assert!(timers.cancel(id));
/// assert!(timers.is_empty());
/// ```
#[derive(Debug)]
pub struct TimerRegistry<T> {
    timers: Vec<Timer<T>>,
    next_id: u32,
}

impl<T> Default for TimerRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TimerRegistry<T> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            timers: Vec::new(),
            next_id: 0,
        }
    }

    /// Registers a timer firing every `interval_ms`, first at `now_ms + interval_ms`.
    pub fn register(&mut self, interval_ms: u64, payload: T, now_ms: u64) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        let interval_ms = interval_ms.max(1);
        self.timers.push(Timer {
            id,
            interval_ms,
            next_due_ms: now_ms + interval_ms,
            payload,
        });
        tracing::debug!(timer = id.0, interval_ms, "timer registered");
        id
    }

    /// Removes a timer; returns whether it existed.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.id != id);
        before != self.timers.len()
    }

    /// Returns true if no timer is registered.
    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Returns the number of registered timers.
    pub fn len(&self) -> usize {
        self.timers.len()
    }

    /// Detaches every timer.
    pub fn clear(&mut self) {
        self.timers.clear();
    }
}

impl<T: Clone> TimerRegistry<T> {
    /// Payloads of every timer due at `now_ms`, in registration order.
    ///
    /// Each due timer fires once and is rescheduled; missed periods are
    /// skipped rather than replayed.
    pub fn due(&mut self, now_ms: u64) -> Vec<T> {
        let mut fired = Vec::new();
        for timer in &mut self.timers {
            if timer.next_due_ms <= now_ms {
                fired.push(timer.payload.clone());
                timer.next_due_ms += timer.interval_ms;
                if timer.next_due_ms <= now_ms {
                    timer.next_due_ms = now_ms + timer.interval_ms;
                }
            }
        }
        fired
    }
}
