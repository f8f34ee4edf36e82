//! Cooperative scheduling primitives for the execution engine.
//!
//! Nothing here is preemptive. The engine runs statements on host ticks and
//! interleaves externally triggered callbacks at step boundaries.
//!
//! # Overview
//!
//! - [`CallbackQueue`] - FIFO of pending callbacks with one reserved slot
//! - [`TimerRegistry`] - repeating user timers
//! - [`ListenerRegistry`] - event listeners by event name
//! - [`Ticker`] - per-tick step allowance and wall-clock budget
//!
//! # Examples
//!
//! ```
//! use scheduler::{CallbackQueue, TimerRegistry};
//!
//! let mut timers = TimerRegistry::new();
//! let mut queue = CallbackQueue::new();
//! timers.register(16, "animate", 0);
//!
//! for callback in timers.due(16) {
//!     queue.enqueue(callback);
//! }
//! assert_eq!(queue.claim(), Some("animate"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod listeners;
pub mod task_queue;
pub mod ticker;
pub mod timers;

pub use listeners::{ListenerId, ListenerRegistry};
pub use task_queue::CallbackQueue;
pub use ticker::Ticker;
pub use timers::{TimerId, TimerRegistry};
