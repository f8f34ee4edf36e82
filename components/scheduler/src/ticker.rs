//! Per-tick work budgeting.
//!
//! The host calls the engine once per tick. Each call may run statements
//! until its wall-clock budget is spent, and, when the user picked an
//! execution speed, until the tick's share of steps is used up.

use std::time::{Duration, Instant};

/// Converts tick period, budget and execution speed into per-tick limits
#[derive(Debug, Clone)]
pub struct Ticker {
    tick_period: Duration,
    work_budget: Duration,
    steps_per_second: Option<u32>,
    carry: f64,
}

impl Ticker {
    /// Creates a ticker; `steps_per_second: None` means full speed.
    pub fn new(tick_period: Duration, work_budget: Duration, steps_per_second: Option<u32>) -> Self {
        Self {
            tick_period,
            work_budget: work_budget.min(tick_period),
            steps_per_second,
            carry: 0.0,
        }
    }

    /// Host tick period
    pub fn tick_period(&self) -> Duration {
        self.tick_period
    }

    /// Changes the execution speed, dropping any fractional carry.
    pub fn set_speed(&mut self, steps_per_second: Option<u32>) {
        self.steps_per_second = steps_per_second;
        self.carry = 0.0;
    }

    /// Steps allowed in the next tick; `None` means unlimited.
    ///
    /// Fractions accumulate across ticks, so 10 steps per second at a 7 ms
    /// period yields one step roughly every 14 ticks.
    pub fn step_allowance(&mut self) -> Option<usize> {
        let speed = self.steps_per_second?;
        self.carry += f64::from(speed) * self.tick_period.as_secs_f64();
        let whole = self.carry.floor();
        self.carry -= whole;
        Some(whole as usize)
    }

    /// Whether a tick started at `started` has used up its budget
    pub fn budget_exhausted(&self, started: Instant) -> bool {
        started.elapsed() >= self.work_budget
    }
}

impl Default for Ticker {
    fn default() -> Self {
        Self::new(Duration::from_millis(7), Duration::from_millis(6), None)
    }
}
