//! Engine configuration.

use scheduler::Ticker;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables of the execution engine.
///
/// Every field has a default, so a partial JSON document is a valid
/// configuration.
///
/// # Examples
///
/// ```
/// use interpreter::EngineConfig;
///
/// let config = EngineConfig::from_json(r#"{ "steps_per_second": 10 }"#).unwrap();
/// assert_eq!(config.steps_per_second, Some(10));
/// assert_eq!(config.tick_period_ms, 7);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Host tick period in milliseconds
    pub tick_period_ms: u64,
    /// Wall-clock budget per tick in milliseconds, capped at the period
    pub work_budget_ms: u64,
    /// Execution speed; `None` runs as fast as the budget allows
    pub steps_per_second: Option<u32>,
    /// Maximum number of nested program activations
    pub max_call_depth: usize,
    /// Stay alive after the main program ends while timers or callbacks
    /// are pending
    pub keep_alive_for_callbacks: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_period_ms: 7,
            work_budget_ms: 6,
            steps_per_second: None,
            max_call_depth: 10_000,
            keep_alive_for_callbacks: true,
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Ticker matching the period, budget and speed settings
    pub fn ticker(&self) -> Ticker {
        Ticker::new(
            Duration::from_millis(self.tick_period_ms),
            Duration::from_millis(self.work_budget_ms),
            self.steps_per_second,
        )
    }
}
