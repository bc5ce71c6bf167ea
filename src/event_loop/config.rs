//! Event loop configuration

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Tuning knobs for [`EventLoop`](super::EventLoop)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventLoopConfig {
    /// Maximum tasks to run per tick (starvation protection)
    pub max_tasks_per_tick: usize,
    /// Stop `run_to_completion` with an error after this many ticks
    pub max_ticks: Option<u64>,
}

impl Default for EventLoopConfig {
    fn default() -> Self {
        Self {
            max_tasks_per_tick: 10_000,
            max_ticks: None,
        }
    }
}

impl EventLoopConfig {
    /// Parse and validate a JSON configuration document.
    ///
    /// Missing fields fall back to their defaults.
    pub fn from_json(source: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the event loop cannot make progress with
    pub fn validate(&self) -> Result<()> {
        if self.max_tasks_per_tick == 0 {
            return Err(Error::ConfigError(
                "max_tasks_per_tick must be greater than zero".to_string(),
            ));
        }
        if self.max_ticks == Some(0) {
            return Err(Error::ConfigError(
                "max_ticks must be greater than zero when set".to_string(),
            ));
        }
        Ok(())
    }

    /// Set the per-tick task budget
    pub fn with_max_tasks_per_tick(mut self, limit: usize) -> Self {
        self.max_tasks_per_tick = limit;
        self
    }

    /// Set the tick limit for `run_to_completion`
    pub fn with_max_ticks(mut self, limit: u64) -> Self {
        self.max_ticks = Some(limit);
        self
    }
}
