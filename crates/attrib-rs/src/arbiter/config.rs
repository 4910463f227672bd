//! Timing parameters for the [`Arbiter`](super::core::Arbiter).
//!
//! Every window is stored in milliseconds so the struct round-trips through
//! the JSON config file unchanged. Use the `Duration` accessors when doing
//! arithmetic against `Instant`s.
//!
//! ```ignore
//! let config = ArbiterConfig::default()
//!     .with_human_debounce_ms(2500)
//!     .with_agent_grace_period_ms(8000);
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default window after an agent pulse in which file changes count as agent edits.
pub const DEFAULT_AGENT_SIGNAL_WINDOW_MS: u64 = 10_000;
/// Default cooldown after an agent checkpoint during which human checkpoints are dropped.
pub const DEFAULT_AGENT_GRACE_PERIOD_MS: u64 = 5_000;
/// Default hold time for a tentative human checkpoint.
pub const DEFAULT_HUMAN_DEBOUNCE_MS: u64 = 1_500;
/// Default minimum spacing between two agent checkpoints.
pub const DEFAULT_AGENT_CHECKPOINT_THROTTLE_MS: u64 = 500;

/// Arbitration windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArbiterConfig {
    /// A file change this soon after the last agent pulse is attributed to
    /// the agent. Default: `10000`.
    pub agent_signal_window_ms: u64,
    /// No human checkpoint is issued this soon after an agent checkpoint
    /// was requested. Default: `5000`.
    pub agent_grace_period_ms: u64,
    /// How long a tentative human checkpoint waits for a late agent pulse.
    /// Default: `1500`.
    pub human_debounce_ms: u64,
    /// Agent checkpoints closer together than this are collapsed into the
    /// first one. Default: `500`.
    pub agent_checkpoint_throttle_ms: u64,
}

impl Default for ArbiterConfig {
    fn default() -> Self {
        Self {
            agent_signal_window_ms: DEFAULT_AGENT_SIGNAL_WINDOW_MS,
            agent_grace_period_ms: DEFAULT_AGENT_GRACE_PERIOD_MS,
            human_debounce_ms: DEFAULT_HUMAN_DEBOUNCE_MS,
            agent_checkpoint_throttle_ms: DEFAULT_AGENT_CHECKPOINT_THROTTLE_MS,
        }
    }
}

impl ArbiterConfig {
    pub fn with_agent_signal_window_ms(mut self, ms: u64) -> Self {
        self.agent_signal_window_ms = ms;
        self
    }

    pub fn with_agent_grace_period_ms(mut self, ms: u64) -> Self {
        self.agent_grace_period_ms = ms;
        self
    }

    pub fn with_human_debounce_ms(mut self, ms: u64) -> Self {
        self.human_debounce_ms = ms;
        self
    }

    pub fn with_agent_checkpoint_throttle_ms(mut self, ms: u64) -> Self {
        self.agent_checkpoint_throttle_ms = ms;
        self
    }

    pub fn agent_signal_window(&self) -> Duration {
        Duration::from_millis(self.agent_signal_window_ms)
    }

    pub fn agent_grace_period(&self) -> Duration {
        Duration::from_millis(self.agent_grace_period_ms)
    }

    pub fn human_debounce(&self) -> Duration {
        Duration::from_millis(self.human_debounce_ms)
    }

    pub fn agent_checkpoint_throttle(&self) -> Duration {
        Duration::from_millis(self.agent_checkpoint_throttle_ms)
    }
}
