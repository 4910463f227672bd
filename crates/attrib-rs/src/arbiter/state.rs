//! Mutable arbitration state and the checkpoint request/outcome types that
//! flow between the core, the actor, and the executor.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;

/// Who a checkpoint is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckpointKind {
    Human,
    Agent,
}

impl std::fmt::Display for CheckpointKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckpointKind::Human => write!(f, "human"),
            CheckpointKind::Agent => write!(f, "agent"),
        }
    }
}

/// Which arbitration path produced a checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// The human debounce timer fired.
    Debounce,
    /// A file changed shortly after an agent pulse.
    AgentWindow,
    /// An agent pulse arrived while a human checkpoint was pending.
    RaceUpgrade,
}

/// A single checkpoint the executor should perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointRequest {
    pub kind: CheckpointKind,
    pub trigger: Trigger,
    /// Workspace root; the executor runs with this as working directory.
    pub workspace: PathBuf,
    /// Paths relative to `workspace`. Empty for human checkpoints.
    pub edited_paths: Vec<PathBuf>,
}

/// Generation number identifying one armed debounce timer.
pub type TimerGeneration = u64;

/// Handle for the armed human debounce timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingHuman {
    pub generation: TimerGeneration,
}

/// Successful checkpoint counts. Display only; never read by arbitration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counters {
    pub agent: u64,
    pub human: u64,
}

impl Counters {
    pub fn record(&mut self, kind: CheckpointKind) {
        match kind {
            CheckpointKind::Agent => self.agent += 1,
            CheckpointKind::Human => self.human += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.agent + self.human
    }
}

/// Short-horizon arbitration state. Created empty, never persisted.
#[derive(Debug, Default)]
pub struct ArbitrationState {
    pub last_agent_signal: Option<Instant>,
    /// Request time of the most recent agent checkpoint.
    pub last_checkpoint: Option<Instant>,
    pub pending_human: Option<PendingHuman>,
    pub pending_path: Option<PathBuf>,
    pub counters: Counters,
    next_generation: TimerGeneration,
}

impl ArbitrationState {
    /// Allocate a fresh timer generation.
    pub fn next_generation(&mut self) -> TimerGeneration {
        self.next_generation += 1;
        self.next_generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_record_by_kind() {
        let mut counters = Counters::default();
        counters.record(CheckpointKind::Agent);
        counters.record(CheckpointKind::Agent);
        counters.record(CheckpointKind::Human);
        assert_eq!(counters, Counters { agent: 2, human: 1 });
        assert_eq!(counters.total(), 3);
    }

    #[test]
    fn generations_are_unique() {
        let mut state = ArbitrationState::default();
        let a = state.next_generation();
        let b = state.next_generation();
        assert_ne!(a, b);
        assert!(state.pending_human.is_none());
        assert!(state.last_agent_signal.is_none());
    }
}
