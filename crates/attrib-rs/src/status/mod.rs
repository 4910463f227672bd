//! Status-line state.
//!
//! [`StatusState`] is the display-side view of the arbiter: checkpoint
//! counters, whether a human checkpoint is pending, the last failure, and
//! the most recent checkpoints (bounded by the configured history depth).
//! [`StatusEventHandler`] keeps it current from [`ArbiterEvent`]s; nothing
//! here is ever read back by arbitration.
//!
//! ```ignore
//! let status = Arc::new(Mutex::new(StatusState::new(10)));
//! let handler = CompositeEventHandler::new()
//!     .with(LoggingHandler)
//!     .with(StatusEventHandler::new(status.clone()));
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::arbiter::{
    ArbiterEvent, CheckpointKind, CheckpointRequest, Counters, EventHandler, SkipReason,
};

/// Default number of checkpoints kept in the history.
pub const DEFAULT_HISTORY_DEPTH: usize = 10;

/// One completed checkpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    /// Local wall-clock time, `HH:MM:SS`.
    pub at: String,
    pub kind: CheckpointKind,
    pub files: Vec<String>,
}

impl std::fmt::Display for HistoryEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.at, self.kind)?;
        if !self.files.is_empty() {
            write!(f, " {}", self.files.join(", "))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct StatusState {
    pub counters: Counters,
    pub human_pending: bool,
    pub last_error: Option<String>,
    history: VecDeque<HistoryEntry>,
    history_depth: usize,
    /// Bumped on every change so renderers can skip unchanged frames.
    revision: u64,
}

impl Default for StatusState {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_DEPTH)
    }
}

impl StatusState {
    pub fn new(history_depth: usize) -> Self {
        Self {
            counters: Counters::default(),
            human_pending: false,
            last_error: None,
            history: VecDeque::with_capacity(history_depth),
            history_depth,
            revision: 0,
        }
    }

    /// Most recent first.
    pub fn history(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.history.iter().rev()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn push_history(&mut self, entry: HistoryEntry) {
        if self.history_depth == 0 {
            return;
        }
        while self.history.len() >= self.history_depth {
            self.history.pop_front();
        }
        self.history.push_back(entry);
    }

    fn touch(&mut self) {
        self.revision += 1;
    }
}

/// Lock `$state` and run `$body` with the guard bound to `$s`. A poisoned
/// lock skips the update.
macro_rules! with_state {
    ($state:expr, |$s:ident| $body:block) => {
        if let Ok(mut $s) = $state.lock() {
            $body
            $s.touch();
        }
    };
}

pub fn set_human_pending(state: &Arc<Mutex<StatusState>>, pending: bool) {
    with_state!(state, |s| { s.human_pending = pending });
}

pub fn record_success(state: &Arc<Mutex<StatusState>>, request: &CheckpointRequest, counters: Counters) {
    let entry = HistoryEntry {
        at: chrono::Local::now().format("%H:%M:%S").to_string(),
        kind: request.kind,
        files: request
            .edited_paths
            .iter()
            .map(|p| p.display().to_string())
            .collect(),
    };
    with_state!(state, |s| {
        s.counters = counters;
        s.last_error = None;
        s.push_history(entry);
    });
}

pub fn record_failure(state: &Arc<Mutex<StatusState>>, kind: CheckpointKind, error: &str) {
    with_state!(state, |s| {
        s.last_error = Some(format!("{kind} checkpoint failed: {error}"));
    });
}

/// One-line summary, e.g. `agent 3 · human 1 · pending · last 14:02:11 agent src/a.rs`.
pub fn status_line(state: &StatusState) -> String {
    let mut parts = vec![
        format!("agent {}", state.counters.agent),
        format!("human {}", state.counters.human),
    ];
    if state.human_pending {
        parts.push("pending".into());
    }
    if let Some(last) = state.history.back() {
        parts.push(format!("last {last}"));
    }
    if let Some(error) = &state.last_error {
        parts.push(error.clone());
    }
    parts.join(" · ")
}

/// Keeps a shared [`StatusState`] in sync with arbiter events.
pub struct StatusEventHandler {
    state: Arc<Mutex<StatusState>>,
}

impl StatusEventHandler {
    pub fn new(state: Arc<Mutex<StatusState>>) -> Self {
        Self { state }
    }
}

impl EventHandler for StatusEventHandler {
    fn on_event(&self, event: &ArbiterEvent<'_>) {
        match event {
            ArbiterEvent::HumanPending { .. } => set_human_pending(&self.state, true),
            ArbiterEvent::HumanCancelled { .. } => set_human_pending(&self.state, false),
            ArbiterEvent::CheckpointDispatched { request } if request.kind == CheckpointKind::Human => {
                set_human_pending(&self.state, false)
            }
            // A fire dropped by the grace period also ends the pending cycle.
            ArbiterEvent::Skipped {
                reason: SkipReason::GracePeriod | SkipReason::NoWorkspace,
                ..
            } => set_human_pending(&self.state, false),
            ArbiterEvent::CheckpointSucceeded {
                request, counters, ..
            } => record_success(&self.state, request, *counters),
            ArbiterEvent::CheckpointFailed { request, error } => {
                record_failure(&self.state, request.kind, &error.to_string())
            }
            ArbiterEvent::Stopped { .. } => set_human_pending(&self.state, false),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arbiter::Trigger;
    use crate::checkpoint::CheckpointError;
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    fn agent_request(file: &str) -> CheckpointRequest {
        CheckpointRequest {
            kind: CheckpointKind::Agent,
            trigger: Trigger::AgentWindow,
            workspace: PathBuf::from("/repo"),
            edited_paths: vec![PathBuf::from(file)],
        }
    }

    fn shared(depth: usize) -> (Arc<Mutex<StatusState>>, StatusEventHandler) {
        let state = Arc::new(Mutex::new(StatusState::new(depth)));
        (state.clone(), StatusEventHandler::new(state))
    }

    #[test]
    fn history_is_bounded_by_depth() {
        let (state, handler) = shared(2);
        for (i, file) in ["a.rs", "b.rs", "c.rs"].iter().enumerate() {
            handler.on_event(&ArbiterEvent::CheckpointSucceeded {
                request: &agent_request(file),
                counters: Counters {
                    agent: i as u64 + 1,
                    human: 0,
                },
                elapsed: Duration::from_millis(1),
            });
        }
        let s = state.lock().unwrap();
        let files: Vec<&str> = s.history().map(|e| e.files[0].as_str()).collect();
        assert_eq!(files, vec!["c.rs", "b.rs"]);
        assert_eq!(s.counters.agent, 3);
    }

    #[test]
    fn zero_depth_keeps_no_history() {
        let (state, handler) = shared(0);
        handler.on_event(&ArbiterEvent::CheckpointSucceeded {
            request: &agent_request("a.rs"),
            counters: Counters { agent: 1, human: 0 },
            elapsed: Duration::ZERO,
        });
        assert_eq!(state.lock().unwrap().history().count(), 0);
    }

    #[test]
    fn pending_flag_follows_timer_events() {
        let (state, handler) = shared(5);
        handler.on_event(&ArbiterEvent::HumanPending {
            path: Path::new("/repo/a.rs"),
            generation: 1,
            delay: Duration::from_millis(1500),
        });
        assert!(state.lock().unwrap().human_pending);
        assert!(status_line(&state.lock().unwrap()).contains("pending"));

        handler.on_event(&ArbiterEvent::Skipped {
            reason: SkipReason::GracePeriod,
            path: None,
        });
        assert!(!state.lock().unwrap().human_pending);
    }

    #[test]
    fn failure_is_shown_until_next_success() {
        let (state, handler) = shared(5);
        let request = agent_request("a.rs");
        let error = CheckpointError::ToolMissing {
            program: "git-ai".into(),
        };
        handler.on_event(&ArbiterEvent::CheckpointFailed {
            request: &request,
            error: &error,
        });
        let line = status_line(&state.lock().unwrap());
        assert!(line.contains("agent checkpoint failed"), "{line}");

        handler.on_event(&ArbiterEvent::CheckpointSucceeded {
            request: &request,
            counters: Counters { agent: 1, human: 0 },
            elapsed: Duration::ZERO,
        });
        let s = state.lock().unwrap();
        assert!(s.last_error.is_none());
        assert!(status_line(&s).starts_with("agent 1 · human 0 · last "));
    }

    #[test]
    fn revision_changes_on_update() {
        let (state, handler) = shared(5);
        let before = state.lock().unwrap().revision();
        handler.on_event(&ArbiterEvent::HumanCancelled { generation: 1 });
        assert!(state.lock().unwrap().revision() > before);
    }
}
