//! The arbitration state machine.
//!
//! [`Arbiter`] turns two unordered streams (file changes and agent pulses)
//! into a single stream of human/agent checkpoint decisions. It performs no
//! I/O and reads no clock: every operation receives `now` and returns the
//! [`Action`]s the caller must apply, which keeps the timing rules testable
//! with synthetic instants.
//!
//! The debounce timer is an explicit handle ([`PendingHuman`]) with a
//! generation number. Arming always cancels the previous handle first, and a
//! fire carrying any generation other than the armed one is stale.
//!
//! States: `Idle` and `HumanPending`. The agent grace period is a modifier
//! on the human path, not a state of its own.
//!
//! ```text
//! Idle ──file change, no recent pulse──▶ HumanPending
//! HumanPending ──agent pulse──▶ Idle   (agent checkpoint, RaceUpgrade)
//! HumanPending ──timer fires──▶ Idle   (human checkpoint, unless in grace)
//! Idle ──file change within window──▶ Idle   (agent checkpoint, AgentWindow)
//! ```

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use super::config::ArbiterConfig;
use super::ignore::IgnoreRules;
use super::state::{
    ArbitrationState, CheckpointKind, CheckpointRequest, Counters, PendingHuman, TimerGeneration,
    Trigger,
};
use super::workspace::WorkspaceSet;

/// Why an input produced no checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Tool metadata or editor housekeeping path.
    Ignored,
    /// Path is not under any watched workspace.
    OutsideWorkspace,
    /// A human checkpoint was requested while an agent checkpoint is settling.
    GracePeriod,
    /// An agent checkpoint was requested too soon after the previous one.
    Throttled,
    /// A timer fire for a generation that was already cancelled or replaced.
    StaleTimer,
    /// No workspace to run a human checkpoint in.
    NoWorkspace,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            SkipReason::Ignored => "ignored path",
            SkipReason::OutsideWorkspace => "outside workspace",
            SkipReason::GracePeriod => "agent grace period",
            SkipReason::Throttled => "agent throttle",
            SkipReason::StaleTimer => "stale timer",
            SkipReason::NoWorkspace => "no workspace",
        };
        f.write_str(label)
    }
}

/// An effect the caller must apply, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Schedule [`Arbiter::on_human_timer`] with `generation` after `delay`.
    ArmHumanTimer {
        generation: TimerGeneration,
        delay: Duration,
        path: PathBuf,
    },
    /// Drop the scheduled fire for `generation`.
    CancelHumanTimer { generation: TimerGeneration },
    /// Hand the request to the checkpoint executor now.
    Dispatch(CheckpointRequest),
    /// Nothing to do; reported for observability.
    Skip {
        reason: SkipReason,
        path: Option<PathBuf>,
    },
}

/// Human/agent arbitration core. See the module docs.
#[derive(Debug)]
pub struct Arbiter {
    config: ArbiterConfig,
    workspaces: WorkspaceSet,
    ignore: IgnoreRules,
    state: ArbitrationState,
}

impl Arbiter {
    pub fn new(config: ArbiterConfig, workspaces: WorkspaceSet, ignore: IgnoreRules) -> Self {
        Self {
            config,
            workspaces,
            ignore,
            state: ArbitrationState::default(),
        }
    }

    pub fn config(&self) -> &ArbiterConfig {
        &self.config
    }

    pub fn workspaces(&self) -> &WorkspaceSet {
        &self.workspaces
    }

    pub fn state(&self) -> &ArbitrationState {
        &self.state
    }

    pub fn counters(&self) -> Counters {
        self.state.counters
    }

    /// Generation of the armed human timer, if any.
    pub fn pending_generation(&self) -> Option<TimerGeneration> {
        self.state.pending_human.map(|p| p.generation)
    }

    // ── Inputs ─────────────────────────────────────────────────────

    /// An agent-activity pulse arrived.
    ///
    /// If a human checkpoint is pending, the change that armed it was the
    /// agent's: the timer is cancelled and an agent checkpoint is issued for
    /// the pending path. Otherwise the pulse only moves the attribution
    /// window.
    pub fn on_agent_signal(&mut self, now: Instant) -> Vec<Action> {
        self.state.last_agent_signal = Some(now);

        let mut actions = Vec::new();
        if let Some(cancel) = self.cancel_pending_human() {
            actions.push(cancel);
            if let Some(path) = self.state.pending_path.clone() {
                self.request_agent_checkpoint(path, now, Trigger::RaceUpgrade, &mut actions);
            }
        }
        actions
    }

    /// A file under a watched tree was created, modified, or deleted.
    pub fn on_file_change(&mut self, path: &Path, now: Instant) -> Vec<Action> {
        if self.ignore.is_ignored(path) {
            return vec![skip(SkipReason::Ignored, Some(path))];
        }
        if self.workspaces.containing(path).is_none() {
            return vec![skip(SkipReason::OutsideWorkspace, Some(path))];
        }

        self.state.pending_path = Some(path.to_path_buf());

        let mut actions = Vec::new();
        let within_agent_window = self
            .state
            .last_agent_signal
            .is_some_and(|t| now.saturating_duration_since(t) < self.config.agent_signal_window());
        if within_agent_window {
            self.request_agent_checkpoint(
                path.to_path_buf(),
                now,
                Trigger::AgentWindow,
                &mut actions,
            );
        } else {
            self.request_human_checkpoint(path, now, &mut actions);
        }
        actions
    }

    /// The debounce timer armed with `generation` elapsed.
    pub fn on_human_timer(&mut self, generation: TimerGeneration, now: Instant) -> Vec<Action> {
        match self.state.pending_human {
            Some(pending) if pending.generation == generation => {}
            _ => return vec![skip(SkipReason::StaleTimer, None)],
        }
        self.state.pending_human = None;

        let path = self.state.pending_path.clone();
        if self.in_grace_period(now) {
            return vec![skip(SkipReason::GracePeriod, path.as_deref())];
        }

        let workspace = path
            .as_deref()
            .and_then(|p| self.workspaces.containing(p))
            .or_else(|| self.workspaces.primary());
        match workspace {
            Some(root) => vec![Action::Dispatch(CheckpointRequest {
                kind: CheckpointKind::Human,
                trigger: Trigger::Debounce,
                workspace: root.to_path_buf(),
                edited_paths: Vec::new(),
            })],
            None => vec![skip(SkipReason::NoWorkspace, path.as_deref())],
        }
    }

    /// Cancel the pending human checkpoint. Returns `None` when nothing was
    /// armed, so calling it repeatedly is harmless.
    pub fn cancel_pending_human(&mut self) -> Option<Action> {
        self.state
            .pending_human
            .take()
            .map(|p| Action::CancelHumanTimer {
                generation: p.generation,
            })
    }

    /// Record an executor outcome. Only successes are counted; timestamps
    /// are left alone either way.
    pub fn record_outcome(&mut self, kind: CheckpointKind, success: bool) -> Counters {
        if success {
            self.state.counters.record(kind);
        }
        self.state.counters
    }

    // ── Paths ──────────────────────────────────────────────────────

    fn request_human_checkpoint(&mut self, path: &Path, now: Instant, actions: &mut Vec<Action>) {
        if self.in_grace_period(now) {
            actions.push(skip(SkipReason::GracePeriod, Some(path)));
            return;
        }

        if let Some(cancel) = self.cancel_pending_human() {
            actions.push(cancel);
        }
        let generation = self.state.next_generation();
        self.state.pending_human = Some(PendingHuman { generation });
        actions.push(Action::ArmHumanTimer {
            generation,
            delay: self.config.human_debounce(),
            path: path.to_path_buf(),
        });
    }

    fn request_agent_checkpoint(
        &mut self,
        path: PathBuf,
        now: Instant,
        trigger: Trigger,
        actions: &mut Vec<Action>,
    ) {
        let throttled = self.state.last_checkpoint.is_some_and(|t| {
            now.saturating_duration_since(t) < self.config.agent_checkpoint_throttle()
        });
        if throttled {
            actions.push(skip(SkipReason::Throttled, Some(path.as_path())));
            return;
        }

        if let Some(cancel) = self.cancel_pending_human() {
            actions.push(cancel);
        }

        let Some((root, relative)) = self.workspaces.resolve(&path) else {
            actions.push(skip(SkipReason::OutsideWorkspace, Some(path.as_path())));
            return;
        };
        let request = CheckpointRequest {
            kind: CheckpointKind::Agent,
            trigger,
            workspace: root.to_path_buf(),
            edited_paths: vec![relative],
        };

        // The grace period runs from request time, not completion time.
        self.state.last_checkpoint = Some(now);
        actions.push(Action::Dispatch(request));
    }

    fn in_grace_period(&self, now: Instant) -> bool {
        self.state
            .last_checkpoint
            .is_some_and(|t| now.saturating_duration_since(t) < self.config.agent_grace_period())
    }
}

fn skip(reason: SkipReason, path: Option<&Path>) -> Action {
    Action::Skip {
        reason,
        path: path.map(Path::to_path_buf),
    }
}
