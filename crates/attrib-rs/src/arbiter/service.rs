//! The arbitration actor.
//!
//! [`ArbiterService`] owns the [`Arbiter`], the single debounce timer, and
//! the set of in-flight checkpoint invocations, and multiplexes them in one
//! task. Signals are processed to completion one at a time, so the core
//! never needs a lock.
//!
//! The timer is an owned `Sleep` tagged with its generation. Cancelling it
//! drops the `Sleep`, so a cancelled timer can never wake the loop; the
//! generation check in the core covers anything that slips through.

use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio::time::Sleep;
use tracing::{trace, warn};

use super::core::{Action, Arbiter};
use super::events::{ArbiterEvent, EventHandler};
use super::state::{CheckpointRequest, Counters, TimerGeneration};
use crate::checkpoint::{CheckpointError, CheckpointExecutor};
use crate::signal::{ChangeKind, FileChange, Signal};

/// Default capacity of the signal channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Current time as seen by arbitration. Reads tokio's clock so a paused
/// runtime controls it.
fn now() -> std::time::Instant {
    tokio::time::Instant::now().into_std()
}

struct ArmedTimer {
    generation: TimerGeneration,
    sleep: Pin<Box<Sleep>>,
}

/// Resolves with the armed generation when the timer elapses; never
/// resolves while nothing is armed.
async fn fire(timer: &mut Option<ArmedTimer>) -> TimerGeneration {
    match timer {
        Some(armed) => {
            armed.sleep.as_mut().await;
            armed.generation
        }
        None => std::future::pending().await,
    }
}

struct Completion {
    request: CheckpointRequest,
    elapsed: Duration,
    result: Result<(), CheckpointError>,
}

/// Sending half of the signal channel.
#[derive(Debug, Clone)]
pub struct ArbiterHandle {
    tx: mpsc::Sender<Signal>,
}

impl ArbiterHandle {
    /// Raw sender, for sources that push from blocking contexts.
    pub fn sender(&self) -> mpsc::Sender<Signal> {
        self.tx.clone()
    }

    pub async fn send(&self, signal: Signal) -> Result<(), String> {
        self.tx
            .send(signal)
            .await
            .map_err(|_| "arbiter has stopped".to_string())
    }

    pub async fn agent_activity(&self) -> Result<(), String> {
        self.send(Signal::AgentActivity).await
    }

    pub async fn file_changed(&self, path: impl Into<PathBuf>) -> Result<(), String> {
        self.send(Signal::FileChanged(FileChange::new(path, ChangeKind::Modify)))
            .await
    }
}

/// Runs an [`Arbiter`] against a signal channel and a checkpoint executor.
pub struct ArbiterService {
    arbiter: Arbiter,
    executor: Arc<dyn CheckpointExecutor>,
    handler: Box<dyn EventHandler>,
}

impl ArbiterService {
    pub fn new(
        arbiter: Arbiter,
        executor: Arc<dyn CheckpointExecutor>,
        handler: impl EventHandler + 'static,
    ) -> Self {
        Self {
            arbiter,
            executor,
            handler: Box::new(handler),
        }
    }

    /// Spawn the service on the current runtime. The task ends once every
    /// clone of the returned handle (and every sender taken from it) is
    /// dropped, yielding the final counters.
    pub fn spawn(self, capacity: usize) -> (ArbiterHandle, JoinHandle<Counters>) {
        let (tx, rx) = mpsc::channel(capacity);
        let task = tokio::spawn(self.run(rx));
        (ArbiterHandle { tx }, task)
    }

    /// Process signals until `rx` closes, then drop any pending human
    /// checkpoint, wait for in-flight checkpoints, and return the counters.
    pub async fn run(mut self, mut rx: mpsc::Receiver<Signal>) -> Counters {
        let mut timer: Option<ArmedTimer> = None;
        let mut inflight: JoinSet<Completion> = JoinSet::new();

        self.handler.on_event(&ArbiterEvent::Started {
            workspaces: self.arbiter.workspaces().roots(),
            config: self.arbiter.config(),
        });

        loop {
            tokio::select! {
                signal = rx.recv() => {
                    let Some(signal) = signal else { break };
                    let actions = self.on_signal(signal);
                    self.apply(actions, &mut timer, &mut inflight);
                }
                generation = fire(&mut timer) => {
                    timer = None;
                    let actions = self.arbiter.on_human_timer(generation, now());
                    self.apply(actions, &mut timer, &mut inflight);
                }
                Some(joined) = inflight.join_next(), if !inflight.is_empty() => {
                    self.complete(joined);
                }
            }
        }

        if let Some(armed) = timer.take() {
            trace!("Dropping pending human checkpoint #{}", armed.generation);
        }
        while let Some(joined) = inflight.join_next().await {
            self.complete(joined);
        }

        let counters = self.arbiter.counters();
        self.handler.on_event(&ArbiterEvent::Stopped { counters });
        counters
    }

    fn on_signal(&mut self, signal: Signal) -> Vec<Action> {
        let now = now();
        match signal {
            Signal::AgentActivity => {
                self.handler.on_event(&ArbiterEvent::AgentActivity);
                self.arbiter.on_agent_signal(now)
            }
            Signal::FileChanged(change) => {
                trace!("{:?} {}", change.kind, change.path.display());
                self.arbiter.on_file_change(&change.path, now)
            }
        }
    }

    fn apply(
        &self,
        actions: Vec<Action>,
        timer: &mut Option<ArmedTimer>,
        inflight: &mut JoinSet<Completion>,
    ) {
        for action in actions {
            match action {
                Action::ArmHumanTimer {
                    generation,
                    delay,
                    path,
                } => {
                    *timer = Some(ArmedTimer {
                        generation,
                        sleep: Box::pin(tokio::time::sleep(delay)),
                    });
                    self.handler.on_event(&ArbiterEvent::HumanPending {
                        path: &path,
                        generation,
                        delay,
                    });
                }
                Action::CancelHumanTimer { generation } => {
                    if timer.as_ref().is_some_and(|t| t.generation == generation) {
                        *timer = None;
                    }
                    self.handler
                        .on_event(&ArbiterEvent::HumanCancelled { generation });
                }
                Action::Dispatch(request) => {
                    self.handler
                        .on_event(&ArbiterEvent::CheckpointDispatched { request: &request });
                    let executor = Arc::clone(&self.executor);
                    inflight.spawn(async move {
                        let started = tokio::time::Instant::now();
                        let result = executor.execute(&request).await;
                        Completion {
                            request,
                            elapsed: started.elapsed(),
                            result,
                        }
                    });
                }
                Action::Skip { reason, path } => {
                    self.handler.on_event(&ArbiterEvent::Skipped {
                        reason,
                        path: path.as_deref(),
                    });
                }
            }
        }
    }

    fn complete(&mut self, joined: Result<Completion, JoinError>) {
        let completion = match joined {
            Ok(completion) => completion,
            Err(e) => {
                warn!("Checkpoint task aborted: {e}");
                return;
            }
        };

        let counters = self
            .arbiter
            .record_outcome(completion.request.kind, completion.result.is_ok());
        let event = match &completion.result {
            Ok(()) => ArbiterEvent::CheckpointSucceeded {
                request: &completion.request,
                counters,
                elapsed: completion.elapsed,
            },
            Err(error) => ArbiterEvent::CheckpointFailed {
                request: &completion.request,
                error,
            },
        };
        self.handler.on_event(&event);
    }
}
