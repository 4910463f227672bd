//! Events and observers for the [`ArbiterService`](super::service::ArbiterService).
//!
//! The service reports every decision it makes and every checkpoint outcome
//! as an [`ArbiterEvent`]. Observers implement [`EventHandler`]; they are
//! strictly read-only and never feed back into arbitration.
//!
//! # Choosing an event handler
//!
//! | Handler | Use case |
//! |---------|----------|
//! | [`NoopHandler`] | Tests or headless runs |
//! | [`LoggingHandler`] | Structured logging via `tracing` |
//! | [`FnEventHandler`] | Quick closures for simple callbacks |
//! | [`StatusEventHandler`](crate::status::StatusEventHandler) | Status line and checkpoint history |
//! | [`CompositeEventHandler`] | Compose multiple handlers in order |

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info, warn};

use super::config::ArbiterConfig;
use super::core::SkipReason;
use super::state::{CheckpointRequest, Counters, TimerGeneration};
use crate::checkpoint::CheckpointError;

// ── Events ─────────────────────────────────────────────────────────

/// Events emitted by the arbitration service.
#[derive(Debug)]
pub enum ArbiterEvent<'a> {
    /// The service started watching.
    Started {
        workspaces: &'a [PathBuf],
        config: &'a ArbiterConfig,
    },
    /// An agent-activity pulse arrived.
    AgentActivity,
    /// A tentative human checkpoint was armed.
    HumanPending {
        path: &'a Path,
        generation: TimerGeneration,
        delay: Duration,
    },
    /// The armed human checkpoint was cancelled, either superseded by a newer
    /// change or upgraded to an agent checkpoint.
    HumanCancelled { generation: TimerGeneration },
    /// An input produced no checkpoint.
    Skipped {
        reason: SkipReason,
        path: Option<&'a Path>,
    },
    /// A checkpoint was handed to the executor.
    CheckpointDispatched { request: &'a CheckpointRequest },
    /// The executor reported success.
    CheckpointSucceeded {
        request: &'a CheckpointRequest,
        counters: Counters,
        elapsed: Duration,
    },
    /// The executor reported failure. Counters are unchanged.
    CheckpointFailed {
        request: &'a CheckpointRequest,
        error: &'a CheckpointError,
    },
    /// The signal channel closed and in-flight checkpoints drained.
    Stopped { counters: Counters },
}

/// Observer for arbitration events.
///
/// The default implementation ignores everything.
pub trait EventHandler: Send + Sync {
    fn on_event(&self, event: &ArbiterEvent<'_>) {
        let _ = event;
    }
}

/// A handler that ignores every event.
pub struct NoopHandler;
impl EventHandler for NoopHandler {}

/// An event handler backed by a closure.
///
/// ```ignore
/// let handler = FnEventHandler::new(|event| {
///     if let ArbiterEvent::CheckpointSucceeded { request, .. } = event {
///         println!("{} checkpoint", request.kind);
///     }
/// });
/// ```
pub struct FnEventHandler<F>(F)
where
    F: Fn(&ArbiterEvent<'_>) + Send + Sync;

impl<F> FnEventHandler<F>
where
    F: Fn(&ArbiterEvent<'_>) + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> EventHandler for FnEventHandler<F>
where
    F: Fn(&ArbiterEvent<'_>) + Send + Sync,
{
    fn on_event(&self, event: &ArbiterEvent<'_>) {
        (self.0)(event)
    }
}

/// Dispatches each event to every inner handler in registration order.
///
/// ```ignore
/// let handler = CompositeEventHandler::new()
///     .with(LoggingHandler)
///     .with_opt(status.map(StatusEventHandler::new));
/// ```
pub struct CompositeEventHandler {
    handlers: Vec<Box<dyn EventHandler>>,
}

impl CompositeEventHandler {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    pub fn with(mut self, handler: impl EventHandler + 'static) -> Self {
        self.handlers.push(Box::new(handler));
        self
    }

    /// Add `handler` only when `condition` holds.
    pub fn with_if(self, condition: bool, handler: impl EventHandler + 'static) -> Self {
        if condition { self.with(handler) } else { self }
    }

    /// Add a handler from an `Option`. `None` is a no-op.
    pub fn with_opt(self, handler: Option<impl EventHandler + 'static>) -> Self {
        match handler {
            Some(h) => self.with(h),
            None => self,
        }
    }
}

impl Default for CompositeEventHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHandler for CompositeEventHandler {
    fn on_event(&self, event: &ArbiterEvent<'_>) {
        for handler in &self.handlers {
            handler.on_event(event);
        }
    }
}

/// An event handler that logs events via `tracing`.
pub struct LoggingHandler;

impl EventHandler for LoggingHandler {
    fn on_event(&self, event: &ArbiterEvent<'_>) {
        match event {
            ArbiterEvent::Started { workspaces, config } => {
                for root in workspaces.iter() {
                    info!("Watching {}", root.display());
                }
                debug!(
                    "Windows: agent={}ms, grace={}ms, debounce={}ms, throttle={}ms",
                    config.agent_signal_window_ms,
                    config.agent_grace_period_ms,
                    config.human_debounce_ms,
                    config.agent_checkpoint_throttle_ms,
                );
            }
            ArbiterEvent::AgentActivity => {
                debug!("Agent activity");
            }
            ArbiterEvent::HumanPending {
                path,
                generation,
                delay,
            } => {
                debug!(
                    "Human checkpoint #{generation} pending for {} ({}ms)",
                    path.display(),
                    delay.as_millis()
                );
            }
            ArbiterEvent::HumanCancelled { generation } => {
                debug!("Human checkpoint #{generation} cancelled");
            }
            ArbiterEvent::Skipped { reason, path } => match path {
                Some(path) => debug!("Skipped {}: {reason}", path.display()),
                None => debug!("Skipped: {reason}"),
            },
            ArbiterEvent::CheckpointDispatched { request } => {
                debug!(
                    "Dispatching {} checkpoint in {} ({:?})",
                    request.kind,
                    request.workspace.display(),
                    request.trigger
                );
            }
            ArbiterEvent::CheckpointSucceeded {
                request,
                counters,
                elapsed,
            } => {
                let files = if request.edited_paths.is_empty() {
                    String::new()
                } else {
                    let names: Vec<String> = request
                        .edited_paths
                        .iter()
                        .map(|p| p.display().to_string())
                        .collect();
                    format!(" [{}]", names.join(", "))
                };
                info!(
                    "{} checkpoint{files} in {}ms (agent={}, human={})",
                    request.kind,
                    elapsed.as_millis(),
                    counters.agent,
                    counters.human
                );
            }
            ArbiterEvent::CheckpointFailed { request, error } => {
                warn!("{} checkpoint failed: {error}", request.kind);
            }
            ArbiterEvent::Stopped { counters } => {
                info!(
                    "Stopped after {} checkpoint(s) (agent={}, human={})",
                    counters.total(),
                    counters.agent,
                    counters.human
                );
            }
        }
    }
}
