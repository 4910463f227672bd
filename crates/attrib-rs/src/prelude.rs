//! Convenience re-exports for embedding the arbiter.
//!
//! ```ignore
//! use attrib_rs::prelude::*;
//! ```
//!
//! Covers the service, its configuration, the executor seam, and the event
//! handlers. Signal-source internals (notify mapping, log scanning) are left
//! out; import those from [`crate::signal`] directly.

// ── Arbitration ─────────────────────────────────────────────────────
pub use crate::arbiter::{
    Arbiter, ArbiterConfig, ArbiterHandle, ArbiterService, CheckpointKind, CheckpointRequest,
    Counters, IgnoreRules, Trigger, WorkspaceSet,
};

// ── Events ──────────────────────────────────────────────────────────
pub use crate::arbiter::{
    ArbiterEvent, CompositeEventHandler, EventHandler, FnEventHandler, LoggingHandler, NoopHandler,
};

// ── Checkpoints ─────────────────────────────────────────────────────
pub use crate::checkpoint::{
    CheckpointError, CheckpointExecutor, CheckpointFuture, CommandExecutor, ExecutorConfig,
};

// ── Signals, config, status ─────────────────────────────────────────
pub use crate::config::AttribConfig;
pub use crate::signal::{ChangeKind, FileChange, Signal};
pub use crate::status::{StatusEventHandler, StatusState, status_line};
