//! Human/agent arbitration.
//!
//! - [`core`]: the sans-IO state machine deciding every checkpoint.
//! - [`service`]: the tokio actor that feeds it signals and runs its actions.
//! - [`events`]: observer hooks for logging and status display.
//!
//! Supporting types live in [`config`], [`state`], [`ignore`] and
//! [`workspace`].

pub mod config;
pub mod core;
pub mod events;
pub mod ignore;
pub mod service;
pub mod state;
pub mod workspace;

pub use config::ArbiterConfig;
pub use self::core::{Action, Arbiter, SkipReason};
pub use events::{
    ArbiterEvent, CompositeEventHandler, EventHandler, FnEventHandler, LoggingHandler, NoopHandler,
};
pub use ignore::{DEFAULT_IGNORED_DIRS, IgnoreRules};
pub use service::{ArbiterHandle, ArbiterService, DEFAULT_CHANNEL_CAPACITY};
pub use state::{
    ArbitrationState, CheckpointKind, CheckpointRequest, Counters, PendingHuman, TimerGeneration,
    Trigger,
};
pub use workspace::WorkspaceSet;
