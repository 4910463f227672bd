//! Checkpoint execution.
//!
//! The arbiter decides *what* to checkpoint; a [`CheckpointExecutor`] turns
//! a [`CheckpointRequest`] into a persisted checkpoint. The shipped
//! implementation is [`CommandExecutor`], which shells out to an external
//! versioning tool. Tests substitute in-memory executors.

mod command;

pub use command::{CommandExecutor, DEFAULT_PROGRAM, ExecutorConfig};

use std::future::Future;
use std::pin::Pin;

use crate::arbiter::CheckpointRequest;

/// Boxed future returned by [`CheckpointExecutor::execute`].
pub type CheckpointFuture<'a> = Pin<Box<dyn Future<Output = Result<(), CheckpointError>> + Send + 'a>>;

/// Why a checkpoint invocation failed.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("`{program}` not found; is it installed and on PATH?")]
    ToolMissing { program: String },
    #[error("workspace {} is not a directory", path.display())]
    WorkspaceMissing { path: std::path::PathBuf },
    #[error("failed to run `{program}`: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("`{program}` exited with code {code}: {stderr}")]
    NonZeroExit {
        program: String,
        code: i32,
        stderr: String,
    },
    #[error("failed to encode hook payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Performs checkpoints. Invocations may overlap; implementations must not
/// assume they are called one at a time.
pub trait CheckpointExecutor: Send + Sync {
    fn execute(&self, request: &CheckpointRequest) -> CheckpointFuture<'_>;
}
