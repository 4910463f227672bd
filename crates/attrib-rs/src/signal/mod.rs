//! Signal sources.
//!
//! Every source produces [`Signal`]s onto the arbiter's channel:
//!
//! | Source | Produces |
//! |--------|----------|
//! | [`watcher`] | file changes under each workspace root (`notify`) |
//! | [`log_tail`] | agent pulses from an agent's log file |
//! | [`feed`] | both, as JSON lines from an editor integration on stdin |
//!
//! Sources filter their own malformed input; nothing they drop reaches the
//! arbiter.

pub mod feed;
pub mod log_tail;
pub mod watcher;

use std::path::PathBuf;

/// Kind of file-system change. Arbitration treats all kinds identically;
/// the kind is carried for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Create,
    Modify,
    Delete,
}

/// A single observed change to an absolute path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

impl FileChange {
    pub fn new(path: impl Into<PathBuf>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// An input to the arbiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    FileChanged(FileChange),
    /// The agent did something. Carries no payload.
    AgentActivity,
}
