//! Signals from an editor integration, as JSON lines.
//!
//! ```text
//! {"type":"file_change","uri":"file:///home/me/repo/src/lib.rs"}
//! {"type":"file_change","uri":"file:///home/me/repo/old.rs","kind":"delete"}
//! {"type":"agent_activity"}
//! ```
//!
//! Lines that do not parse, and URIs with a scheme other than `file`, are
//! dropped here. Paths are canonicalized so they compare equal to the
//! canonical workspace roots even when the editor opened them through a
//! symlink.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{ChangeKind, FileChange, Signal};

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum FeedLine {
    FileChange {
        uri: String,
        #[serde(default)]
        kind: FeedChangeKind,
    },
    AgentActivity,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
enum FeedChangeKind {
    Create,
    #[default]
    Modify,
    Delete,
}

impl From<FeedChangeKind> for ChangeKind {
    fn from(kind: FeedChangeKind) -> Self {
        match kind {
            FeedChangeKind::Create => ChangeKind::Create,
            FeedChangeKind::Modify => ChangeKind::Modify,
            FeedChangeKind::Delete => ChangeKind::Delete,
        }
    }
}

/// Absolute, canonical path for a `file://` URI.
pub fn file_uri_to_path(uri: &str) -> Option<PathBuf> {
    let url = url::Url::parse(uri).ok()?;
    if url.scheme() != "file" {
        return None;
    }
    url.to_file_path().ok().map(|path| canonical_path(&path))
}

/// Resolve symlinks in `path`. A file that no longer exists (a delete) is
/// resolved through its parent directory; a path with no existing parent
/// is returned unchanged.
pub fn canonical_path(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => match parent.canonicalize() {
            Ok(parent) => parent.join(name),
            Err(_) => path.to_path_buf(),
        },
        _ => path.to_path_buf(),
    }
}

/// Parse one feed line. Blank, malformed, and non-file lines yield `None`.
pub fn parse_line(line: &str) -> Option<Signal> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let parsed: FeedLine = match serde_json::from_str(line) {
        Ok(parsed) => parsed,
        Err(e) => {
            debug!("Dropping feed line: {e}");
            return None;
        }
    };
    match parsed {
        FeedLine::AgentActivity => Some(Signal::AgentActivity),
        FeedLine::FileChange { uri, kind } => match file_uri_to_path(&uri) {
            Some(path) => Some(Signal::FileChanged(FileChange::new(path, kind.into()))),
            None => {
                debug!("Dropping non-file URI {uri}");
                None
            }
        },
    }
}

/// Forward every parsed line of `reader` until EOF or until the arbiter's
/// channel closes.
pub fn spawn<R>(reader: R, tx: mpsc::Sender<Signal>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if let Some(signal) = parse_line(&line)
                        && tx.send(signal).await.is_err()
                    {
                        break;
                    }
                }
                Ok(None) => {
                    debug!("Signal feed closed");
                    break;
                }
                Err(e) => {
                    warn!("Signal feed read error: {e}");
                    break;
                }
            }
        }
    })
}
