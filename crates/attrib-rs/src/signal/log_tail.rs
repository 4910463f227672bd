//! Agent-activity pulses from an agent's log file.
//!
//! Coding agents write a line to their log for each tool invocation. The
//! tailer polls the file, reads only what was appended since the last poll,
//! and emits one [`Signal::AgentActivity`] per poll in which any complete
//! new line contains a marker. A shrinking file is treated as rotated and
//! re-read from the start.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::Signal;

/// Substrings that mark a log line as agent tool activity.
pub const DEFAULT_AGENT_MARKERS: &[&str] = &["\"toolName\"", "edit_file", "apply_patch", "write_file"];

pub const DEFAULT_POLL_MS: u64 = 250;

/// An unterminated line longer than this is scanned and discarded.
const MAX_PARTIAL_LINE: usize = 64 * 1024;

/// Appended bytes are read and scanned this much at a time.
const READ_CHUNK: usize = MAX_PARTIAL_LINE;

/// `agent_log` section of the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentLogConfig {
    /// Log file to tail. No tailer runs when unset.
    pub path: Option<PathBuf>,
    pub markers: Vec<String>,
    /// Poll interval. Default: `250`.
    pub poll_ms: u64,
}

impl Default for AgentLogConfig {
    fn default() -> Self {
        Self {
            path: None,
            markers: DEFAULT_AGENT_MARKERS.iter().map(|m| m.to_string()).collect(),
            poll_ms: DEFAULT_POLL_MS,
        }
    }
}

/// Append `chunk` to the carried-over `partial` line and report whether any
/// line completed by it contains a marker. The trailing unterminated text
/// stays in `partial`.
pub fn scan_chunk(partial: &mut String, chunk: &str, markers: &[String]) -> bool {
    partial.push_str(chunk);
    let matches = |line: &str| markers.iter().any(|m| line.contains(m.as_str()));

    let Some((complete, rest)) = partial.rsplit_once('\n') else {
        if partial.len() > MAX_PARTIAL_LINE {
            let hit = matches(partial.as_str());
            partial.clear();
            return hit;
        }
        return false;
    };
    let hit = complete.lines().any(matches);
    let rest = rest.to_string();
    *partial = rest;
    hit
}

/// Incremental reader over one log file.
#[derive(Debug)]
pub struct LogTail {
    path: PathBuf,
    markers: Vec<String>,
    offset: u64,
    partial: String,
}

impl LogTail {
    pub fn new(path: impl Into<PathBuf>, markers: Vec<String>) -> Self {
        Self {
            path: path.into(),
            markers,
            offset: 0,
            partial: String::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Skip everything already in the file. A missing file starts at zero.
    pub async fn seek_to_end(&mut self) {
        self.offset = tokio::fs::metadata(&self.path)
            .await
            .map(|m| m.len())
            .unwrap_or(0);
        self.partial.clear();
    }

    /// Read whatever was appended since the last call. Returns `true` when
    /// a new complete line matched a marker.
    pub async fn poll(&mut self) -> std::io::Result<bool> {
        let len = match tokio::fs::metadata(&self.path).await {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                self.offset = 0;
                self.partial.clear();
                return Ok(false);
            }
            Err(e) => return Err(e),
        };

        if len < self.offset {
            debug!("{} shrank; reading from start", self.path.display());
            self.offset = 0;
            self.partial.clear();
        }
        if len == self.offset {
            return Ok(false);
        }

        let mut file = tokio::fs::File::open(&self.path).await?;
        file.seek(SeekFrom::Start(self.offset)).await?;
        let mut reader = file.take(len - self.offset);
        let mut buf = vec![0; READ_CHUNK];
        let mut hit = false;
        loop {
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            self.offset += n as u64;
            let chunk = String::from_utf8_lossy(&buf[..n]);
            hit |= scan_chunk(&mut self.partial, &chunk, &self.markers);
        }
        Ok(hit)
    }
}

/// Poll `tail` every `interval` until the arbiter's channel closes.
pub fn spawn(mut tail: LogTail, interval: Duration, tx: mpsc::Sender<Signal>) -> JoinHandle<()> {
    tokio::spawn(async move {
        tail.seek_to_end().await;
        info!("Tailing agent log {}", tail.path().display());

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_error: Option<String> = None;
        loop {
            ticker.tick().await;
            match tail.poll().await {
                Ok(hit) => {
                    last_error = None;
                    if hit && tx.send(Signal::AgentActivity).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    let message = e.to_string();
                    if last_error.as_deref() != Some(message.as_str()) {
                        warn!("Failed to read {}: {message}", tail.path().display());
                        last_error = Some(message);
                    }
                }
            }
        }
        debug!("Agent log tailer stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn markers() -> Vec<String> {
        AgentLogConfig::default().markers
    }

    #[test]
    fn complete_marker_line_matches() {
        let mut partial = String::new();
        assert!(scan_chunk(
            &mut partial,
            "{\"toolName\":\"edit_file\"}\n",
            &markers()
        ));
        assert!(partial.is_empty());
    }

    #[test]
    fn partial_line_waits_for_newline() {
        let mut partial = String::new();
        assert!(!scan_chunk(&mut partial, "calling apply_pa", &markers()));
        assert_eq!(partial, "calling apply_pa");
        assert!(scan_chunk(&mut partial, "tch now\nnext", &markers()));
        assert_eq!(partial, "next");
    }

    #[test]
    fn unrelated_lines_do_not_match() {
        let mut partial = String::new();
        assert!(!scan_chunk(&mut partial, "heartbeat\nconnected\n", &markers()));
    }

    #[test]
    fn oversized_partial_is_flushed() {
        let mut partial = String::new();
        let long = "x".repeat(MAX_PARTIAL_LINE + 1);
        assert!(!scan_chunk(&mut partial, &long, &markers()));
        assert!(partial.is_empty());
    }

    #[tokio::test]
    async fn poll_reads_only_appended_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agent.log");
        std::fs::write(&path, "old write_file line\n").unwrap();

        let mut tail = LogTail::new(&path, markers());
        tail.seek_to_end().await;
        assert!(!tail.poll().await.unwrap(), "pre-existing lines are skipped");

        append(&path, "idle\n");
        assert!(!tail.poll().await.unwrap());

        append(&path, "tool write_file src/a.rs\n");
        assert!(tail.poll().await.unwrap());
        assert!(!tail.poll().await.unwrap(), "each line pulses once");
    }

    #[tokio::test]
    async fn truncated_log_is_reread() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agent.log");
        std::fs::write(&path, "a long line of startup noise\n").unwrap();

        let mut tail = LogTail::new(&path, markers());
        tail.seek_to_end().await;

        std::fs::write(&path, "edit_file\n").unwrap();
        assert!(tail.poll().await.unwrap());
    }

    #[tokio::test]
    async fn large_append_is_scanned_across_read_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agent.log");
        std::fs::write(&path, "").unwrap();

        let mut tail = LogTail::new(&path, markers());
        tail.seek_to_end().await;

        // The marker line straddles the first chunk boundary.
        let noise = "noise\n".repeat(READ_CHUNK / 6);
        assert!(noise.len() < READ_CHUNK && noise.len() + 9 > READ_CHUNK);
        append(&path, &noise);
        append(&path, "edit_file\n");
        append(&path, &"idle\n".repeat(READ_CHUNK / 5));

        assert!(tail.poll().await.unwrap());
        assert_eq!(tail.offset, std::fs::metadata(&path).unwrap().len());
        assert!(tail.partial.is_empty());
        assert!(!tail.poll().await.unwrap());
    }

    #[tokio::test]
    async fn missing_log_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut tail = LogTail::new(dir.path().join("absent.log"), markers());
        tail.seek_to_end().await;
        assert!(!tail.poll().await.unwrap());
    }

    fn append(path: &Path, text: &str) {
        use std::io::Write;
        let mut file = std::fs::OpenOptions::new().append(true).open(path).unwrap();
        file.write_all(text.as_bytes()).unwrap();
    }
}
