//! Recursive file watcher over the workspace roots.
//!
//! Uses the `notify` crate's platform watcher. Its callback runs on a
//! notify-owned thread, so events are forwarded with `blocking_send`.
//! Directory events and reads are dropped here; ignore rules are applied
//! later by the arbiter.

use std::path::PathBuf;

use notify::event::{CreateKind, ModifyKind, RemoveKind, RenameMode};
use notify::{Config, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{ChangeKind, FileChange, Signal};

/// Keeps the platform watcher alive. Dropping it stops the stream.
pub struct WorkspaceWatcher {
    _watcher: RecommendedWatcher,
    roots: Vec<PathBuf>,
}

impl WorkspaceWatcher {
    /// Watch every root recursively, forwarding changes to `tx`.
    pub fn start(roots: &[PathBuf], tx: mpsc::Sender<Signal>) -> Result<Self, String> {
        let mut watcher = RecommendedWatcher::new(
            move |res: Result<notify::Event, notify::Error>| match res {
                Ok(event) => {
                    for change in map_notify_event(&event) {
                        if tx.blocking_send(Signal::FileChanged(change)).is_err() {
                            debug!("Arbiter stopped; dropping file event");
                            return;
                        }
                    }
                }
                Err(e) => warn!("File watcher error: {e}"),
            },
            Config::default(),
        )
        .map_err(|e| format!("Failed to create file watcher: {e}"))?;

        for root in roots {
            watcher
                .watch(root, RecursiveMode::Recursive)
                .map_err(|e| format!("Failed to watch {}: {e}", root.display()))?;
            info!("File watcher started on {}", root.display());
        }

        Ok(Self {
            _watcher: watcher,
            roots: roots.to_vec(),
        })
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }
}

/// Map a raw notify event to file changes. Directory events, reads, and
/// metadata-only events produce nothing.
pub fn map_notify_event(event: &notify::Event) -> Vec<FileChange> {
    let kind = match event.kind {
        EventKind::Create(CreateKind::Folder) | EventKind::Remove(RemoveKind::Folder) => None,
        EventKind::Create(_) => Some(ChangeKind::Create),
        EventKind::Modify(ModifyKind::Metadata(_)) => None,
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            // paths = [from, to]
            let mut changes = Vec::new();
            if let Some(from) = event.paths.first() {
                changes.push(FileChange::new(from.clone(), ChangeKind::Delete));
            }
            if let Some(to) = event.paths.get(1) {
                changes.push(FileChange::new(to.clone(), ChangeKind::Create));
            }
            return changes;
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => Some(ChangeKind::Delete),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => Some(ChangeKind::Create),
        EventKind::Modify(_) => Some(ChangeKind::Modify),
        EventKind::Remove(_) => Some(ChangeKind::Delete),
        _ => None,
    };

    match kind {
        Some(kind) => event
            .paths
            .iter()
            .map(|p| FileChange::new(p.clone(), kind))
            .collect(),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, DataChange, MetadataKind};

    fn event(kind: EventKind, paths: &[&str]) -> notify::Event {
        notify::Event {
            kind,
            paths: paths.iter().map(PathBuf::from).collect(),
            attrs: Default::default(),
        }
    }

    #[test]
    fn file_events_map_to_change_kinds() {
        let created = map_notify_event(&event(EventKind::Create(CreateKind::File), &["/w/a"]));
        assert_eq!(created, vec![FileChange::new("/w/a", ChangeKind::Create)]);

        let modified = map_notify_event(&event(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            &["/w/a"],
        ));
        assert_eq!(modified, vec![FileChange::new("/w/a", ChangeKind::Modify)]);

        let removed = map_notify_event(&event(EventKind::Remove(RemoveKind::File), &["/w/a"]));
        assert_eq!(removed, vec![FileChange::new("/w/a", ChangeKind::Delete)]);
    }

    #[test]
    fn rename_both_yields_delete_and_create() {
        let changes = map_notify_event(&event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["/w/old.rs", "/w/new.rs"],
        ));
        assert_eq!(
            changes,
            vec![
                FileChange::new("/w/old.rs", ChangeKind::Delete),
                FileChange::new("/w/new.rs", ChangeKind::Create),
            ]
        );
    }

    #[test]
    fn reads_directories_and_metadata_are_dropped() {
        assert!(map_notify_event(&event(EventKind::Access(AccessKind::Any), &["/w/a"])).is_empty());
        assert!(map_notify_event(&event(EventKind::Create(CreateKind::Folder), &["/w/d"])).is_empty());
        assert!(map_notify_event(&event(EventKind::Remove(RemoveKind::Folder), &["/w/d"])).is_empty());
        assert!(
            map_notify_event(&event(
                EventKind::Modify(ModifyKind::Metadata(MetadataKind::Permissions)),
                &["/w/a"]
            ))
            .is_empty()
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn watcher_forwards_writes() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let (tx, mut rx) = mpsc::channel(64);
        let watcher = WorkspaceWatcher::start(std::slice::from_ref(&root), tx).unwrap();
        assert_eq!(watcher.roots(), [root.clone()]);

        let file = root.join("hello.txt");
        std::fs::write(&file, "hi").unwrap();

        let received = tokio::time::timeout(std::time::Duration::from_secs(10), async {
            while let Some(signal) = rx.recv().await {
                if let Signal::FileChanged(change) = signal
                    && change.path == file
                {
                    return true;
                }
            }
            false
        })
        .await
        .unwrap_or(false);
        assert!(received);
    }
}
