//! Anti-feedback path filter.
//!
//! The checkpoint tool writes into its own metadata directories, and editors
//! churn swap and backup files next to real sources. None of those writes
//! are edits anyone should be credited with, and observing them would make
//! every checkpoint trigger the next one.

use std::path::{Component, Path};

/// Directory names whose contents are never attributed.
pub const DEFAULT_IGNORED_DIRS: &[&str] = &[".git", ".git-ai", ".attrib", ".vscode", ".idea"];

/// Exact file names produced by editors and OS housekeeping.
const IGNORED_FILE_NAMES: &[&str] = &[".DS_Store", "4913"];

/// File name suffixes produced by editors (swap, backup, temp files).
const IGNORED_SUFFIXES: &[&str] = &[".swp", ".swx", ".swo", "~", ".tmp"];

/// Decides which observed paths are noise.
#[derive(Debug, Clone)]
pub struct IgnoreRules {
    dirs: Vec<String>,
}

impl Default for IgnoreRules {
    fn default() -> Self {
        Self {
            dirs: DEFAULT_IGNORED_DIRS.iter().map(|d| d.to_string()).collect(),
        }
    }
}

impl IgnoreRules {
    /// Add extra directory names to ignore on top of the defaults.
    pub fn with_dirs<I, S>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for dir in dirs {
            let dir = dir.into();
            if !self.dirs.contains(&dir) {
                self.dirs.push(dir);
            }
        }
        self
    }

    /// Directory names currently ignored.
    pub fn dirs(&self) -> &[String] {
        &self.dirs
    }

    /// Whether `path` lives inside an ignored directory or is an editor
    /// housekeeping file.
    pub fn is_ignored(&self, path: &Path) -> bool {
        let in_ignored_dir = path.components().any(|c| match c {
            Component::Normal(name) => name
                .to_str()
                .is_some_and(|n| self.dirs.iter().any(|d| d == n)),
            _ => false,
        });
        if in_ignored_dir {
            return true;
        }

        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        IGNORED_FILE_NAMES.contains(&name)
            || IGNORED_SUFFIXES.iter().any(|s| name.ends_with(s))
            || name.starts_with(".#")
            || (name.len() > 1 && name.starts_with('#') && name.ends_with('#'))
    }
}
