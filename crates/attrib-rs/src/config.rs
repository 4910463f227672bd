//! Top-level configuration.
//!
//! Read from `<first workspace>/.attrib/config.json` (or an explicit path).
//! Every field is optional; omitted fields keep their defaults, and command
//! line flags are applied on top by the binary.
//!
//! ```json
//! {
//!   "workspaces": ["/home/me/repo"],
//!   "arbiter": { "human_debounce_ms": 2000 },
//!   "executor": { "program": "git-ai", "agent_name": "copilot", "model": "gpt-4o" },
//!   "agent_log": { "path": "/home/me/.agent/log.txt" },
//!   "history_depth": 20,
//!   "ignored_dirs": ["node_modules", "target"]
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::arbiter::{ArbiterConfig, IgnoreRules, WorkspaceSet};
use crate::checkpoint::ExecutorConfig;
use crate::signal::log_tail::AgentLogConfig;
use crate::status::DEFAULT_HISTORY_DEPTH;

/// Directory holding per-workspace configuration. Always ignored by the
/// watcher.
pub const CONFIG_DIR: &str = ".attrib";
pub const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttribConfig {
    /// Roots to watch. Defaults to the current directory when empty.
    pub workspaces: Vec<PathBuf>,
    pub arbiter: ArbiterConfig,
    pub executor: ExecutorConfig,
    pub agent_log: AgentLogConfig,
    /// Number of recent checkpoints shown in the status history.
    pub history_depth: usize,
    /// Directory names ignored in addition to the built-in ones.
    pub ignored_dirs: Vec<String>,
}

impl Default for AttribConfig {
    fn default() -> Self {
        Self {
            workspaces: Vec::new(),
            arbiter: ArbiterConfig::default(),
            executor: ExecutorConfig::default(),
            agent_log: AgentLogConfig::default(),
            history_depth: DEFAULT_HISTORY_DEPTH,
            ignored_dirs: Vec::new(),
        }
    }
}

impl AttribConfig {
    /// Conventional config location for a workspace.
    pub fn default_path(workspace: &Path) -> PathBuf {
        workspace.join(CONFIG_DIR).join(CONFIG_FILE)
    }

    /// Load a config file. A missing file is an error.
    pub fn load(path: &Path) -> Result<Self, String> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
        serde_json::from_str(&contents)
            .map_err(|e| format!("Failed to parse {}: {e}", path.display()))
    }

    /// Load a config file, falling back to defaults when it does not exist.
    /// A file that exists but does not parse is still an error.
    pub fn load_or_default(path: &Path) -> Result<Self, String> {
        if path.exists() {
            Self::load(path)
        } else {
            debug!("No config at {}; using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Make every workspace absolute and canonical, defaulting to `cwd`
    /// when none are configured. Fails on roots that do not exist.
    pub fn resolve_workspaces(&mut self, cwd: &Path) -> Result<(), String> {
        if self.workspaces.is_empty() {
            self.workspaces.push(cwd.to_path_buf());
        }
        let mut resolved = Vec::with_capacity(self.workspaces.len());
        for root in &self.workspaces {
            let absolute = if root.is_absolute() {
                root.clone()
            } else {
                cwd.join(root)
            };
            let canonical = absolute
                .canonicalize()
                .map_err(|e| format!("Workspace {}: {e}", absolute.display()))?;
            if !canonical.is_dir() {
                return Err(format!("Workspace {} is not a directory", canonical.display()));
            }
            if !resolved.contains(&canonical) {
                resolved.push(canonical);
            }
        }
        self.workspaces = resolved;
        Ok(())
    }

    pub fn workspace_set(&self) -> WorkspaceSet {
        WorkspaceSet::new(self.workspaces.iter().cloned())
    }

    pub fn ignore_rules(&self) -> IgnoreRules {
        IgnoreRules::default().with_dirs(self.ignored_dirs.iter().cloned())
    }
}
