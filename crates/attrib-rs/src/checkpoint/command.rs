//! Subprocess-backed checkpoint executor.
//!
//! Human checkpoints run `<program> checkpoint`. Agent checkpoints run
//! `<program> checkpoint agent-v1 --hook-input <json>`, where the JSON
//! payload names the edited files relative to the workspace root. Both run
//! with the workspace root as working directory; exit code 0 is success.

use std::path::PathBuf;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, trace};

use super::{CheckpointError, CheckpointExecutor, CheckpointFuture};
use crate::arbiter::{CheckpointKind, CheckpointRequest};

/// Default versioning tool.
pub const DEFAULT_PROGRAM: &str = "git-ai";

/// Executor settings as they appear in the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Program invoked for every checkpoint. Default: `git-ai`.
    pub program: String,
    /// `agent_name` reported in agent checkpoint payloads.
    pub agent_name: String,
    /// `model` reported in agent checkpoint payloads.
    pub model: String,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_PROGRAM.into(),
            agent_name: "agent".into(),
            model: "unknown".into(),
        }
    }
}

/// Runs checkpoints through an external command.
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    config: ExecutorConfig,
    conversation_id: String,
}

impl CommandExecutor {
    /// Create an executor. The conversation id is fixed for its lifetime so
    /// every agent checkpoint of one session is grouped together.
    pub fn new(config: ExecutorConfig) -> Self {
        let conversation_id = chrono::Local::now()
            .format("attrib-%Y%m%dT%H%M%S%3f")
            .to_string();
        Self {
            config,
            conversation_id,
        }
    }

    pub fn with_conversation_id(mut self, id: impl Into<String>) -> Self {
        self.conversation_id = id.into();
        self
    }

    pub fn program(&self) -> &str {
        &self.config.program
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    /// The `--hook-input` payload for an agent checkpoint.
    pub fn hook_payload(&self, request: &CheckpointRequest) -> serde_json::Value {
        let edited: Vec<String> = request
            .edited_paths
            .iter()
            .map(|p| p.to_string_lossy().replace('\\', "/"))
            .collect();
        serde_json::json!({
            "type": "ai_agent",
            "repo_working_dir": request.workspace.to_string_lossy(),
            "edited_filepaths": edited,
            "agent_name": self.config.agent_name,
            "model": self.config.model,
            "conversation_id": self.conversation_id,
            "transcript": { "messages": [] },
        })
    }

    /// Command-line arguments for `request`.
    pub fn args(&self, request: &CheckpointRequest) -> Result<Vec<String>, CheckpointError> {
        match request.kind {
            CheckpointKind::Human => Ok(vec!["checkpoint".into()]),
            CheckpointKind::Agent => {
                let payload = serde_json::to_string(&self.hook_payload(request))?;
                Ok(vec![
                    "checkpoint".into(),
                    "agent-v1".into(),
                    "--hook-input".into(),
                    payload,
                ])
            }
        }
    }

    async fn run(&self, args: Vec<String>, workdir: PathBuf) -> Result<(), CheckpointError> {
        let program = &self.config.program;
        let started = Instant::now();
        debug!("Running {program} {} in {}", args[..2.min(args.len())].join(" "), workdir.display());

        // A missing working directory also spawns with NotFound.
        if !tokio::fs::metadata(&workdir).await.is_ok_and(|m| m.is_dir()) {
            return Err(CheckpointError::WorkspaceMissing { path: workdir });
        }

        let output = Command::new(program)
            .args(&args)
            .current_dir(&workdir)
            .output()
            .await
            .map_err(|source| match source.kind() {
                std::io::ErrorKind::NotFound => CheckpointError::ToolMissing {
                    program: program.clone(),
                },
                _ => CheckpointError::Spawn {
                    program: program.clone(),
                    source,
                },
            })?;

        trace!(
            "{program} finished in {}ms: {}",
            started.elapsed().as_millis(),
            String::from_utf8_lossy(&output.stdout).trim()
        );

        if output.status.success() {
            Ok(())
        } else {
            Err(CheckpointError::NonZeroExit {
                program: program.clone(),
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

impl CheckpointExecutor for CommandExecutor {
    fn execute(&self, request: &CheckpointRequest) -> CheckpointFuture<'_> {
        let args = self.args(request);
        let workdir = request.workspace.clone();
        Box::pin(async move { self.run(args?, workdir).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arbiter::Trigger;

    fn agent_request(workspace: &str, paths: &[&str]) -> CheckpointRequest {
        CheckpointRequest {
            kind: CheckpointKind::Agent,
            trigger: Trigger::AgentWindow,
            workspace: PathBuf::from(workspace),
            edited_paths: paths.iter().map(PathBuf::from).collect(),
        }
    }

    fn human_request(workspace: &str) -> CheckpointRequest {
        CheckpointRequest {
            kind: CheckpointKind::Human,
            trigger: Trigger::Debounce,
            workspace: PathBuf::from(workspace),
            edited_paths: Vec::new(),
        }
    }

    #[test]
    fn human_checkpoint_has_no_payload() {
        let executor = CommandExecutor::new(ExecutorConfig::default());
        assert_eq!(executor.args(&human_request("/repo")).unwrap(), vec!["checkpoint"]);
        assert_eq!(executor.program(), "git-ai");
    }

    #[test]
    fn agent_payload_lists_relative_paths() {
        let executor = CommandExecutor::new(ExecutorConfig {
            program: "git-ai".into(),
            agent_name: "copilot".into(),
            model: "gpt-test".into(),
        })
        .with_conversation_id("session-1");

        let args = executor
            .args(&agent_request("/repo", &["src/lib.rs", "README.md"]))
            .unwrap();
        assert_eq!(&args[..3], ["checkpoint", "agent-v1", "--hook-input"]);

        let payload: serde_json::Value = serde_json::from_str(&args[3]).unwrap();
        assert_eq!(
            payload,
            serde_json::json!({
                "type": "ai_agent",
                "repo_working_dir": "/repo",
                "edited_filepaths": ["src/lib.rs", "README.md"],
                "agent_name": "copilot",
                "model": "gpt-test",
                "conversation_id": "session-1",
                "transcript": { "messages": [] },
            })
        );
    }

    #[test]
    fn conversation_id_is_stable_per_executor() {
        let executor = CommandExecutor::new(ExecutorConfig::default());
        let first = executor.hook_payload(&agent_request("/repo", &["a"]));
        let second = executor.hook_payload(&agent_request("/repo", &["b"]));
        assert_eq!(first["conversation_id"], second["conversation_id"]);
        assert!(executor.conversation_id().starts_with("attrib-"));
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let config: ExecutorConfig = serde_json::from_str(r#"{"model": "m"}"#).unwrap();
        assert_eq!(config.program, DEFAULT_PROGRAM);
        assert_eq!(config.model, "m");
    }

    #[tokio::test]
    async fn missing_program_is_reported_as_tool_missing() {
        let dir = tempfile::tempdir().unwrap();
        let executor = CommandExecutor::new(ExecutorConfig {
            program: "attrib-test-no-such-tool".into(),
            ..ExecutorConfig::default()
        });
        let err = executor
            .execute(&human_request(dir.path().to_str().unwrap()))
            .await
            .unwrap_err();
        assert!(matches!(err, CheckpointError::ToolMissing { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn missing_workspace_is_not_blamed_on_the_tool() {
        let dir = tempfile::tempdir().unwrap();
        let gone = dir.path().join("removed");
        let executor = CommandExecutor::new(ExecutorConfig {
            program: "sh".into(),
            ..ExecutorConfig::default()
        });
        let err = executor
            .execute(&human_request(gone.to_str().unwrap()))
            .await
            .unwrap_err();
        match &err {
            CheckpointError::WorkspaceMissing { path } => assert_eq!(path, &gone),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("removed"), "{err}");
    }

    #[cfg(unix)]
    mod unix {
        use super::*;
        use std::os::unix::fs::PermissionsExt;

        /// Write an executable script that records its arguments and cwd.
        fn fake_tool(dir: &std::path::Path, exit_code: i32) -> PathBuf {
            let script = dir.join("fake-tool");
            let body = format!(
                "#!/bin/sh\npwd > \"$0.cwd\"\nprintf '%s\\n' \"$@\" > \"$0.args\"\necho boom >&2\nexit {exit_code}\n"
            );
            std::fs::write(&script, body).unwrap();
            std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
            script
        }

        #[tokio::test]
        async fn agent_checkpoint_runs_in_workspace() {
            let tools = tempfile::tempdir().unwrap();
            let workspace = tempfile::tempdir().unwrap();
            let tool = fake_tool(tools.path(), 0);
            let executor = CommandExecutor::new(ExecutorConfig {
                program: tool.to_string_lossy().into_owned(),
                ..ExecutorConfig::default()
            });

            let request = agent_request(workspace.path().to_str().unwrap(), &["a.txt"]);
            executor.execute(&request).await.unwrap();

            let args = std::fs::read_to_string(tool.with_extension("args")).unwrap();
            let lines: Vec<&str> = args.lines().collect();
            assert_eq!(&lines[..3], ["checkpoint", "agent-v1", "--hook-input"]);
            assert!(lines[3].contains("\"edited_filepaths\":[\"a.txt\"]"));

            let cwd = std::fs::read_to_string(tool.with_extension("cwd")).unwrap();
            assert_eq!(
                std::fs::canonicalize(cwd.trim()).unwrap(),
                std::fs::canonicalize(workspace.path()).unwrap()
            );
        }

        #[tokio::test]
        async fn nonzero_exit_carries_stderr() {
            let tools = tempfile::tempdir().unwrap();
            let workspace = tempfile::tempdir().unwrap();
            let tool = fake_tool(tools.path(), 3);
            let executor = CommandExecutor::new(ExecutorConfig {
                program: tool.to_string_lossy().into_owned(),
                ..ExecutorConfig::default()
            });

            let err = executor
                .execute(&human_request(workspace.path().to_str().unwrap()))
                .await
                .unwrap_err();
            match err {
                CheckpointError::NonZeroExit { code, stderr, .. } => {
                    assert_eq!(code, 3);
                    assert_eq!(stderr, "boom");
                }
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }
}
