//! `attrib`: watch workspaces and record human/agent checkpoints.
//!
//! # Examples
//!
//! ```sh
//! # Watch the current directory, tailing an agent's log for activity
//! attrib --agent-log ~/.config/agent/logs/latest.log
//!
//! # Two workspaces, longer debounce, signals from an editor on stdin
//! attrib --workspace ~/src/api --workspace ~/src/web --debounce-ms 3000 --stdin-signals
//! ```

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use attrib_rs::arbiter::DEFAULT_CHANNEL_CAPACITY;
use attrib_rs::prelude::*;
use attrib_rs::signal::watcher::WorkspaceWatcher;
use attrib_rs::signal::{feed, log_tail};
use clap::Parser;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Attribute working-tree edits to humans or coding agents.
#[derive(Parser)]
#[command(name = "attrib", version)]
struct Cli {
    /// Workspace root to watch. Repeatable. Defaults to the current directory.
    #[arg(long = "workspace", value_name = "DIR")]
    workspaces: Vec<PathBuf>,

    /// Config file. Defaults to `<first workspace>/.attrib/config.json`.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Agent log file to tail for activity.
    #[arg(long, value_name = "FILE")]
    agent_log: Option<PathBuf>,

    /// Substring marking an agent log line as activity. Repeatable;
    /// replaces the built-in markers.
    #[arg(long = "agent-marker", value_name = "TEXT")]
    agent_markers: Vec<String>,

    /// How long a human edit waits for a late agent signal.
    #[arg(long)]
    debounce_ms: Option<u64>,

    /// Number of checkpoints kept in the status history.
    #[arg(long)]
    history_depth: Option<usize>,

    /// Checkpoint program.
    #[arg(long, value_name = "PROGRAM")]
    tool: Option<String>,

    /// Agent name reported in agent checkpoints.
    #[arg(long)]
    agent_name: Option<String>,

    /// Model reported in agent checkpoints.
    #[arg(long)]
    model: Option<String>,

    /// Read JSON-line signals from stdin.
    #[arg(long)]
    stdin_signals: bool,

    /// Log filter used when `RUST_LOG` is unset.
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Cli {
    /// Load the config file and layer command-line overrides on top.
    fn load_config(&self, cwd: &std::path::Path) -> Result<AttribConfig, String> {
        let mut config = match &self.config {
            Some(path) => AttribConfig::load(path)?,
            None => {
                let root = self.workspaces.first().map_or(cwd, PathBuf::as_path);
                AttribConfig::load_or_default(&AttribConfig::default_path(root))?
            }
        };

        if !self.workspaces.is_empty() {
            config.workspaces = self.workspaces.clone();
        }
        if let Some(path) = &self.agent_log {
            config.agent_log.path = Some(path.clone());
        }
        if !self.agent_markers.is_empty() {
            config.agent_log.markers = self.agent_markers.clone();
        }
        if let Some(ms) = self.debounce_ms {
            config.arbiter.human_debounce_ms = ms;
        }
        if let Some(depth) = self.history_depth {
            config.history_depth = depth;
        }
        if let Some(tool) = &self.tool {
            config.executor.program = tool.clone();
        }
        if let Some(name) = &self.agent_name {
            config.executor.agent_name = name.clone();
        }
        if let Some(model) = &self.model {
            config.executor.model = model.clone();
        }

        config.resolve_workspaces(cwd)?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(cli).await {
        Ok(counters) => {
            println!(
                "{} checkpoint(s): {} agent, {} human",
                counters.total(),
                counters.agent,
                counters.human
            );
            // The stdin reader may still be parked on a blocking thread.
            std::process::exit(0);
        }
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> Result<Counters, String> {
    let cwd = std::env::current_dir().map_err(|e| format!("Cannot read current directory: {e}"))?;
    let config = cli.load_config(&cwd)?;
    debug!("Config: {config:?}");

    let status = Arc::new(Mutex::new(StatusState::new(config.history_depth)));
    let handler = CompositeEventHandler::new()
        .with(LoggingHandler)
        .with(StatusEventHandler::new(status.clone()));

    let arbiter = Arbiter::new(
        config.arbiter,
        config.workspace_set(),
        config.ignore_rules(),
    );
    let executor = CommandExecutor::new(config.executor.clone());
    info!(
        "Checkpointing with `{}` (conversation {})",
        executor.program(),
        executor.conversation_id()
    );

    let (handle, service) =
        ArbiterService::new(arbiter, Arc::new(executor), handler).spawn(DEFAULT_CHANNEL_CAPACITY);

    let watcher = WorkspaceWatcher::start(&config.workspaces, handle.sender())?;

    let mut sources: Vec<JoinHandle<()>> = Vec::new();
    if let Some(path) = &config.agent_log.path {
        let tail = log_tail::LogTail::new(path, config.agent_log.markers.clone());
        sources.push(log_tail::spawn(
            tail,
            Duration::from_millis(config.agent_log.poll_ms.max(10)),
            handle.sender(),
        ));
    }
    if cli.stdin_signals {
        sources.push(feed::spawn(tokio::io::stdin(), handle.sender()));
    }
    let printer = spawn_status_printer(status.clone());

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| format!("Failed to listen for Ctrl-C: {e}"))?;
    info!("Shutting down");

    // Every sender must go before the service sees its channel close.
    drop(watcher);
    for source in &sources {
        source.abort();
    }
    for source in sources {
        let _ = source.await;
    }
    drop(handle);

    let counters = service
        .await
        .map_err(|e| format!("Arbiter task failed: {e}"))?;
    printer.abort();

    if let Ok(s) = status.lock() {
        for entry in s.history() {
            println!("  {entry}");
        }
    }
    Ok(counters)
}

/// Print the status line to stdout whenever it changes.
fn spawn_status_printer(status: Arc<Mutex<StatusState>>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_millis(500));
        let mut seen = 0;
        loop {
            ticker.tick().await;
            let line = match status.lock() {
                Ok(s) if s.revision() != seen => {
                    seen = s.revision();
                    status_line(&s)
                }
                _ => continue,
            };
            println!("{line}");
        }
    })
}
