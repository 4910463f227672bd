//! Attribute working-tree edits to a human or a coding agent and record
//! labelled checkpoints through an external versioning tool.
//!
//! File changes and agent-activity pulses arrive independently and out of
//! order. The [`Arbiter`](arbiter::Arbiter) decides for every change whether
//! to commit it as the agent's right away, to hold it as a tentative human
//! edit for a short debounce window, or to upgrade a held edit when an agent
//! pulse turns up late. Each debounce cycle ends in at most one checkpoint.
//!
//! ```ignore
//! use attrib_rs::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), String> {
//!     let arbiter = Arbiter::new(
//!         ArbiterConfig::default(),
//!         WorkspaceSet::new(["/home/me/repo"]),
//!         IgnoreRules::default(),
//!     );
//!     let executor = Arc::new(CommandExecutor::new(ExecutorConfig::default()));
//!     let (handle, task) = ArbiterService::new(arbiter, executor, LoggingHandler).spawn(256);
//!
//!     handle.agent_activity().await?;
//!     handle.file_changed("/home/me/repo/src/lib.rs").await?;
//!
//!     drop(handle);
//!     let counters = task.await.map_err(|e| e.to_string())?;
//!     println!("agent={} human={}", counters.agent, counters.human);
//!     Ok(())
//! }
//! ```
//!
//! # Where to find things
//!
//! - **Arbitration rules:** [`arbiter::core`], timing windows in
//!   [`ArbiterConfig`](arbiter::ArbiterConfig).
//! - **Running it:** [`ArbiterService`](arbiter::ArbiterService) and
//!   [`ArbiterHandle`](arbiter::ArbiterHandle).
//! - **Persisting checkpoints:** the [`CheckpointExecutor`](checkpoint::CheckpointExecutor)
//!   trait and [`CommandExecutor`](checkpoint::CommandExecutor).
//! - **Feeding signals:** [`signal::watcher`], [`signal::log_tail`], [`signal::feed`].
//! - **Observing decisions:** [`EventHandler`](arbiter::EventHandler) and
//!   [`status`].

pub mod arbiter;
pub mod checkpoint;
pub mod config;
pub mod prelude;
pub mod signal;
pub mod status;
