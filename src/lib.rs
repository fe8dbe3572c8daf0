//! agent-runloop: ordered event streaming for multi-step agents
//!
//! A run executes an agent's step function as a background task that
//! publishes events into one ordered channel. The run loop drains that
//! channel, keeps the per-run execution context up to date, predicts state
//! from tool-call arguments while they are still streaming, and yields
//! newline-delimited JSON for the transport to write out.
//!
//! # Quick Start
//!
//! ```no_run
//! use agent_runloop::prelude::*;
//! use futures::StreamExt;
//!
//! # async fn example() -> agent_runloop::error::Result<()> {
//! let execution = ExecutionState::start("thread-1", "assistant");
//! let mut output = run(execution, RunLoopConfig::default(), |publisher| async move {
//!     drive(&publisher, AgentState::new(), async {
//!         publisher.emit_message("Hello!").await.map_err(EngineError::new)?;
//!         Ok::<_, EngineError>(AgentState::new())
//!     })
//!     .await
//! });
//! while let Some(line) = output.next().await {
//!     print!("{}", line?);
//! }
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod config;
pub mod error;
pub mod execution;
pub mod predict;
pub mod prelude;
pub mod protocol;
pub mod runloop;

#[cfg(feature = "cli")]
pub mod cli;
