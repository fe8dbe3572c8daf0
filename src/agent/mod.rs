//! Agent abstraction driven by the run loop.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::Serialize;

use crate::config::RunLoopConfig;
use crate::error::{EngineError, Result};
use crate::execution::ExecutionState;
use crate::protocol::AgentState;
use crate::runloop::{self, EventPublisher};

/// A computation engine that can be run under the run loop.
///
/// Implementations publish text, tool and node events through the given
/// [`EventPublisher`] while they work and return the final state. Run start
/// and finish (or error) events are emitted on their behalf by
/// [`run_agent`].
#[async_trait]
pub trait Agent: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    async fn execute(
        &self,
        publisher: EventPublisher,
        state: AgentState,
    ) -> std::result::Result<AgentState, EngineError>;

    fn info(&self) -> AgentInfo {
        AgentInfo {
            name: self.name().to_string(),
            description: self.description().to_string(),
        }
    }
}

/// Public description of an agent, as listed to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentInfo {
    pub name: String,
    pub description: String,
}

/// Execute `agent` under a fresh run loop and stream its wire output.
pub fn run_agent(
    agent: Arc<dyn Agent>,
    initial_state: AgentState,
    execution: ExecutionState,
    config: RunLoopConfig,
) -> BoxStream<'static, Result<String>> {
    tracing::debug!(
        agent_name = %agent.name(),
        run_id = %execution.run_id,
        "running agent"
    );
    runloop::run(execution, config, move |publisher| async move {
        let body = agent.execute(publisher.clone(), initial_state.clone());
        runloop::drive(&publisher, initial_state, body).await
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl Agent for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        async fn execute(
            &self,
            _publisher: EventPublisher,
            state: AgentState,
        ) -> std::result::Result<AgentState, EngineError> {
            Ok(state)
        }
    }

    #[test]
    fn info_defaults_to_empty_description() {
        assert_eq!(
            Echo.info(),
            AgentInfo {
                name: "echo".into(),
                description: String::new(),
            }
        );
    }
}
