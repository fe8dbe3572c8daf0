//! Per-run execution context.

use serde::Serialize;
use uuid::Uuid;

use crate::protocol::{AgentState, PredictStateMap, StateSnapshot};

/// Mutable record of one active run.
///
/// Owned by the run loop's dispatcher for the lifetime of the run; producers
/// only ever see an [`ExecutionView`] copy.
#[derive(Debug, Clone, Default)]
pub struct ExecutionState {
    pub thread_id: String,
    pub agent_name: String,
    pub run_id: String,
    /// Node currently executing.
    pub node_name: String,
    /// Last full state reported by the engine.
    pub state: AgentState,
    pub is_finished: bool,
    pub should_exit: bool,
    pub predict_state_configuration: PredictStateMap,
    pub predicted_state: AgentState,
    /// Argument text accumulated for the current tool call.
    pub argument_buffer: String,
    pub current_tool_call: Option<String>,
}

impl ExecutionState {
    pub fn new(
        thread_id: impl Into<String>,
        agent_name: impl Into<String>,
        run_id: impl Into<String>,
    ) -> Self {
        Self {
            thread_id: thread_id.into(),
            agent_name: agent_name.into(),
            run_id: run_id.into(),
            ..Default::default()
        }
    }

    /// New execution with a freshly generated run id.
    pub fn start(thread_id: impl Into<String>, agent_name: impl Into<String>) -> Self {
        Self::new(thread_id, agent_name, Uuid::new_v4().to_string())
    }

    pub fn with_state(mut self, state: AgentState) -> Self {
        self.state = state;
        self
    }

    pub fn with_predict_config(mut self, config: PredictStateMap) -> Self {
        self.predict_state_configuration = config;
        self
    }

    /// Drop everything scoped to a single node's tool-call window.
    pub fn reset_prediction(&mut self) {
        self.predict_state_configuration.clear();
        self.predicted_state.clear();
        self.argument_buffer.clear();
        self.current_tool_call = None;
    }

    /// Whether any predict-state entry sources from `tool_name`.
    pub fn predicts_tool(&self, tool_name: &str) -> bool {
        self.predict_state_configuration
            .values()
            .any(|config| config.tool_name == tool_name)
    }

    /// Snapshot envelope for this run carrying `state_json`.
    pub fn snapshot(&self, state_json: String, active: bool, role: &str) -> StateSnapshot {
        StateSnapshot {
            thread_id: self.thread_id.clone(),
            agent_name: self.agent_name.clone(),
            node_name: self.node_name.clone(),
            run_id: self.run_id.clone(),
            active,
            role: role.to_string(),
            state: state_json,
            running: true,
        }
    }

    pub fn view(&self) -> ExecutionView {
        ExecutionView {
            thread_id: self.thread_id.clone(),
            agent_name: self.agent_name.clone(),
            run_id: self.run_id.clone(),
            node_name: self.node_name.clone(),
            should_exit: self.should_exit,
            state: self.state.clone(),
        }
    }
}

/// Read-only copy of the execution context handed to producers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionView {
    pub thread_id: String,
    pub agent_name: String,
    pub run_id: String,
    pub node_name: String,
    pub should_exit: bool,
    pub state: AgentState,
}
