//! Runtime event vocabulary.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{EngineError, RuntimeError};

use super::wire::{ControlKind, EventType};

/// Full agent state as reported by the engine.
pub type AgentState = serde_json::Map<String, Value>;

/// Maps a tool call (and optionally one of its arguments) onto a state key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictStateConfig {
    pub tool_name: String,
    /// When unset, the whole argument object is mapped to the state key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_argument: Option<String>,
}

impl PredictStateConfig {
    pub fn new(tool_name: impl Into<String>, tool_argument: Option<&str>) -> Self {
        Self {
            tool_name: tool_name.into(),
            tool_argument: tool_argument.map(str::to_string),
        }
    }
}

/// Predicted-state key to source tool mapping, supplied per node activation.
pub type PredictStateMap = BTreeMap<String, PredictStateConfig>;

/// Point-in-time view of agent state sent to the client.
///
/// `state` holds JSON text, not a nested object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    pub thread_id: String,
    pub agent_name: String,
    pub node_name: String,
    pub run_id: String,
    pub active: bool,
    pub role: String,
    pub state: String,
    pub running: bool,
}

/// Events forwarded verbatim to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProtocolEvent {
    #[serde(rename = "TextMessageStart", rename_all = "camelCase")]
    TextStart {
        message_id: String,
        parent_message_id: Option<String>,
    },
    #[serde(rename = "TextMessageContent", rename_all = "camelCase")]
    TextContent { message_id: String, content: String },
    #[serde(rename = "TextMessageEnd", rename_all = "camelCase")]
    TextEnd { message_id: String },
    #[serde(rename = "ActionExecutionStart", rename_all = "camelCase")]
    ToolStart {
        #[serde(rename = "actionExecutionId")]
        execution_id: String,
        #[serde(rename = "actionName")]
        tool_name: String,
        parent_message_id: Option<String>,
    },
    #[serde(rename = "ActionExecutionArgs")]
    ToolArgs {
        #[serde(rename = "actionExecutionId")]
        execution_id: String,
        #[serde(rename = "args")]
        args_chunk: String,
    },
    #[serde(rename = "ActionExecutionEnd")]
    ToolEnd {
        #[serde(rename = "actionExecutionId")]
        execution_id: String,
    },
    #[serde(rename = "ActionExecutionResult")]
    ToolResult {
        #[serde(rename = "actionName")]
        tool_name: String,
        #[serde(rename = "actionExecutionId")]
        execution_id: String,
        result: String,
    },
    #[serde(rename = "AgentStateMessage")]
    StateSnapshot(StateSnapshot),
}

impl ProtocolEvent {
    pub fn text_start(message_id: impl Into<String>, parent_message_id: Option<String>) -> Self {
        Self::TextStart {
            message_id: message_id.into(),
            parent_message_id,
        }
    }

    pub fn text_content(message_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::TextContent {
            message_id: message_id.into(),
            content: content.into(),
        }
    }

    pub fn text_end(message_id: impl Into<String>) -> Self {
        Self::TextEnd {
            message_id: message_id.into(),
        }
    }

    pub fn tool_start(
        execution_id: impl Into<String>,
        tool_name: impl Into<String>,
        parent_message_id: Option<String>,
    ) -> Self {
        Self::ToolStart {
            execution_id: execution_id.into(),
            tool_name: tool_name.into(),
            parent_message_id,
        }
    }

    pub fn tool_args(execution_id: impl Into<String>, args_chunk: impl Into<String>) -> Self {
        Self::ToolArgs {
            execution_id: execution_id.into(),
            args_chunk: args_chunk.into(),
        }
    }

    pub fn tool_end(execution_id: impl Into<String>) -> Self {
        Self::ToolEnd {
            execution_id: execution_id.into(),
        }
    }

    /// `result` must already be JSON text.
    pub fn tool_result(
        execution_id: impl Into<String>,
        tool_name: impl Into<String>,
        result: impl Into<String>,
    ) -> Self {
        Self::ToolResult {
            tool_name: tool_name.into(),
            execution_id: execution_id.into(),
            result: result.into(),
        }
    }

    pub fn state_snapshot(snapshot: StateSnapshot) -> Self {
        Self::StateSnapshot(snapshot)
    }

    pub fn event_type(&self) -> EventType {
        match self {
            Self::TextStart { .. } => EventType::TextStart,
            Self::TextContent { .. } => EventType::TextContent,
            Self::TextEnd { .. } => EventType::TextEnd,
            Self::ToolStart { .. } => EventType::ToolStart,
            Self::ToolArgs { .. } => EventType::ToolArgs,
            Self::ToolEnd { .. } => EventType::ToolEnd,
            Self::ToolResult { .. } => EventType::ToolResult,
            Self::StateSnapshot(_) => EventType::StateSnapshot,
        }
    }
}

/// Out-of-band instruction to the run loop.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlEvent {
    /// Replaces the predict-state mapping for the current node.
    PredictConfig(PredictStateMap),
    /// Cooperative stop request.
    Exit(bool),
    /// Human-in-the-loop interrupt raised by the engine.
    Interrupt(Value),
}

impl ControlEvent {
    pub fn kind(&self) -> ControlKind {
        match self {
            Self::PredictConfig(_) => ControlKind::PredictConfig,
            Self::Exit(_) => ControlKind::Exit,
            Self::Interrupt(_) => ControlKind::Interrupt,
        }
    }

    /// Rebuild a control event from its wire `name`/`value` pair.
    pub fn from_parts(kind: ControlKind, value: Value) -> Result<Self, RuntimeError> {
        match kind {
            ControlKind::PredictConfig => Ok(Self::PredictConfig(serde_json::from_value(value)?)),
            ControlKind::Exit => match value {
                Value::Bool(flag) => Ok(Self::Exit(flag)),
                Value::Null => Ok(Self::Exit(true)),
                other => Err(RuntimeError::InvalidArgument(format!(
                    "Exit control value must be a boolean, got {other}"
                ))),
            },
            ControlKind::Interrupt => Ok(Self::Interrupt(value)),
        }
    }
}

/// Engine lifecycle notifications. Internal only: they drive the execution
/// context and are never written to the client in this form.
#[derive(Debug, Clone)]
pub enum LifecycleEvent {
    RunStarted { state: AgentState },
    RunFinished { state: AgentState },
    RunError { error: EngineError },
    NodeStarted { node_name: String, state: AgentState },
    NodeFinished { node_name: String, state: AgentState },
}

impl LifecycleEvent {
    pub fn event_type(&self) -> EventType {
        match self {
            Self::RunStarted { .. } => EventType::RunStarted,
            Self::RunFinished { .. } => EventType::RunFinished,
            Self::RunError { .. } => EventType::RunError,
            Self::NodeStarted { .. } => EventType::NodeStarted,
            Self::NodeFinished { .. } => EventType::NodeFinished,
        }
    }
}

/// Everything that can travel through a run's event channel.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    Protocol(ProtocolEvent),
    Control(ControlEvent),
    Lifecycle(LifecycleEvent),
}

impl RuntimeEvent {
    pub fn run_started(state: AgentState) -> Self {
        Self::Lifecycle(LifecycleEvent::RunStarted { state })
    }

    pub fn run_finished(state: AgentState) -> Self {
        Self::Lifecycle(LifecycleEvent::RunFinished { state })
    }

    pub fn run_error(error: EngineError) -> Self {
        Self::Lifecycle(LifecycleEvent::RunError { error })
    }

    pub fn node_started(node_name: impl Into<String>, state: AgentState) -> Self {
        Self::Lifecycle(LifecycleEvent::NodeStarted {
            node_name: node_name.into(),
            state,
        })
    }

    pub fn node_finished(node_name: impl Into<String>, state: AgentState) -> Self {
        Self::Lifecycle(LifecycleEvent::NodeFinished {
            node_name: node_name.into(),
            state,
        })
    }

    pub fn predict_config(config: PredictStateMap) -> Self {
        Self::Control(ControlEvent::PredictConfig(config))
    }

    pub fn exit() -> Self {
        Self::Control(ControlEvent::Exit(true))
    }

    pub fn event_type(&self) -> EventType {
        match self {
            Self::Protocol(event) => event.event_type(),
            Self::Control(_) => EventType::Control,
            Self::Lifecycle(event) => event.event_type(),
        }
    }
}

impl From<ProtocolEvent> for RuntimeEvent {
    fn from(event: ProtocolEvent) -> Self {
        Self::Protocol(event)
    }
}

impl From<ControlEvent> for RuntimeEvent {
    fn from(event: ControlEvent) -> Self {
        Self::Control(event)
    }
}

impl From<LifecycleEvent> for RuntimeEvent {
    fn from(event: LifecycleEvent) -> Self {
        Self::Lifecycle(event)
    }
}

impl From<StateSnapshot> for RuntimeEvent {
    fn from(snapshot: StateSnapshot) -> Self {
        Self::Protocol(ProtocolEvent::StateSnapshot(snapshot))
    }
}
