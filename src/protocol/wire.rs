//! Fixed wire names for event and control discriminants.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

/// Discriminant of every event kind the run loop knows about.
///
/// The string form is the value of the `type` field on the wire; it is a
/// fixed table and never derived from the Rust variant name.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, IntoStaticStr,
)]
pub enum EventType {
    #[serde(rename = "TextMessageStart")]
    #[strum(serialize = "TextMessageStart")]
    TextStart,
    #[serde(rename = "TextMessageContent")]
    #[strum(serialize = "TextMessageContent")]
    TextContent,
    #[serde(rename = "TextMessageEnd")]
    #[strum(serialize = "TextMessageEnd")]
    TextEnd,
    #[serde(rename = "ActionExecutionStart")]
    #[strum(serialize = "ActionExecutionStart")]
    ToolStart,
    #[serde(rename = "ActionExecutionArgs")]
    #[strum(serialize = "ActionExecutionArgs")]
    ToolArgs,
    #[serde(rename = "ActionExecutionEnd")]
    #[strum(serialize = "ActionExecutionEnd")]
    ToolEnd,
    #[serde(rename = "ActionExecutionResult")]
    #[strum(serialize = "ActionExecutionResult")]
    ToolResult,
    #[serde(rename = "AgentStateMessage")]
    #[strum(serialize = "AgentStateMessage")]
    StateSnapshot,
    #[serde(rename = "MetaEvent")]
    #[strum(serialize = "MetaEvent")]
    Control,
    RunStarted,
    RunFinished,
    RunError,
    NodeStarted,
    NodeFinished,
}

impl EventType {
    /// Protocol events are forwarded to the client as-is.
    pub fn is_protocol(self) -> bool {
        matches!(
            self,
            Self::TextStart
                | Self::TextContent
                | Self::TextEnd
                | Self::ToolStart
                | Self::ToolArgs
                | Self::ToolEnd
                | Self::ToolResult
                | Self::StateSnapshot
        )
    }

    /// Lifecycle events drive state transitions and are never forwarded raw.
    pub fn is_lifecycle(self) -> bool {
        matches!(
            self,
            Self::RunStarted
                | Self::RunFinished
                | Self::RunError
                | Self::NodeStarted
                | Self::NodeFinished
        )
    }

    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// Kind of an out-of-band control instruction.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, IntoStaticStr,
)]
pub enum ControlKind {
    #[serde(rename = "PredictState")]
    #[strum(serialize = "PredictState")]
    PredictConfig,
    Exit,
    #[serde(rename = "LangGraphInterruptEvent")]
    #[strum(serialize = "LangGraphInterruptEvent")]
    Interrupt,
}
