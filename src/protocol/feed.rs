//! Decoding of recorded engine feeds (one JSON event per line).
//!
//! Protocol events use their wire form. Lifecycle and control records use
//! the same `type` discriminants:
//!
//! ```text
//! {"type":"RunStarted","state":{}}
//! {"type":"NodeStarted","nodeName":"plan","state":{"step":1}}
//! {"type":"MetaEvent","name":"PredictState","value":{"name":{"tool_name":"update_user"}}}
//! {"type":"RunError","message":"tool crashed"}
//! ```

use std::str::FromStr;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{EngineError, Result, RuntimeError};

use super::events::{AgentState, ControlEvent, ProtocolEvent, RuntimeEvent};
use super::wire::{ControlKind, EventType};

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum FeedRecord {
    RunStarted {
        #[serde(default)]
        state: AgentState,
    },
    RunFinished {
        #[serde(default)]
        state: AgentState,
    },
    RunError {
        message: String,
    },
    #[serde(rename_all = "camelCase")]
    NodeStarted {
        node_name: String,
        #[serde(default)]
        state: AgentState,
    },
    #[serde(rename_all = "camelCase")]
    NodeFinished {
        node_name: String,
        #[serde(default)]
        state: AgentState,
    },
    MetaEvent {
        name: ControlKind,
        #[serde(default)]
        value: Value,
    },
}

impl FeedRecord {
    fn into_event(self) -> Result<RuntimeEvent> {
        Ok(match self {
            Self::RunStarted { state } => RuntimeEvent::run_started(state),
            Self::RunFinished { state } => RuntimeEvent::run_finished(state),
            Self::RunError { message } => RuntimeEvent::run_error(EngineError::msg(message)),
            Self::NodeStarted { node_name, state } => RuntimeEvent::node_started(node_name, state),
            Self::NodeFinished { node_name, state } => {
                RuntimeEvent::node_finished(node_name, state)
            }
            Self::MetaEvent { name, value } => ControlEvent::from_parts(name, value)?.into(),
        })
    }
}

/// Decode a single feed line into a runtime event.
pub fn parse_feed_line(line: &str) -> Result<RuntimeEvent> {
    let value: Value = serde_json::from_str(line)?;
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| RuntimeError::InvalidArgument("feed record has no `type` field".into()))?;
    let event_type = EventType::from_str(kind)
        .map_err(|_| RuntimeError::InvalidArgument(format!("unknown event type `{kind}`")))?;

    if event_type.is_protocol() {
        let event: ProtocolEvent = serde_json::from_value(value)?;
        return Ok(event.into());
    }
    serde_json::from_value::<FeedRecord>(value)?.into_event()
}

/// Decode a whole feed, skipping blank lines.
pub fn parse_feed(text: &str) -> Result<Vec<RuntimeEvent>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            parse_feed_line(line).map_err(|err| match err {
                RuntimeError::InvalidArgument(message) => {
                    RuntimeError::InvalidArgument(format!("line {}: {message}", index + 1))
                }
                other => other,
            })
        })
        .collect()
}
