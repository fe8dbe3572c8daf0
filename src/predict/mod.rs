//! Predicted state from in-flight tool-call arguments.
//!
//! While a tool call streams its JSON arguments, every chunk is appended to
//! the execution's argument buffer and re-parsed tolerantly. Configured
//! arguments found in the recovered object are merged over the last engine
//! state and sent to the client as a snapshot, before the tool call (or even
//! the node) has finished.

pub mod partial_json;

pub use partial_json::{parse_partial, PartialJsonError};

use serde_json::Value;

use crate::config::RunLoopConfig;
use crate::execution::ExecutionState;
use crate::protocol::{AgentState, ProtocolEvent, StateSnapshot};

/// Remove keys that must never reach the client from a state map.
pub fn filter_state(state: &AgentState, config: &RunLoopConfig) -> AgentState {
    state
        .iter()
        .filter(|(key, _)| !config.is_excluded(key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Serialized, filtered state payload for a snapshot.
pub(crate) fn state_payload(state: &AgentState, config: &RunLoopConfig) -> String {
    Value::Object(filter_state(state, config)).to_string()
}

/// Feed one tool event to the predictor.
///
/// Returns a snapshot only when a configured state key received a value from
/// the current argument buffer. Never fails: unparseable buffers leave earlier
/// predictions untouched.
pub fn predict_state(
    event: &ProtocolEvent,
    execution: &mut ExecutionState,
    config: &RunLoopConfig,
) -> Option<StateSnapshot> {
    match event {
        ProtocolEvent::ToolStart { tool_name, .. } => {
            execution.current_tool_call = Some(tool_name.clone());
            execution.argument_buffer.clear();
            None
        }
        ProtocolEvent::ToolArgs { args_chunk, .. } => {
            execution.argument_buffer.push_str(args_chunk);
            predict_from_buffer(execution, config)
        }
        _ => None,
    }
}

fn predict_from_buffer(
    execution: &mut ExecutionState,
    config: &RunLoopConfig,
) -> Option<StateSnapshot> {
    let tool_name = execution.current_tool_call.clone()?;
    if !execution.predicts_tool(&tool_name) {
        return None;
    }

    let arguments = match parse_partial(&execution.argument_buffer) {
        Ok(arguments) => arguments,
        Err(err) => {
            tracing::debug!(
                run_id = %execution.run_id,
                tool_name = %tool_name,
                error = %err,
                "partial arguments not parseable yet"
            );
            return None;
        }
    };

    let mut updated = Vec::new();
    for (key, target) in &execution.predict_state_configuration {
        if target.tool_name != tool_name {
            continue;
        }
        let value = match &target.tool_argument {
            Some(argument) => match arguments.get(argument) {
                Some(value) if !value.is_null() => value.clone(),
                _ => continue,
            },
            None => arguments.clone(),
        };
        updated.push((key.clone(), value));
    }
    if updated.is_empty() {
        return None;
    }

    for (key, value) in updated {
        execution.predicted_state.insert(key, value);
    }
    tracing::debug!(
        run_id = %execution.run_id,
        tool_name = %tool_name,
        keys = execution.predicted_state.len(),
        "predicted state updated"
    );

    let mut merged = execution.state.clone();
    merged.extend(
        execution
            .predicted_state
            .iter()
            .map(|(key, value)| (key.clone(), value.clone())),
    );
    let payload = state_payload(&merged, config);
    Some(execution.snapshot(payload, true, &config.snapshot_role))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{PredictStateConfig, PredictStateMap};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn execution_with(config: &[(&str, &str, Option<&str>)]) -> ExecutionState {
        let map: PredictStateMap = config
            .iter()
            .map(|(key, tool, argument)| {
                (key.to_string(), PredictStateConfig::new(*tool, *argument))
            })
            .collect();
        let mut state = AgentState::new();
        state.insert("messages".into(), json!([{"role": "user"}]));
        state.insert("id".into(), json!("thread-internal"));
        state.insert("plan".into(), json!("draft"));
        ExecutionState::new("t1", "assistant", "r1")
            .with_state(state)
            .with_predict_config(map)
    }

    fn decoded(snapshot: &StateSnapshot) -> Value {
        serde_json::from_str(&snapshot.state).unwrap()
    }

    #[test]
    fn tool_start_resets_the_buffer() {
        let config = RunLoopConfig::default();
        let mut execution = execution_with(&[("name", "update_user", Some("name"))]);
        execution.argument_buffer.push_str("stale");
        let snapshot = predict_state(
            &ProtocolEvent::tool_start("x", "update_user", None),
            &mut execution,
            &config,
        );
        assert!(snapshot.is_none());
        assert_eq!(execution.argument_buffer, "");
        assert_eq!(execution.current_tool_call.as_deref(), Some("update_user"));
    }

    #[test]
    fn unconfigured_tool_only_buffers() {
        let config = RunLoopConfig::default();
        let mut execution = execution_with(&[("name", "update_user", Some("name"))]);
        predict_state(&ProtocolEvent::tool_start("x", "search", None), &mut execution, &config);
        let snapshot = predict_state(
            &ProtocolEvent::tool_args("x", r#"{"name": "Bob"}"#),
            &mut execution,
            &config,
        );
        assert!(snapshot.is_none());
        assert!(execution.predicted_state.is_empty());
        assert_eq!(execution.argument_buffer, r#"{"name": "Bob"}"#);
    }

    #[test]
    fn argument_becomes_state_once_complete() {
        let config = RunLoopConfig::default();
        let mut execution = execution_with(&[("user_name", "update_user", Some("name"))]);
        predict_state(&ProtocolEvent::tool_start("x", "update_user", None), &mut execution, &config);

        let first = predict_state(
            &ProtocolEvent::tool_args("x", r#"{"name": "Al"#),
            &mut execution,
            &config,
        );
        assert!(first.is_none());

        let second = predict_state(
            &ProtocolEvent::tool_args("x", r#"ice"}"#),
            &mut execution,
            &config,
        )
        .unwrap();
        assert_eq!(
            decoded(&second),
            json!({"plan": "draft", "user_name": "Alice"})
        );
        assert!(second.active);
        assert!(second.running);
        assert_eq!(second.role, "assistant");
    }

    #[test]
    fn whole_arguments_map_when_no_argument_named() {
        let config = RunLoopConfig::default();
        let mut execution = execution_with(&[("draft", "write_doc", None)]);
        predict_state(&ProtocolEvent::tool_start("x", "write_doc", None), &mut execution, &config);
        let snapshot = predict_state(
            &ProtocolEvent::tool_args("x", r#"{"title": "Q3", "body": "Rev"#),
            &mut execution,
            &config,
        )
        .unwrap();
        assert_eq!(decoded(&snapshot)["draft"], json!({"title": "Q3"}));
    }

    #[test]
    fn null_argument_does_not_update() {
        let config = RunLoopConfig::default();
        let mut execution = execution_with(&[("name", "update_user", Some("name"))]);
        predict_state(&ProtocolEvent::tool_start("x", "update_user", None), &mut execution, &config);
        let snapshot = predict_state(
            &ProtocolEvent::tool_args("x", r#"{"name": null}"#),
            &mut execution,
            &config,
        );
        assert!(snapshot.is_none());
    }

    #[test]
    fn parse_failure_keeps_previous_prediction() {
        let config = RunLoopConfig::default();
        let mut execution = execution_with(&[("name", "update_user", Some("name"))]);
        predict_state(&ProtocolEvent::tool_start("x", "update_user", None), &mut execution, &config);
        predict_state(
            &ProtocolEvent::tool_args("x", r#"{"name": "Alice", "#),
            &mut execution,
            &config,
        )
        .unwrap();
        let broken = predict_state(&ProtocolEvent::tool_args("x", "]]"), &mut execution, &config);
        assert!(broken.is_none());
        assert_eq!(execution.predicted_state.get("name"), Some(&json!("Alice")));
    }

    #[test]
    fn predicted_values_override_engine_state() {
        let config = RunLoopConfig::default();
        let mut execution = execution_with(&[("plan", "revise_plan", Some("text"))]);
        predict_state(&ProtocolEvent::tool_start("x", "revise_plan", None), &mut execution, &config);
        let snapshot = predict_state(
            &ProtocolEvent::tool_args("x", r#"{"text": "final"}"#),
            &mut execution,
            &config,
        )
        .unwrap();
        assert_eq!(decoded(&snapshot), json!({"plan": "final"}));
    }

    #[test]
    fn filter_state_honours_configured_keys() {
        let config = RunLoopConfig::builder()
            .excluded_state_keys(vec!["secret".to_string()])
            .build();
        let mut state = AgentState::new();
        state.insert("secret".into(), json!(1));
        state.insert("messages".into(), json!([]));
        let filtered = filter_state(&state, &config);
        assert_eq!(Value::Object(filtered), json!({"messages": []}));
    }
}
