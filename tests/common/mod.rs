//! Shared test helpers for driving run loops.

#![allow(dead_code)]

use futures::stream::BoxStream;
use futures::StreamExt;
use serde_json::Value;

use agent_runloop::error::{Result, RuntimeError};
use agent_runloop::protocol::AgentState;

/// Everything a run loop stream produced.
#[derive(Debug, Default)]
pub struct RunOutput {
    /// Raw chunks in the order they were yielded.
    pub chunks: Vec<String>,
    pub error: Option<RuntimeError>,
}

impl RunOutput {
    /// Every emitted line, decoded.
    pub fn lines(&self) -> Vec<Value> {
        self.chunks
            .iter()
            .flat_map(|chunk| chunk.lines())
            .map(|line| serde_json::from_str(line).expect("each line is one JSON object"))
            .collect()
    }

    pub fn types(&self) -> Vec<String> {
        self.lines()
            .iter()
            .map(|line| line["type"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    /// Decoded `state` payloads of every snapshot line.
    pub fn snapshot_states(&self) -> Vec<Value> {
        self.lines()
            .iter()
            .filter(|line| line["type"] == "AgentStateMessage")
            .map(|line| {
                serde_json::from_str(line["state"].as_str().expect("state is a string"))
                    .expect("state is JSON text")
            })
            .collect()
    }
}

/// Drain a run loop stream to completion.
pub async fn collect(mut stream: BoxStream<'static, Result<String>>) -> RunOutput {
    let mut output = RunOutput::default();
    while let Some(item) = stream.next().await {
        match item {
            Ok(chunk) => output.chunks.push(chunk),
            Err(err) => {
                assert!(output.error.is_none(), "stream yielded more than one error");
                output.error = Some(err);
            }
        }
    }
    output
}

pub fn state(value: Value) -> AgentState {
    value
        .as_object()
        .cloned()
        .expect("state fixtures are JSON objects")
}
