//! Producer-side handle for publishing events into a run.
//!
//! # Suspension points
//!
//! A normal [`EventPublisher::publish`] yields to the scheduler once before
//! enqueueing (so a pending priority publish elsewhere can go first) and once
//! after (so the run loop can drain before the producer races ahead).
//! [`EventPublisher::publish_priority`] skips the leading yield. Neither
//! changes FIFO order once events are in the channel.

use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{mpsc, watch};
use uuid::Uuid;

use crate::config::RunLoopConfig;
use crate::error::{EngineError, Result, RuntimeError};
use crate::execution::ExecutionView;
use crate::predict::state_payload;
use crate::protocol::{
    AgentState, ControlEvent, PredictStateMap, ProtocolEvent, RuntimeEvent, StateSnapshot,
};

tokio::task_local! {
    static CURRENT_PUBLISHER: EventPublisher;
}

/// Give other tasks on the scheduler a chance to run.
pub async fn yield_control() {
    tokio::task::yield_now().await;
}

/// Handle bound to one run's event channel.
#[derive(Debug, Clone)]
pub struct EventPublisher {
    tx: mpsc::UnboundedSender<RuntimeEvent>,
    view: watch::Receiver<ExecutionView>,
    config: Arc<RunLoopConfig>,
}

impl EventPublisher {
    pub(crate) fn new(
        tx: mpsc::UnboundedSender<RuntimeEvent>,
        view: watch::Receiver<ExecutionView>,
        config: Arc<RunLoopConfig>,
    ) -> Self {
        Self { tx, view, config }
    }

    /// Publisher bound to the task currently executing.
    ///
    /// Fails with [`RuntimeError::NoActiveRun`] outside a run's producer task
    /// (or a future wrapped with [`EventPublisher::scope`]).
    pub fn current() -> Result<Self> {
        CURRENT_PUBLISHER
            .try_with(Clone::clone)
            .map_err(|_| RuntimeError::NoActiveRun)
    }

    /// Bind this publisher as the ambient one for `future`.
    ///
    /// Task-locals do not follow `tokio::spawn`; engines that fan out into
    /// their own tasks wrap each spawned future with this.
    pub fn scope<F: Future>(self, future: F) -> impl Future<Output = F::Output> {
        CURRENT_PUBLISHER.scope(self, future)
    }

    /// Enqueue events in order, yielding before and after.
    pub async fn publish<I>(&self, events: I) -> Result<()>
    where
        I: IntoIterator<Item = RuntimeEvent>,
    {
        let events: Vec<RuntimeEvent> = events.into_iter().collect();
        yield_control().await;
        self.enqueue(events)?;
        yield_control().await;
        Ok(())
    }

    /// Enqueue events without the leading yield.
    pub async fn publish_priority<I>(&self, events: I) -> Result<()>
    where
        I: IntoIterator<Item = RuntimeEvent>,
    {
        let events: Vec<RuntimeEvent> = events.into_iter().collect();
        self.enqueue(events)?;
        yield_control().await;
        Ok(())
    }

    pub async fn emit(&self, event: impl Into<RuntimeEvent>) -> Result<()> {
        self.publish([event.into()]).await
    }

    fn enqueue(&self, events: Vec<RuntimeEvent>) -> Result<()> {
        for event in events {
            self.tx.send(event).map_err(|_| RuntimeError::ChannelClosed)?;
        }
        Ok(())
    }

    /// Copy of the run's execution context as last seen by the run loop.
    pub fn view(&self) -> ExecutionView {
        self.view.borrow().clone()
    }

    /// Cooperative stop flag, set once the run loop processes an exit.
    pub fn should_exit(&self) -> bool {
        self.view.borrow().should_exit
    }

    pub fn thread_id(&self) -> String {
        self.view.borrow().thread_id.clone()
    }

    /// Stream a complete text message. Returns the generated message id.
    pub async fn emit_message(&self, text: impl Into<String>) -> Result<String> {
        let message_id = Uuid::new_v4().to_string();
        self.publish([
            ProtocolEvent::text_start(message_id.clone(), None).into(),
            ProtocolEvent::text_content(message_id.clone(), text).into(),
            ProtocolEvent::text_end(message_id.clone()).into(),
        ])
        .await?;
        Ok(message_id)
    }

    /// Stream a complete tool call. Returns the generated execution id.
    pub async fn emit_tool_call(&self, tool_name: impl Into<String>, args: &Value) -> Result<String> {
        let execution_id = Uuid::new_v4().to_string();
        self.publish([
            ProtocolEvent::tool_start(execution_id.clone(), tool_name, None).into(),
            ProtocolEvent::tool_args(execution_id.clone(), args.to_string()).into(),
            ProtocolEvent::tool_end(execution_id.clone()).into(),
        ])
        .await?;
        Ok(execution_id)
    }

    pub async fn emit_tool_result(
        &self,
        execution_id: impl Into<String>,
        tool_name: impl Into<String>,
        result: &Value,
    ) -> Result<()> {
        self.emit(ProtocolEvent::tool_result(
            execution_id,
            tool_name,
            result.to_string(),
        ))
        .await
    }

    /// Send an intermediate state snapshot for the current node.
    pub async fn emit_state(&self, state: &AgentState) -> Result<()> {
        let view = self.view();
        let snapshot = StateSnapshot {
            thread_id: view.thread_id,
            agent_name: view.agent_name,
            node_name: view.node_name,
            run_id: view.run_id,
            active: true,
            role: self.config.snapshot_role.clone(),
            state: state_payload(state, &self.config),
            running: true,
        };
        self.emit(snapshot).await
    }

    /// Ask the run loop to flag the run for a cooperative stop.
    pub async fn exit(&self) -> Result<()> {
        self.publish_priority([RuntimeEvent::exit()]).await
    }

    /// Install the predict-state mapping for the current node.
    pub async fn predict_state(&self, config: PredictStateMap) -> Result<()> {
        self.emit(RuntimeEvent::predict_config(config)).await
    }

    pub async fn interrupt(&self, value: Value) -> Result<()> {
        self.emit(ControlEvent::Interrupt(value)).await
    }

    pub async fn run_started(&self, state: AgentState) -> Result<()> {
        self.emit(RuntimeEvent::run_started(state)).await
    }

    pub async fn node_started(&self, node_name: impl Into<String>, state: AgentState) -> Result<()> {
        self.emit(RuntimeEvent::node_started(node_name, state)).await
    }

    pub async fn node_finished(&self, node_name: impl Into<String>, state: AgentState) -> Result<()> {
        self.emit(RuntimeEvent::node_finished(node_name, state)).await
    }

    pub async fn run_finished(&self, state: AgentState) -> Result<()> {
        self.emit(RuntimeEvent::run_finished(state)).await
    }

    pub async fn run_error(&self, error: EngineError) -> Result<()> {
        self.emit(RuntimeEvent::run_error(error)).await
    }
}
