//! Event classification for one run.

use tokio::sync::watch;

use crate::config::RunLoopConfig;
use crate::error::{EngineError, Result};
use crate::execution::{ExecutionState, ExecutionView};
use crate::predict::{predict_state, state_payload};
use crate::protocol::{
    emit_event, emit_events, ControlEvent, LifecycleEvent, ProtocolEvent, RuntimeEvent,
    StateSnapshot,
};

/// Sole owner and mutator of a run's [`ExecutionState`].
///
/// Each call to [`Dispatcher::handle`] classifies one channel event, updates
/// the execution context and returns the wire text to forward, if any.
#[derive(Debug)]
pub struct Dispatcher {
    execution: ExecutionState,
    config: RunLoopConfig,
    view: Option<watch::Sender<ExecutionView>>,
    run_error: Option<EngineError>,
}

impl Dispatcher {
    pub fn new(execution: ExecutionState, config: RunLoopConfig) -> Self {
        Self {
            execution,
            config,
            view: None,
            run_error: None,
        }
    }

    pub(crate) fn with_view(mut self, view: watch::Sender<ExecutionView>) -> Self {
        self.view = Some(view);
        self
    }

    pub fn execution(&self) -> &ExecutionState {
        &self.execution
    }

    pub fn is_finished(&self) -> bool {
        self.execution.is_finished
    }

    /// Engine error recorded from a `RunError` event, if any.
    pub fn take_run_error(&mut self) -> Option<EngineError> {
        self.run_error.take()
    }

    pub fn into_execution(self) -> ExecutionState {
        self.execution
    }

    pub fn handle(&mut self, event: RuntimeEvent) -> Result<Option<String>> {
        if self.execution.is_finished {
            tracing::debug!(
                run_id = %self.execution.run_id,
                event_type = %event.event_type(),
                "dropping event after run finished"
            );
            return Ok(None);
        }
        match event {
            RuntimeEvent::Protocol(event) => self.handle_protocol(event).map(Some),
            RuntimeEvent::Control(control) => {
                self.handle_control(control);
                Ok(None)
            }
            RuntimeEvent::Lifecycle(lifecycle) => self.handle_lifecycle(lifecycle),
        }
    }

    fn handle_protocol(&mut self, event: ProtocolEvent) -> Result<String> {
        let predicted = match event {
            ProtocolEvent::ToolStart { .. } | ProtocolEvent::ToolArgs { .. } => {
                predict_state(&event, &mut self.execution, &self.config)
            }
            _ => None,
        };
        match predicted {
            Some(snapshot) => emit_events(&[event, ProtocolEvent::StateSnapshot(snapshot)]),
            None => emit_event(&event),
        }
    }

    fn handle_control(&mut self, control: ControlEvent) {
        match control {
            ControlEvent::PredictConfig(config) => {
                tracing::debug!(
                    run_id = %self.execution.run_id,
                    keys = config.len(),
                    "predict-state configuration installed"
                );
                self.execution.predict_state_configuration = config;
            }
            ControlEvent::Exit(flag) => {
                self.execution.should_exit = flag;
                self.publish_view();
            }
            ControlEvent::Interrupt(_) => {
                tracing::debug!(run_id = %self.execution.run_id, "ignoring interrupt control event");
            }
        }
    }

    fn handle_lifecycle(&mut self, event: LifecycleEvent) -> Result<Option<String>> {
        match event {
            LifecycleEvent::RunStarted { state } => {
                self.execution.state = state;
                self.publish_view();
                Ok(None)
            }
            LifecycleEvent::NodeStarted { node_name, state } => {
                tracing::debug!(run_id = %self.execution.run_id, node_name = %node_name, "node started");
                self.execution.node_name = node_name;
                self.execution.state = state;
                self.publish_view();
                emit_event(&ProtocolEvent::StateSnapshot(self.engine_snapshot(true))).map(Some)
            }
            LifecycleEvent::NodeFinished { node_name, state } => {
                tracing::debug!(run_id = %self.execution.run_id, node_name = %node_name, "node finished");
                self.execution.reset_prediction();
                self.execution.state = state;
                self.publish_view();
                emit_event(&ProtocolEvent::StateSnapshot(self.engine_snapshot(false))).map(Some)
            }
            LifecycleEvent::RunFinished { state } => {
                self.execution.state = state;
                self.execution.is_finished = true;
                Ok(None)
            }
            LifecycleEvent::RunError { error } => {
                tracing::error!(
                    run_id = %self.execution.run_id,
                    thread_id = %self.execution.thread_id,
                    node_name = %self.execution.node_name,
                    error = %error,
                    causes = ?error.cause_chain(),
                    "agent run failed"
                );
                self.run_error = Some(error);
                self.execution.is_finished = true;
                Ok(None)
            }
        }
    }

    fn engine_snapshot(&self, active: bool) -> StateSnapshot {
        let payload = state_payload(&self.execution.state, &self.config);
        self.execution
            .snapshot(payload, active, &self.config.snapshot_role)
    }

    fn publish_view(&self) {
        if let Some(view) = &self.view {
            view.send_replace(self.execution.view());
        }
    }
}
