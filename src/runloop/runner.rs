//! Consumer side of a run: drains the channel into wire text.

use std::future::Future;
use std::sync::Arc;

use futures::stream::BoxStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::config::RunLoopConfig;
use crate::error::{EngineError, Result, RuntimeError};
use crate::execution::ExecutionState;
use crate::protocol::RuntimeEvent;

use super::dispatcher::Dispatcher;
use super::publisher::{yield_control, EventPublisher};

type ProducerResult = std::result::Result<(), EngineError>;

/// Spawned producer that is aborted if the run loop is dropped before joining it.
struct ProducerTask {
    handle: Option<JoinHandle<ProducerResult>>,
}

impl ProducerTask {
    fn spawn<Fut>(future: Fut) -> Self
    where
        Fut: Future<Output = ProducerResult> + Send + 'static,
    {
        Self {
            handle: Some(tokio::spawn(future)),
        }
    }

    async fn join(&mut self) -> Result<ProducerResult> {
        let Some(handle) = self.handle.as_mut() else {
            return Ok(Ok(()));
        };
        let joined = handle.await;
        self.handle = None;
        joined.map_err(|err| {
            if err.is_panic() {
                RuntimeError::Task(format!("producer panicked: {err}"))
            } else {
                RuntimeError::Task(format!("producer cancelled: {err}"))
            }
        })
    }
}

impl Drop for ProducerTask {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Run `producer` against a fresh event channel and stream the wire output.
///
/// Nothing happens until the returned stream is first polled: the channel is
/// created and the producer spawned lazily. The producer receives the run's
/// [`EventPublisher`], which is also bound as [`EventPublisher::current`] for
/// the producer task.
///
/// The stream ends after a `RunFinished` or `RunError` event, or once every
/// publisher handle is gone and the channel has drained. Either way the
/// producer task is awaited before the stream ends. A producer error is
/// yielded as the final item; failing that, an error recorded from a
/// `RunError` event is. Events published after the run finished are
/// discarded. Dropping the stream early aborts the producer.
pub fn run<F, Fut>(
    execution: ExecutionState,
    config: RunLoopConfig,
    producer: F,
) -> BoxStream<'static, Result<String>>
where
    F: FnOnce(EventPublisher) -> Fut + Send + 'static,
    Fut: Future<Output = ProducerResult> + Send + 'static,
{
    let output = async_stream::stream! {
        let yield_after_event = config.yield_after_event;
        let shared_config = Arc::new(config.clone());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (view_tx, view_rx) = watch::channel(execution.view());
        let span = tracing::debug_span!(
            "agent_run",
            run_id = %execution.run_id,
            thread_id = %execution.thread_id,
            agent_name = %execution.agent_name,
        );
        tracing::debug!(
            run_id = %execution.run_id,
            thread_id = %execution.thread_id,
            "starting run loop"
        );

        let mut dispatcher = Dispatcher::new(execution, config).with_view(view_tx);
        let publisher = EventPublisher::new(tx, view_rx, shared_config);
        let mut producer_task = ProducerTask::spawn(
            publisher.clone().scope(producer(publisher)).instrument(span),
        );

        while let Some(event) = rx.recv().await {
            match dispatcher.handle(event) {
                Ok(Some(text)) => yield Ok(text),
                Ok(None) => {}
                Err(err) => {
                    tracing::error!(
                        run_id = %dispatcher.execution().run_id,
                        error = %err,
                        "failed to serialize event"
                    );
                    yield Err(err);
                    return;
                }
            }
            if dispatcher.is_finished() {
                break;
            }
            if yield_after_event {
                yield_control().await;
            }
        }

        let joined = producer_task.join().await;
        drop(rx);
        tracing::debug!(
            run_id = %dispatcher.execution().run_id,
            finished = dispatcher.is_finished(),
            "run loop finished"
        );
        match joined {
            Ok(Ok(())) => {
                if let Some(err) = dispatcher.take_run_error() {
                    yield Err(RuntimeError::Engine(err));
                }
            }
            Ok(Err(err)) => yield Err(RuntimeError::Engine(err)),
            Err(err) => yield Err(err),
        }
    };
    Box::pin(output)
}

/// Run a pre-recorded event sequence through the run loop.
///
/// Each event is published in order from a producer task, exactly as a live
/// engine would publish it.
pub fn replay(
    events: Vec<RuntimeEvent>,
    execution: ExecutionState,
    config: RunLoopConfig,
) -> BoxStream<'static, Result<String>> {
    run(execution, config, move |publisher| async move {
        for event in events {
            publisher.emit(event).await.map_err(EngineError::new)?;
        }
        Ok::<_, EngineError>(())
    })
}
