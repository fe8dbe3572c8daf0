//! Run lifecycle bracketing for producers.

use std::future::Future;

use crate::error::EngineError;
use crate::protocol::AgentState;

use super::publisher::EventPublisher;

/// Bracket `body` with run lifecycle events.
///
/// Emits `RunStarted(initial_state)`, awaits `body`, then emits
/// `RunFinished(final_state)` on success or `RunError(err)` on failure. The
/// body's error is returned unchanged so the run loop can hand the same error
/// to the caller.
pub async fn drive<Fut>(
    publisher: &EventPublisher,
    initial_state: AgentState,
    body: Fut,
) -> Result<(), EngineError>
where
    Fut: Future<Output = Result<AgentState, EngineError>>,
{
    publisher
        .run_started(initial_state)
        .await
        .map_err(EngineError::new)?;

    match body.await {
        Ok(final_state) => publisher
            .run_finished(final_state)
            .await
            .map_err(EngineError::new),
        Err(err) => {
            if let Err(publish_err) = publisher.run_error(err.clone()).await {
                tracing::warn!(
                    error = %err,
                    publish_error = %publish_err,
                    "could not report run error to the run loop"
                );
            }
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunLoopConfig;
    use crate::execution::ExecutionState;
    use crate::runloop::run;
    use futures::StreamExt;

    #[tokio::test]
    async fn body_error_is_returned_and_reported() {
        let failure = EngineError::msg("node crashed");
        let expected = failure.clone();
        let mut stream = run(
            ExecutionState::new("t1", "a", "r1"),
            RunLoopConfig::default(),
            move |publisher| async move {
                drive(&publisher, AgentState::new(), async move { Err::<AgentState, _>(failure) }).await
            },
        );
        let Some(Err(crate::error::RuntimeError::Engine(err))) = stream.next().await else {
            panic!("expected the engine error");
        };
        assert!(err.ptr_eq(&expected));
        assert!(stream.next().await.is_none());
    }
}
