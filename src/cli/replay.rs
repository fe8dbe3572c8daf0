//! `agent-runloop replay`

use std::io::Write;

use futures::StreamExt;

use crate::config::RunLoopConfig;
use crate::error::Result;
use crate::execution::ExecutionState;
use crate::protocol::parse_feed;
use crate::runloop;

use super::ReplayArgs;

pub async fn handle_replay(args: ReplayArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => RunLoopConfig::load(path)?,
        None => RunLoopConfig::global().clone(),
    };
    let text = tokio::fs::read_to_string(&args.file).await?;
    let events = parse_feed(&text)?;
    tracing::debug!(
        file = %args.file.display(),
        events = events.len(),
        "replaying feed"
    );

    let execution = match args.run_id {
        Some(run_id) => ExecutionState::new(args.thread_id, args.agent_name, run_id),
        None => ExecutionState::start(args.thread_id, args.agent_name),
    };

    let stdout = std::io::stdout();
    write_stream(runloop::replay(events, execution, config), &mut stdout.lock()).await
}

/// Write every chunk of a run loop stream, stopping at the first error.
pub async fn write_stream<W: Write>(
    mut stream: futures::stream::BoxStream<'static, Result<String>>,
    out: &mut W,
) -> Result<()> {
    while let Some(chunk) = stream.next().await {
        out.write_all(chunk?.as_bytes())?;
        out.flush()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RuntimeError;

    #[tokio::test]
    async fn replays_feed_to_writer() {
        let feed = "{\"type\":\"RunStarted\",\"state\":{}}\n\
                    {\"type\":\"TextMessageStart\",\"messageId\":\"m1\",\"parentMessageId\":null}\n\
                    {\"type\":\"TextMessageEnd\",\"messageId\":\"m1\"}\n\
                    {\"type\":\"RunFinished\",\"state\":{}}\n";
        let events = parse_feed(feed).unwrap();
        let mut out = Vec::new();
        write_stream(
            runloop::replay(events, ExecutionState::default(), RunLoopConfig::default()),
            &mut out,
        )
        .await
        .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.starts_with("{\"type\":\"TextMessageStart\""));
    }

    #[tokio::test]
    async fn recorded_run_error_fails_the_replay() {
        let events = parse_feed("{\"type\":\"RunError\",\"message\":\"tool crashed\"}").unwrap();
        let mut out = Vec::new();
        let err = write_stream(
            runloop::replay(events, ExecutionState::default(), RunLoopConfig::default()),
            &mut out,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, RuntimeError::Engine(ref e) if e.to_string() == "tool crashed"));
        assert!(out.is_empty());
    }
}
