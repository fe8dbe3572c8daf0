//! Newline-delimited JSON encoding of protocol events.

use crate::error::Result;

use super::events::ProtocolEvent;

/// Serialize one event as a single `\n`-terminated JSON line.
pub fn emit_event(event: &ProtocolEvent) -> Result<String> {
    let mut line = serde_json::to_string(event)?;
    line.push('\n');
    Ok(line)
}

/// Serialize events in order, one line each.
pub fn emit_events<'a, I>(events: I) -> Result<String>
where
    I: IntoIterator<Item = &'a ProtocolEvent>,
{
    let mut text = String::new();
    for event in events {
        text.push_str(&emit_event(event)?);
    }
    Ok(text)
}
