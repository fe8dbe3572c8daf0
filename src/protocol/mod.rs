//! Event model: wire vocabulary, constructors and serialization.

pub mod events;
pub mod feed;
pub mod serializer;
pub mod wire;

pub use events::*;
pub use feed::{parse_feed, parse_feed_line};
pub use serializer::{emit_event, emit_events};
pub use wire::{ControlKind, EventType};
