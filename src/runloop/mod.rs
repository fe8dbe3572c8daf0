//! The run loop: one producer task publishing into an ordered channel, one
//! consumer classifying events and emitting wire text.

mod dispatcher;
pub mod lifecycle;
mod publisher;
mod runner;

pub use dispatcher::Dispatcher;
pub use lifecycle::drive;
pub use publisher::{yield_control, EventPublisher};
pub use runner::{replay, run};
