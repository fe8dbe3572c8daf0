//! Convenience re-exports for common use.

pub use crate::agent::{run_agent, Agent, AgentInfo};
pub use crate::config::RunLoopConfig;
pub use crate::error::{EngineError, Result, RuntimeError};
pub use crate::execution::{ExecutionState, ExecutionView};
pub use crate::protocol::{
    AgentState, ControlEvent, LifecycleEvent, PredictStateConfig, PredictStateMap, ProtocolEvent,
    RuntimeEvent, StateSnapshot,
};
pub use crate::runloop::{drive, run, EventPublisher};
