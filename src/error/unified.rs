//! Error classification.

/// Broad error category used to decide how far an error may travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The engine running the step function failed; ends the run.
    Engine,
    /// Publishing outside a run, or after the run loop went away.
    ContextMisuse,
    Serialization,
    Configuration,
    /// The producer task panicked or was aborted.
    Task,
    InvalidInput,
}
