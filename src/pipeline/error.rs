//! Pipeline-specific error types.

use thiserror::Error;

/// Errors that can occur within a running pipeline.
///
/// Data-level failures (`MalformedInput`, `SinkWrite`) are absorbed and logged
/// by the stage that hits them. Structural failures end the stage and surface
/// through the supervisor's join report.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Malformed input {line:?}: {message}")]
    MalformedInput { line: String, message: String },

    #[error("Transform failure in {stage}: {message}")]
    TransformFailure { stage: String, message: String },

    #[error("Dimension mismatch: expected width {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Sink write failure: {0}")]
    SinkWrite(String),

    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("Conduit {0} has no receiver")]
    Disconnected(String),

    #[error("Stage cancelled")]
    Cancelled,

    #[error("Invalid stage configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Whether this error is fatal to the stage that raised it.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            PipelineError::TransformFailure { .. }
                | PipelineError::DimensionMismatch { .. }
                | PipelineError::ProtocolViolation(_)
        )
    }

    pub(crate) fn transform(stage: &str, message: impl Into<String>) -> Self {
        PipelineError::TransformFailure {
            stage: stage.to_string(),
            message: message.into(),
        }
    }
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
