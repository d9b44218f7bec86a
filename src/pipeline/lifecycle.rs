//! Per-stage lifecycle: `Running → Draining → Closed`.
//!
//! Close propagation across multi-port stages is explicit. A stage enters
//! `Draining` when it observes the end of its input (or, for a join, the end
//! of any input), closes its outputs, and only then reaches `Closed`.
//! Transitions go forward only; anything else is a protocol violation.

use crate::pipeline::error::{PipelineError, PipelineResult};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageState {
    Running,
    Draining,
    Closed,
}

impl fmt::Display for StageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StageState::Running => "running",
            StageState::Draining => "draining",
            StageState::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// Tracks one stage's state and logs each transition.
#[derive(Debug)]
pub struct Lifecycle {
    stage: String,
    state: StageState,
}

impl Lifecycle {
    pub fn new(stage: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            state: StageState::Running,
        }
    }

    #[inline]
    pub fn state(&self) -> StageState {
        self.state
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.state == StageState::Running
    }

    /// Input ended; outputs are about to be closed.
    pub fn begin_drain(&mut self, reason: &str) -> PipelineResult<()> {
        self.advance(StageState::Running, StageState::Draining)?;
        tracing::debug!("Stage '{}' draining: {}", self.stage, reason);
        Ok(())
    }

    /// Outputs closed; the stage is done.
    pub fn finish(&mut self) -> PipelineResult<()> {
        self.advance(StageState::Draining, StageState::Closed)?;
        tracing::debug!("Stage '{}' closed", self.stage);
        Ok(())
    }

    fn advance(&mut self, from: StageState, to: StageState) -> PipelineResult<()> {
        if self.state != from {
            return Err(PipelineError::ProtocolViolation(format!(
                "stage '{}' cannot go {} -> {}",
                self.stage, self.state, to
            )));
        }
        self.state = to;
        Ok(())
    }
}
