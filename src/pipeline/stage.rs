//! Stage abstraction for the pipeline.
//!
//! A stage owns the conduit ends it reads and writes and runs as one blocking
//! loop on its own thread. It finishes when its input closes, when every
//! consumer has gone away, or (for unbounded stages) when cancelled.

use crate::pipeline::cancel::CancelToken;
use crate::pipeline::conduit::ConduitSender;
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::id::TaskId;
use crate::pipeline::port::PortDescriptor;

/// Context handed to a stage when it starts.
#[derive(Debug, Clone)]
pub struct StageContext {
    /// The supervisor's id for this task.
    pub task_id: TaskId,
    /// Cancellation signal for unbounded stages.
    pub cancel: CancelToken,
}

impl StageContext {
    pub fn new(task_id: TaskId, cancel: CancelToken) -> Self {
        Self { task_id, cancel }
    }

    /// A context for running a stage by hand, outside a supervisor.
    pub fn detached() -> Self {
        Self::new(TaskId::INVALID, CancelToken::never())
    }
}

/// Counters reported by a stage when it finishes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StageSummary {
    /// Items taken from inputs.
    pub received: u64,
    /// Items handed to outputs (or written, for sinks).
    pub emitted: u64,
    /// Items consumed without being forwarded (unmatched, skipped, failed writes).
    pub dropped: u64,
}

/// A pipeline stage.
pub trait Stage: Send {
    /// Human-readable name, used for thread names and logs.
    fn name(&self) -> &str;

    /// The conduits this stage reads and writes.
    fn ports(&self) -> Vec<PortDescriptor>;

    /// Run to completion on the current thread.
    fn run(&mut self, ctx: &StageContext) -> PipelineResult<StageSummary>;
}

/// Result of handing one item to an output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Delivery {
    Delivered,
    /// The consumer dropped its end; nothing downstream wants more.
    Gone,
}

/// Send `value`, mapping a vanished consumer to [`Delivery::Gone`].
pub(crate) fn deliver<T>(out: &ConduitSender<T>, value: T) -> PipelineResult<Delivery> {
    match out.send(value) {
        Ok(()) => Ok(Delivery::Delivered),
        Err(PipelineError::Disconnected(name)) => {
            tracing::debug!("Consumer of '{}' went away", name);
            Ok(Delivery::Gone)
        }
        Err(e) => Err(e),
    }
}

/// Close an output unless it is already closed.
pub(crate) fn close_output<T>(out: &mut ConduitSender<T>) -> PipelineResult<()> {
    if out.is_closed() {
        return Ok(());
    }
    out.close()
}
