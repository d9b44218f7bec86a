//! Reduce: fold each tuple into one scalar.
//!
//! The combiner may carry state between calls (a running mean, say); it is
//! owned by the reduce stage and never shared. With an expected width set,
//! a tuple of any other width is a dimension mismatch and ends the stage
//! before the combiner sees it.

use crate::pipeline::conduit::{ConduitReceiver, ConduitSender};
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::lifecycle::Lifecycle;
use crate::pipeline::port::{PortDescriptor, PortKind};
use crate::pipeline::stage::{close_output, deliver, Delivery, Stage, StageContext, StageSummary};
use crate::types::{Tuple, Value};

pub struct ReduceStage<F> {
    name: String,
    combine: F,
    width: Option<usize>,
    input: ConduitReceiver<Tuple>,
    output: ConduitSender<Value>,
}

impl<F> ReduceStage<F>
where
    F: FnMut(&[Value]) -> Value + Send,
{
    pub fn new(
        name: impl Into<String>,
        combine: F,
        input: ConduitReceiver<Tuple>,
        output: ConduitSender<Value>,
    ) -> Self {
        Self {
            name: format!("reduce[{}]", name.into()),
            combine,
            width: None,
            input,
            output,
        }
    }

    /// Require every tuple to have exactly `width` values.
    pub fn with_width(mut self, width: usize) -> Self {
        self.width = Some(width);
        self
    }

    fn check_width(&self, row: &[Value]) -> PipelineResult<()> {
        match self.width {
            Some(expected) if row.len() != expected => Err(PipelineError::DimensionMismatch {
                expected,
                actual: row.len(),
            }),
            _ => Ok(()),
        }
    }
}

impl<F> Stage for ReduceStage<F>
where
    F: FnMut(&[Value]) -> Value + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn ports(&self) -> Vec<PortDescriptor> {
        vec![
            PortDescriptor::input(self.input.name(), PortKind::Tuple),
            PortDescriptor::output(self.output.name(), PortKind::Value),
        ]
    }

    fn run(&mut self, _ctx: &StageContext) -> PipelineResult<StageSummary> {
        let mut lifecycle = Lifecycle::new(&self.name);
        let mut summary = StageSummary::default();

        let outcome = self.reduce_all(&mut summary);

        // Release the consumer even when the reduce failed.
        let reason = match &outcome {
            Ok(reason) => *reason,
            Err(_) => "reduce failed",
        };
        lifecycle.begin_drain(reason)?;
        close_output(&mut self.output)?;
        lifecycle.finish()?;

        outcome.map(|_| summary)
    }
}

impl<F> ReduceStage<F>
where
    F: FnMut(&[Value]) -> Value + Send,
{
    fn reduce_all(&mut self, summary: &mut StageSummary) -> PipelineResult<&'static str> {
        while let Some(row) = self.input.recv() {
            summary.received += 1;
            if let Err(e) = self.check_width(&row) {
                tracing::error!("Stage '{}': {}", self.name, e);
                return Err(e);
            }
            let value = (self.combine)(&row);
            match deliver(&self.output, value)? {
                Delivery::Delivered => summary.emitted += 1,
                Delivery::Gone => return Ok("output dropped"),
            }
        }
        Ok("input closed")
    }
}

/// Sum of the tuple. An empty tuple sums to 0.
pub fn sum(row: &[Value]) -> Value {
    row.iter().sum()
}

/// Arithmetic mean of the tuple, NaN when empty.
pub fn mean(row: &[Value]) -> Value {
    if row.is_empty() {
        return Value::NAN;
    }
    sum(row) / row.len() as Value
}

pub fn min(row: &[Value]) -> Value {
    row.iter().copied().fold(Value::INFINITY, Value::min)
}

pub fn max(row: &[Value]) -> Value {
    row.iter().copied().fold(Value::NEG_INFINITY, Value::max)
}

/// Mean of every value seen so far, across all tuples.
pub fn running_mean() -> impl FnMut(&[Value]) -> Value + Send {
    let mut total = 0.0;
    let mut count = 0u64;
    move |row| {
        total += sum(row);
        count += row.len() as u64;
        if count == 0 {
            Value::NAN
        } else {
            total / count as Value
        }
    }
}
