//! Synchronizing join (Zip): one value from every input per round.
//!
//! Inputs are read in port order. A round completes only once every input
//! has contributed, so a stalled input stalls the join. The first input to
//! close ends the join: the partial round is discarded, every input is
//! released, and the output is closed.

use crate::pipeline::conduit::{ConduitReceiver, ConduitSender};
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::lifecycle::Lifecycle;
use crate::pipeline::port::{PortDescriptor, PortKind};
use crate::pipeline::stage::{close_output, deliver, Delivery, Stage, StageContext, StageSummary};
use crate::types::{Tuple, Value};

pub struct ZipStage {
    name: String,
    inputs: Vec<ConduitReceiver<Value>>,
    output: ConduitSender<Tuple>,
}

impl ZipStage {
    pub fn new(
        inputs: Vec<ConduitReceiver<Value>>,
        output: ConduitSender<Tuple>,
    ) -> PipelineResult<Self> {
        if inputs.is_empty() {
            return Err(PipelineError::Config(format!(
                "join into '{}' needs at least one input",
                output.name()
            )));
        }
        Ok(Self {
            name: format!("zip[{}]", output.name()),
            inputs,
            output,
        })
    }

    /// Number of inputs, i.e. the width of every emitted tuple.
    pub fn width(&self) -> usize {
        self.inputs.len()
    }
}

impl Stage for ZipStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn ports(&self) -> Vec<PortDescriptor> {
        let mut ports: Vec<PortDescriptor> = self
            .inputs
            .iter()
            .map(|i| PortDescriptor::input(i.name(), PortKind::Value))
            .collect();
        ports.push(PortDescriptor::output(self.output.name(), PortKind::Tuple));
        ports
    }

    fn run(&mut self, _ctx: &StageContext) -> PipelineResult<StageSummary> {
        let mut lifecycle = Lifecycle::new(&self.name);
        let mut summary = StageSummary::default();
        let width = self.inputs.len();

        let reason = 'rounds: loop {
            let mut row: Tuple = Vec::with_capacity(width);
            for input in &self.inputs {
                match input.recv() {
                    Some(x) => {
                        summary.received += 1;
                        row.push(x);
                    }
                    None => {
                        if !row.is_empty() {
                            tracing::debug!(
                                "Stage '{}': discarding partial round of {} values, '{}' closed",
                                self.name,
                                row.len(),
                                input.name()
                            );
                            summary.dropped += row.len() as u64;
                        }
                        break 'rounds "an input closed";
                    }
                }
            }
            match deliver(&self.output, row)? {
                Delivery::Delivered => summary.emitted += 1,
                Delivery::Gone => break "output dropped",
            }
        };

        lifecycle.begin_drain(reason)?;
        // Producers still blocked on the other inputs see their consumer leave.
        self.inputs.clear();
        close_output(&mut self.output)?;
        lifecycle.finish()?;
        Ok(summary)
    }
}
