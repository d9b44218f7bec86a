//! Broadcast (Tee): copy every value to all outputs, in port order.
//!
//! Delivery is synchronous. Output `i + 1` does not see a value until
//! output `i` has taken it, so the slowest consumer paces the whole fan-out.
//! An output whose consumer has gone is skipped from then on. When the input
//! closes, every output is closed.

use crate::pipeline::conduit::{ConduitReceiver, ConduitSender};
use crate::pipeline::error::PipelineResult;
use crate::pipeline::lifecycle::Lifecycle;
use crate::pipeline::port::{PortDescriptor, PortKind};
use crate::pipeline::stage::{close_output, deliver, Delivery, Stage, StageContext, StageSummary};

pub struct TeeStage<T> {
    name: String,
    input: ConduitReceiver<T>,
    outputs: Vec<ConduitSender<T>>,
}

impl<T: Clone + Send> TeeStage<T> {
    /// An empty output list is allowed: every value is consumed and dropped.
    pub fn new(input: ConduitReceiver<T>, outputs: Vec<ConduitSender<T>>) -> Self {
        Self {
            name: format!("tee[{}]", input.name()),
            input,
            outputs,
        }
    }
}

impl<T: Clone + Send> Stage for TeeStage<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn ports(&self) -> Vec<PortDescriptor> {
        let mut ports = vec![PortDescriptor::input(self.input.name(), PortKind::Value)];
        ports.extend(
            self.outputs
                .iter()
                .map(|o| PortDescriptor::output(o.name(), PortKind::Value)),
        );
        ports
    }

    fn run(&mut self, _ctx: &StageContext) -> PipelineResult<StageSummary> {
        let mut lifecycle = Lifecycle::new(&self.name);
        let mut summary = StageSummary::default();
        let mut open = vec![true; self.outputs.len()];

        let reason = loop {
            let Some(x) = self.input.recv() else {
                break "input closed";
            };
            summary.received += 1;

            let mut delivered_any = false;
            for (out, is_open) in self.outputs.iter().zip(open.iter_mut()) {
                if !*is_open {
                    continue;
                }
                match deliver(out, x.clone())? {
                    Delivery::Delivered => {
                        summary.emitted += 1;
                        delivered_any = true;
                    }
                    Delivery::Gone => *is_open = false,
                }
            }
            if !delivered_any {
                summary.dropped += 1;
            }

            if !self.outputs.is_empty() && open.iter().all(|o| !o) {
                break "all outputs dropped";
            }
        };

        lifecycle.begin_drain(reason)?;
        for out in &mut self.outputs {
            close_output(out)?;
        }
        lifecycle.finish()?;
        Ok(summary)
    }
}
