//! Source stage: pushes generator output downstream until cancelled.
//!
//! A source never runs dry and never closes its output of its own accord.
//! It stops when its cancellation token fires (checked between cycles and
//! while blocked on a send) or when the consumer goes away. A generator that
//! sleeps before returning throttles the whole chain behind it.

use crate::pipeline::conduit::ConduitSender;
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::lifecycle::Lifecycle;
use crate::pipeline::port::{PortDescriptor, PortKind};
use crate::pipeline::stage::{close_output, Stage, StageContext, StageSummary};
use crate::types::Value;

pub struct SourceStage<G> {
    name: String,
    generator: G,
    output: ConduitSender<Value>,
}

impl<G> SourceStage<G>
where
    G: FnMut() -> Value + Send,
{
    pub fn new(name: impl Into<String>, generator: G, output: ConduitSender<Value>) -> Self {
        Self {
            name: name.into(),
            generator,
            output,
        }
    }
}

impl<G> Stage for SourceStage<G>
where
    G: FnMut() -> Value + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn ports(&self) -> Vec<PortDescriptor> {
        vec![PortDescriptor::output(self.output.name(), PortKind::Value)]
    }

    fn run(&mut self, ctx: &StageContext) -> PipelineResult<StageSummary> {
        let mut lifecycle = Lifecycle::new(&self.name);
        let mut summary = StageSummary::default();

        let reason = loop {
            if ctx.cancel.is_cancelled() {
                break "cancelled";
            }
            let value = (self.generator)();
            match self.output.send_or_cancel(value, &ctx.cancel) {
                Ok(()) => summary.emitted += 1,
                Err(PipelineError::Cancelled) => {
                    summary.dropped += 1;
                    break "cancelled";
                }
                Err(PipelineError::Disconnected(_)) => {
                    summary.dropped += 1;
                    break "output dropped";
                }
                Err(e) => return Err(e),
            }
        };

        lifecycle.begin_drain(reason)?;
        close_output(&mut self.output)?;
        lifecycle.finish()?;
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::cancel::CancelHandle;
    use crate::pipeline::conduit::conduit;
    use crate::pipeline::id::TaskId;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_source_emits_until_cancelled() {
        let (tx, rx) = conduit("counter");
        let mut n = 0.0;
        let mut stage = SourceStage::new(
            "counter",
            move || {
                n += 1.0;
                n
            },
            tx,
        );

        let mut handle = CancelHandle::new();
        let ctx = StageContext::new(TaskId(0), handle.token());
        let runner = thread::spawn(move || stage.run(&ctx));

        let got: Vec<Value> = (0..5).map(|_| rx.recv().unwrap()).collect();
        assert_eq!(got, vec![1.0, 2.0, 3.0, 4.0, 5.0]);

        // The source is now blocked handing over the 6th value.
        handle.cancel();
        let summary = runner.join().unwrap().unwrap();
        assert_eq!(summary.emitted, 5);
        assert_eq!(rx.recv(), None);
    }

    #[test]
    fn test_source_stops_when_consumer_leaves() {
        let (tx, rx) = conduit("ones");
        let mut stage = SourceStage::new("ones", || 1.0, tx);
        let runner = thread::spawn(move || stage.run(&StageContext::detached()));

        assert_eq!(rx.recv(), Some(1.0));
        drop(rx);
        let summary = runner.join().unwrap().unwrap();
        assert_eq!(summary.emitted, 1);
    }

    #[test]
    fn test_blocking_generator_throttles() {
        let (tx, rx) = conduit("slow");
        let mut stage = SourceStage::new(
            "slow",
            || {
                thread::sleep(Duration::from_millis(20));
                0.0
            },
            tx,
        );
        let mut handle = CancelHandle::new();
        let ctx = StageContext::new(TaskId(0), handle.token());
        let runner = thread::spawn(move || stage.run(&ctx));

        let start = std::time::Instant::now();
        for _ in 0..3 {
            rx.recv().unwrap();
        }
        assert!(start.elapsed() >= Duration::from_millis(60));

        handle.cancel();
        runner.join().unwrap().unwrap();
    }
}
