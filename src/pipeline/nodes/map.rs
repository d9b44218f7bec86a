//! Map and Tap stages: apply a transform to every value.
//!
//! A panicking transform takes the stage down with it: no substitute value is
//! emitted and the supervisor reports the panic as a transform failure.

use crate::pipeline::conduit::{ConduitReceiver, ConduitSender};
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::lifecycle::Lifecycle;
use crate::pipeline::port::{PortDescriptor, PortKind};
use crate::pipeline::stage::{close_output, deliver, Delivery, Stage, StageContext, StageSummary};
use crate::types::{PredicateOutcome, Transform, Value};

/// Map: `out <- f(x)` for every `x` on the input, in order.
pub struct MapStage {
    name: String,
    f: Transform,
    input: ConduitReceiver<Value>,
    output: ConduitSender<Value>,
}

impl MapStage {
    pub fn new(f: Transform, input: ConduitReceiver<Value>, output: ConduitSender<Value>) -> Self {
        Self {
            name: format!("map[{}]", f.name()),
            f,
            input,
            output,
        }
    }

    /// Forwards values unchanged.
    pub fn identity(input: ConduitReceiver<Value>, output: ConduitSender<Value>) -> Self {
        Self::new(Transform::identity(), input, output)
    }
}

impl Stage for MapStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn ports(&self) -> Vec<PortDescriptor> {
        vec![
            PortDescriptor::input(self.input.name(), PortKind::Value),
            PortDescriptor::output(self.output.name(), PortKind::Value),
        ]
    }

    fn run(&mut self, _ctx: &StageContext) -> PipelineResult<StageSummary> {
        let mut lifecycle = Lifecycle::new(&self.name);
        let mut summary = StageSummary::default();

        let reason = loop {
            let Some(x) = self.input.recv() else {
                break "input closed";
            };
            summary.received += 1;
            match deliver(&self.output, self.f.apply(x))? {
                Delivery::Delivered => summary.emitted += 1,
                Delivery::Gone => break "output dropped",
            }
        };

        lifecycle.begin_drain(reason)?;
        close_output(&mut self.output)?;
        lifecycle.finish()?;
        Ok(summary)
    }
}

/// Tap: like Map, but also forwards the *original* value to a signal conduit
/// whenever `test(x) == 1`.
pub struct TapStage {
    name: String,
    f: Transform,
    test: Transform,
    input: ConduitReceiver<Value>,
    output: ConduitSender<Value>,
    signal: ConduitSender<Value>,
}

impl TapStage {
    pub fn new(
        f: Transform,
        test: Transform,
        input: ConduitReceiver<Value>,
        output: ConduitSender<Value>,
        signal: ConduitSender<Value>,
    ) -> Self {
        Self {
            name: format!("tap[{} if {}]", f.name(), test.name()),
            f,
            test,
            input,
            output,
            signal,
        }
    }
}

impl Stage for TapStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn ports(&self) -> Vec<PortDescriptor> {
        vec![
            PortDescriptor::input(self.input.name(), PortKind::Value),
            PortDescriptor::output(self.output.name(), PortKind::Value),
            PortDescriptor::output(self.signal.name(), PortKind::Value),
        ]
    }

    fn run(&mut self, _ctx: &StageContext) -> PipelineResult<StageSummary> {
        let mut lifecycle = Lifecycle::new(&self.name);
        let mut summary = StageSummary::default();

        let outcome = self.tap_all(&mut summary);

        // Release both consumers even when the predicate failed.
        let reason = match &outcome {
            Ok(reason) => *reason,
            Err(_) => "predicate failed",
        };
        lifecycle.begin_drain(reason)?;
        close_output(&mut self.output)?;
        close_output(&mut self.signal)?;
        lifecycle.finish()?;

        outcome.map(|_| summary)
    }
}

impl TapStage {
    fn tap_all(&self, summary: &mut StageSummary) -> PipelineResult<&'static str> {
        let mut output_open = true;
        let mut signal_open = true;

        while let Some(x) = self.input.recv() {
            summary.received += 1;

            if output_open {
                match deliver(&self.output, self.f.apply(x))? {
                    Delivery::Delivered => summary.emitted += 1,
                    Delivery::Gone => output_open = false,
                }
            }

            match self.test.test(x) {
                PredicateOutcome::Pass if signal_open => match deliver(&self.signal, x)? {
                    Delivery::Delivered => summary.emitted += 1,
                    Delivery::Gone => signal_open = false,
                },
                PredicateOutcome::Pass | PredicateOutcome::Reject => {}
                PredicateOutcome::Invalid(r) => {
                    return Err(PipelineError::transform(
                        &self.name,
                        format!("predicate '{}' returned {} for {}", self.test.name(), r, x),
                    ));
                }
            }

            if !output_open && !signal_open {
                return Ok("all outputs dropped");
            }
        }
        Ok("input closed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::conduit::conduit;
    use crate::pipeline::filters;
    use crossbeam_channel::RecvTimeoutError;
    use std::thread;
    use std::time::Duration;

    fn feed(values: Vec<Value>) -> ConduitReceiver<Value> {
        let (mut tx, rx) = conduit("feed");
        thread::spawn(move || {
            for v in values {
                tx.send(v).unwrap();
            }
            tx.close().unwrap();
        });
        rx
    }

    #[test]
    fn test_map_doubles_plus_one() {
        let input = feed(vec![1.0, 2.0, 3.0]);
        let (tx, rx) = conduit("out");
        let mut stage = MapStage::new(filters::affine(2.0, 1.0), input, tx);

        let runner = thread::spawn(move || stage.run(&StageContext::detached()));
        let out: Vec<Value> = rx.iter().collect();
        let summary = runner.join().unwrap().unwrap();

        assert_eq!(out, vec![3.0, 5.0, 7.0]);
        assert_eq!(summary.received, 3);
        assert_eq!(summary.emitted, 3);
    }

    #[test]
    fn test_identity_preserves_stream() {
        let input = feed(vec![-1.0, 0.0, 4.5]);
        let (tx, rx) = conduit("out");
        let mut stage = MapStage::identity(input, tx);
        assert_eq!(stage.name(), "map[identity]");

        let runner = thread::spawn(move || stage.run(&StageContext::detached()));
        let out: Vec<Value> = rx.iter().collect();
        runner.join().unwrap().unwrap();
        assert_eq!(out, vec![-1.0, 0.0, 4.5]);
    }

    #[test]
    fn test_map_stops_when_consumer_leaves() {
        let (mut in_tx, in_rx) = conduit("in");
        let (out_tx, out_rx) = conduit::<Value>("out");
        drop(out_rx);

        let mut stage = MapStage::identity(in_rx, out_tx);
        let runner = thread::spawn(move || stage.run(&StageContext::detached()));

        in_tx.send(1.0).unwrap();
        let summary = runner.join().unwrap().unwrap();
        assert_eq!(summary.received, 1);
        assert_eq!(summary.emitted, 0);
        // The map released its input, so the producer sees it too.
        assert!(matches!(
            in_tx.send(2.0),
            Err(PipelineError::Disconnected(_))
        ));
        in_tx.close().unwrap();
    }

    #[test]
    fn test_panicking_transform_closes_output() {
        let input = feed(vec![1.0, 2.0]);
        let (tx, rx) = conduit::<Value>("out");
        let boom = Transform::new("boom", |x| {
            if x > 1.5 {
                panic!("cannot map {}", x);
            }
            x
        });
        let mut stage = MapStage::new(boom, input, tx);

        let runner = thread::spawn(move || stage.run(&StageContext::detached()));
        let out: Vec<Value> = rx.iter().collect();
        assert!(runner.join().is_err());
        assert_eq!(out, vec![1.0]);
    }

    #[test]
    fn test_tap_signals_original_values() {
        let input = feed(vec![-1.0, 2.0, 5.0]);
        let (out_tx, out_rx) = conduit("out");
        let (sig_tx, sig_rx) = conduit("signal");
        let mut stage = TapStage::new(
            filters::scale(10.0),
            filters::step(1.0),
            input,
            out_tx,
            sig_tx,
        );

        let runner = thread::spawn(move || stage.run(&StageContext::detached()));
        let mut out = Vec::new();
        let mut sig = Vec::new();
        // Tap sends to output before signal for each value.
        while let Some(x) = out_rx.recv() {
            out.push(x);
            if x > 10.0 {
                sig.push(sig_rx.recv().unwrap());
            }
        }
        assert_eq!(sig_rx.recv(), None);
        let summary = runner.join().unwrap().unwrap();

        assert_eq!(out, vec![-10.0, 20.0, 50.0]);
        assert_eq!(sig, vec![2.0, 5.0]);
        assert_eq!(summary.emitted, 5);
    }

    #[test]
    fn test_tap_rejects_invalid_predicate() {
        let input = feed(vec![0.5]);
        let (out_tx, out_rx) = conduit("out");
        let (sig_tx, _sig_rx) = conduit::<Value>("signal");
        let mut stage = TapStage::new(
            Transform::identity(),
            Transform::new("half", |x| x),
            input,
            out_tx,
            sig_tx,
        );

        let runner = thread::spawn(move || stage.run(&StageContext::detached()));
        assert_eq!(out_rx.recv(), Some(0.5));
        let err = runner.join().unwrap().unwrap_err();
        assert!(err.is_structural());
        assert!(err.to_string().contains("returned 0.5"));
    }

    #[test]
    fn test_tap_failure_releases_consumers() {
        let (out_tx, out_rx) = conduit("out");
        let (sig_tx, sig_rx) = conduit::<Value>("signal");
        let mut stage = TapStage::new(
            Transform::identity(),
            Transform::new("half", |x| x),
            feed(vec![0.5]),
            out_tx,
            sig_tx,
        );
        let reader = thread::spawn(move || out_rx.iter().collect::<Vec<_>>());

        // Runs on this thread, so the stage value outlives the failure.
        assert!(stage.run(&StageContext::detached()).is_err());
        assert!(stage.output.is_closed() && stage.signal.is_closed());
        assert_eq!(reader.join().unwrap(), vec![0.5]);
        assert_eq!(
            sig_rx.recv_timeout(Duration::from_millis(100)),
            Err(RecvTimeoutError::Disconnected)
        );
    }

    #[test]
    fn test_tap_stops_when_both_consumers_leave() {
        let (in_tx, in_rx) = conduit("in");
        let (out_tx, out_rx) = conduit::<Value>("out");
        let (sig_tx, sig_rx) = conduit::<Value>("signal");
        drop(out_rx);
        drop(sig_rx);

        let mut stage = TapStage::new(
            Transform::identity(),
            filters::always(),
            in_rx,
            out_tx,
            sig_tx,
        );
        let runner = thread::spawn(move || stage.run(&StageContext::detached()));

        in_tx.send(1.0).unwrap();
        let summary = runner.join().unwrap().unwrap();
        assert_eq!(summary.received, 1);
        assert_eq!(summary.emitted, 0);
        // Stopped without waiting for the input to close.
        assert!(matches!(
            in_tx.send(2.0),
            Err(PipelineError::Disconnected(_))
        ));
    }
}
