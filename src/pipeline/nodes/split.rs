//! Partition (Split): predicate-routed fan-out.
//!
//! Each value is tested against every route's predicate in the order the
//! routes were given, and sent to each route whose predicate returns 1.
//! Routes may overlap, and a value that matches nothing is dropped. Callers
//! that want a strict split must pass complementary predicates (see
//! [`filters::complement`](crate::pipeline::filters::complement)).
//!
//! A predicate result other than 0 or 1 is a transform failure and ends the
//! stage. When the input closes, all destinations are closed.

use crate::pipeline::conduit::{ConduitReceiver, ConduitSender};
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::lifecycle::Lifecycle;
use crate::pipeline::port::{PortDescriptor, PortKind};
use crate::pipeline::stage::{close_output, deliver, Delivery, Stage, StageContext, StageSummary};
use crate::types::{PredicateOutcome, Transform, Value};

/// A predicate paired with the conduit that receives matching values.
#[derive(Debug)]
pub struct RoutedOutput {
    pub predicate: Transform,
    pub destination: ConduitSender<Value>,
}

impl RoutedOutput {
    pub fn new(predicate: Transform, destination: ConduitSender<Value>) -> Self {
        Self {
            predicate,
            destination,
        }
    }
}

pub struct SplitStage {
    name: String,
    input: ConduitReceiver<Value>,
    routes: Vec<RoutedOutput>,
}

impl SplitStage {
    pub fn new(input: ConduitReceiver<Value>, routes: Vec<RoutedOutput>) -> Self {
        Self {
            name: format!("split[{}]", input.name()),
            input,
            routes,
        }
    }
}

impl Stage for SplitStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn ports(&self) -> Vec<PortDescriptor> {
        let mut ports = vec![PortDescriptor::input(self.input.name(), PortKind::Value)];
        ports.extend(
            self.routes
                .iter()
                .map(|r| PortDescriptor::output(r.destination.name(), PortKind::Value)),
        );
        ports
    }

    fn run(&mut self, _ctx: &StageContext) -> PipelineResult<StageSummary> {
        let mut lifecycle = Lifecycle::new(&self.name);
        let mut summary = StageSummary::default();
        let mut open = vec![true; self.routes.len()];

        let outcome = route_all(
            &self.name,
            &self.input,
            &self.routes,
            &mut open,
            &mut summary,
        );

        // Release consumers even when a predicate failed.
        let reason = match &outcome {
            Ok(reason) => *reason,
            Err(_) => "predicate failed",
        };
        lifecycle.begin_drain(reason)?;
        for route in &mut self.routes {
            close_output(&mut route.destination)?;
        }
        lifecycle.finish()?;

        outcome.map(|_| summary)
    }
}

fn route_all(
    stage: &str,
    input: &ConduitReceiver<Value>,
    routes: &[RoutedOutput],
    open: &mut [bool],
    summary: &mut StageSummary,
) -> PipelineResult<&'static str> {
    while let Some(x) = input.recv() {
        summary.received += 1;
        let mut matched = false;

        for (route, is_open) in routes.iter().zip(open.iter_mut()) {
            match route.predicate.test(x) {
                PredicateOutcome::Reject => {}
                PredicateOutcome::Pass => {
                    matched = true;
                    if !*is_open {
                        continue;
                    }
                    match deliver(&route.destination, x)? {
                        Delivery::Delivered => summary.emitted += 1,
                        Delivery::Gone => *is_open = false,
                    }
                }
                PredicateOutcome::Invalid(r) => {
                    return Err(PipelineError::transform(
                        stage,
                        format!(
                            "predicate '{}' returned {} for {}",
                            route.predicate.name(),
                            r,
                            x
                        ),
                    ));
                }
            }
        }

        if !matched {
            tracing::trace!("Stage '{}': no route for {}", stage, x);
            summary.dropped += 1;
        }
        if !routes.is_empty() && open.iter().all(|o| !o) {
            return Ok("all outputs dropped");
        }
    }
    Ok("input closed")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::conduit::conduit;
    use crate::pipeline::filters;
    use std::thread;

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

    fn collect(rx: ConduitReceiver<Value>) -> thread::JoinHandle<Vec<Value>> {
        thread::spawn(move || rx.iter().collect())
    }

    #[test]
    fn test_sign_partition() {
        let positive = filters::if_positive();
        let (pos_tx, pos_rx) = conduit("pos");
        let (neg_tx, neg_rx) = conduit("neg");
        let mut stage = SplitStage::new(
            feed(vec![-2.0, 3.0, 0.0, -5.0, 7.0]),
            vec![
                RoutedOutput::new(positive.clone(), pos_tx),
                RoutedOutput::new(filters::complement(&positive), neg_tx),
            ],
        );

        let pos = collect(pos_rx);
        let neg = collect(neg_rx);
        let summary = stage.run(&StageContext::detached()).unwrap();

        assert_eq!(pos.join().unwrap(), vec![3.0, 7.0]);
        assert_eq!(neg.join().unwrap(), vec![-2.0, 0.0, -5.0]);
        assert_eq!(summary.received, 5);
        assert_eq!(summary.emitted, 5);
        assert_eq!(summary.dropped, 0);
    }

    #[test]
    fn test_overlapping_routes_duplicate() {
        let (a_tx, a_rx) = conduit("a");
        let (b_tx, b_rx) = conduit("b");
        let mut stage = SplitStage::new(
            feed(vec![1.0, 5.0]),
            vec![
                RoutedOutput::new(filters::always(), a_tx),
                RoutedOutput::new(filters::step(3.0), b_tx),
            ],
        );

        let a = collect(a_rx);
        let b = collect(b_rx);
        stage.run(&StageContext::detached()).unwrap();
        assert_eq!(a.join().unwrap(), vec![1.0, 5.0]);
        assert_eq!(b.join().unwrap(), vec![5.0]);
    }

    #[test]
    fn test_unmatched_values_are_dropped() {
        let (tx, rx) = conduit("band");
        let mut stage = SplitStage::new(
            feed(vec![-1.0, 0.5, 9.0]),
            vec![RoutedOutput::new(filters::band(0.0, 1.0), tx)],
        );
        let out = collect(rx);
        let summary = stage.run(&StageContext::detached()).unwrap();

        assert_eq!(out.join().unwrap(), vec![0.5]);
        assert_eq!(summary.dropped, 2);
    }

    #[test]
    fn test_invalid_predicate_fails_and_closes_outputs() {
        let (tx, rx) = conduit::<Value>("out");
        let mut stage = SplitStage::new(
            feed(vec![1.0]),
            vec![RoutedOutput::new(Transform::new("twice", |x| 2.0 * x), tx)],
        );
        let out = collect(rx);
        let err = stage.run(&StageContext::detached()).unwrap_err();

        assert!(matches!(err, PipelineError::TransformFailure { .. }));
        assert!(out.join().unwrap().is_empty());
    }
}
