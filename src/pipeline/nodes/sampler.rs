//! Periodic sampler: run a query on a steady timer and emit its result.
//!
//! The first query runs one period after start, not immediately. Each tick's
//! query and send complete before the next tick is handled, so a slow query
//! or a slow receiver lowers the effective rate; missed ticks are not
//! replayed. The sampler runs until cancelled or until its receiver goes
//! away.

use crate::pipeline::conduit::ConduitSender;
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::lifecycle::Lifecycle;
use crate::pipeline::port::{PortDescriptor, PortKind};
use crate::pipeline::stage::{close_output, Stage, StageContext, StageSummary};
use crossbeam_channel::{select, tick};
use std::time::Duration;

pub struct PeriodicQuery<T, Q> {
    name: String,
    period: Duration,
    query: Q,
    output: ConduitSender<T>,
}

impl<T, Q> PeriodicQuery<T, Q>
where
    T: Send,
    Q: FnMut() -> T + Send,
{
    pub fn new(period: Duration, query: Q, output: ConduitSender<T>) -> PipelineResult<Self> {
        if period.is_zero() {
            return Err(PipelineError::Config(format!(
                "sampler for '{}' needs a non-zero period",
                output.name()
            )));
        }
        Ok(Self {
            name: format!("sampler[{}]", output.name()),
            period,
            query,
            output,
        })
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

impl<T, Q> Stage for PeriodicQuery<T, Q>
where
    T: Send,
    Q: FnMut() -> T + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn ports(&self) -> Vec<PortDescriptor> {
        vec![PortDescriptor::output(self.output.name(), PortKind::Text)]
    }

    fn run(&mut self, ctx: &StageContext) -> PipelineResult<StageSummary> {
        let mut lifecycle = Lifecycle::new(&self.name);
        let mut summary = StageSummary::default();
        let ticker = tick(self.period);
        tracing::debug!("Stage '{}' sampling every {:?}", self.name, self.period);

        let reason = loop {
            select! {
                recv(ticker) -> _ => {
                    let report = (self.query)();
                    match self.output.send_or_cancel(report, &ctx.cancel) {
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
                }
                recv(ctx.cancel.receiver()) -> _ => break "cancelled",
            }
        };

        lifecycle.begin_drain(reason)?;
        close_output(&mut self.output)?;
        lifecycle.finish()?;
        Ok(summary)
    }
}
