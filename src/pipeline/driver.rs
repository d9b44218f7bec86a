//! Estimator driver: the pipeline's main selection loop.
//!
//! The driver owns the estimator. It waits on the data conduit and, when
//! present, a report conduit fed by a periodic sampler, and handles whichever
//! is ready first. Data is observed into the estimator. Reports are forwarded
//! to the text output, either verbatim or, for [`Report::Snapshot`], as the
//! estimator's current rendering, so the estimator never leaves this task.
//!
//! The loop ends when the data conduit closes. The sampler never closes its
//! output, so a closed report conduit means the wiring is broken.

use crate::estimation::Estimator;
use crate::pipeline::conduit::{ConduitReceiver, ConduitSender};
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::lifecycle::Lifecycle;
use crate::pipeline::port::{PortDescriptor, PortKind};
use crate::pipeline::stage::{close_output, deliver, Delivery, Stage, StageContext, StageSummary};
use crate::types::Value;
use crossbeam_channel::select;
use serde::{Deserialize, Serialize};

/// A message on the report conduit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    /// Forward as is.
    Text(String),
    /// Forward the estimator's current rendering.
    Snapshot,
}

/// When the driver writes the estimator's rendering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmitPolicy {
    /// After every observed value.
    #[default]
    EveryValue,
    /// Only when a report asks for it, plus once when the data ends.
    OnReport,
}

pub struct EstimatorDriver<E> {
    name: String,
    estimator: E,
    policy: EmitPolicy,
    data: ConduitReceiver<Value>,
    reports: Option<ConduitReceiver<Report>>,
    output: ConduitSender<String>,
}

enum Step {
    Continue,
    Stop(&'static str),
}

enum Event {
    Value(Value),
    Report(Report),
    DataClosed,
    ReportsClosed,
}

impl<E: Estimator> EstimatorDriver<E> {
    pub fn new(
        estimator: E,
        policy: EmitPolicy,
        data: ConduitReceiver<Value>,
        output: ConduitSender<String>,
    ) -> Self {
        Self {
            name: format!("driver[{}]", data.name()),
            estimator,
            policy,
            data,
            reports: None,
            output,
        }
    }

    /// Also serve reports arriving on `reports`.
    pub fn with_reports(mut self, reports: ConduitReceiver<Report>) -> Self {
        self.reports = Some(reports);
        self
    }

    pub fn estimator(&self) -> &E {
        &self.estimator
    }

    pub fn into_estimator(self) -> E {
        self.estimator
    }

    fn on_value(&mut self, x: Value, summary: &mut StageSummary) -> PipelineResult<Step> {
        summary.received += 1;
        self.estimator.observe(x);
        match self.policy {
            EmitPolicy::EveryValue => self.emit(self.estimator.render(), summary),
            EmitPolicy::OnReport => Ok(Step::Continue),
        }
    }

    fn on_report(&mut self, report: Report, summary: &mut StageSummary) -> PipelineResult<Step> {
        let text = match report {
            Report::Text(text) => text,
            Report::Snapshot => self.estimator.render(),
        };
        self.emit(text, summary)
    }

    fn emit(&self, text: String, summary: &mut StageSummary) -> PipelineResult<Step> {
        match deliver(&self.output, text)? {
            Delivery::Delivered => {
                summary.emitted += 1;
                Ok(Step::Continue)
            }
            Delivery::Gone => Ok(Step::Stop("output dropped")),
        }
    }

    fn select_next(&mut self, summary: &mut StageSummary) -> PipelineResult<Step> {
        let event = match &self.reports {
            None => self.data.recv().map_or(Event::DataClosed, Event::Value),
            Some(reports) => select! {
                recv(self.data.inner()) -> msg => msg.map_or(Event::DataClosed, Event::Value),
                recv(reports.inner()) -> msg => msg.map_or(Event::ReportsClosed, Event::Report),
            },
        };

        match event {
            Event::Value(x) => self.on_value(x, summary),
            Event::Report(report) => self.on_report(report, summary),
            Event::DataClosed => Ok(Step::Stop("data closed")),
            Event::ReportsClosed => {
                let conduit = self.reports.as_ref().map(|r| r.name()).unwrap_or_default();
                let err = PipelineError::ProtocolViolation(format!(
                    "report conduit '{}' closed under a running driver",
                    conduit
                ));
                tracing::error!("Stage '{}': {}", self.name, err);
                Err(err)
            }
        }
    }
}

impl<E: Estimator> Stage for EstimatorDriver<E> {
    fn name(&self) -> &str {
        &self.name
    }

    fn ports(&self) -> Vec<PortDescriptor> {
        let mut ports = vec![PortDescriptor::input(self.data.name(), PortKind::Value)];
        if let Some(reports) = &self.reports {
            ports.push(PortDescriptor::input(reports.name(), PortKind::Text));
        }
        ports.push(PortDescriptor::output(self.output.name(), PortKind::Text));
        ports
    }

    fn run(&mut self, _ctx: &StageContext) -> PipelineResult<StageSummary> {
        let mut lifecycle = Lifecycle::new(&self.name);
        let mut summary = StageSummary::default();

        let reason = loop {
            if let Step::Stop(reason) = self.select_next(&mut summary)? {
                break reason;
            }
        };

        if reason == "data closed" && self.policy == EmitPolicy::OnReport {
            self.emit(self.estimator.render(), &mut summary)?;
        }

        lifecycle.begin_drain(reason)?;
        // Lets the sampler see its consumer leave.
        self.reports = None;
        close_output(&mut self.output)?;
        lifecycle.finish()?;
        Ok(summary)
    }
}
