//! Sink stages: Drain, Print and the text print server.
//!
//! Sinks are terminal: they consume until their input closes and close
//! nothing themselves. Print output is best effort. A failed write is logged
//! and counted, and consumption carries on so upstream stages never stall
//! on a broken sink.

use crate::pipeline::conduit::ConduitReceiver;
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::format::FormatTemplate;
use crate::pipeline::port::{PortDescriptor, PortKind};
use crate::pipeline::stage::{Stage, StageContext, StageSummary};
use crate::types::Value;
use std::io::Write;

/// Drain: discards everything, like writing to /dev/null.
pub struct DrainStage<T> {
    input: ConduitReceiver<T>,
}

impl<T> DrainStage<T> {
    pub fn new(input: ConduitReceiver<T>) -> Self {
        Self { input }
    }
}

impl<T: Send> Stage for DrainStage<T> {
    fn name(&self) -> &str {
        "drain"
    }

    fn ports(&self) -> Vec<PortDescriptor> {
        vec![PortDescriptor::input(self.input.name(), PortKind::Value)]
    }

    fn run(&mut self, _ctx: &StageContext) -> PipelineResult<StageSummary> {
        let mut summary = StageSummary::default();
        while self.input.recv().is_some() {
            summary.received += 1;
            summary.dropped += 1;
        }
        Ok(summary)
    }
}

/// Writes every `interval`-th item (items 0, k, 2k, ...) and counts the rest
/// as dropped. The counter is private to the owning stage.
struct SkipWriter<W> {
    writer: W,
    interval: u64,
    seen: u64,
    write_errors: u64,
}

impl<W: Write> SkipWriter<W> {
    fn new(writer: W) -> Self {
        Self {
            writer,
            interval: 1,
            seen: 0,
            write_errors: 0,
        }
    }

    fn set_interval(&mut self, interval: u64) -> PipelineResult<()> {
        if interval == 0 {
            return Err(PipelineError::Config(
                "print interval must be at least 1".to_string(),
            ));
        }
        self.interval = interval;
        Ok(())
    }

    /// Returns true when the bytes were written.
    fn offer(&mut self, stage: &str, bytes: &[u8], summary: &mut StageSummary) -> bool {
        let due = self.seen % self.interval == 0;
        self.seen += 1;
        if !due {
            summary.dropped += 1;
            return false;
        }
        match self.writer.write_all(bytes) {
            Ok(()) => {
                summary.emitted += 1;
                true
            }
            Err(e) => {
                self.write_errors += 1;
                summary.dropped += 1;
                let err = PipelineError::SinkWrite(e.to_string());
                tracing::warn!("Stage '{}': {}", stage, err);
                false
            }
        }
    }

    fn finish(&mut self, stage: &str) {
        if let Err(e) = self.writer.flush() {
            tracing::warn!("Stage '{}': flush failed: {}", stage, e);
        }
        if self.write_errors > 0 {
            tracing::warn!(
                "Stage '{}' lost {} writes to sink errors",
                stage,
                self.write_errors
            );
        }
    }
}

/// Print: renders each value with a template and writes it to a byte sink.
pub struct PrintStage<W> {
    name: String,
    template: FormatTemplate,
    input: ConduitReceiver<Value>,
    out: SkipWriter<W>,
}

impl<W: Write + Send> PrintStage<W> {
    pub fn new(template: FormatTemplate, writer: W, input: ConduitReceiver<Value>) -> Self {
        Self {
            name: format!("print[{}]", input.name()),
            template,
            input,
            out: SkipWriter::new(writer),
        }
    }

    /// Only write every `interval`-th rendered value. `interval` must be ≥ 1.
    pub fn with_interval(mut self, interval: u64) -> PipelineResult<Self> {
        self.out.set_interval(interval)?;
        Ok(self)
    }
}

impl<W: Write + Send> Stage for PrintStage<W> {
    fn name(&self) -> &str {
        &self.name
    }

    fn ports(&self) -> Vec<PortDescriptor> {
        vec![
            PortDescriptor::input(self.input.name(), PortKind::Value),
            PortDescriptor::output("writer", PortKind::External),
        ]
    }

    fn run(&mut self, _ctx: &StageContext) -> PipelineResult<StageSummary> {
        let mut summary = StageSummary::default();
        while let Some(x) = self.input.recv() {
            summary.received += 1;
            let rendered = self.template.render(x);
            self.out.offer(&self.name, rendered.as_bytes(), &mut summary);
        }
        self.out.finish(&self.name);
        Ok(summary)
    }
}

/// Print server for pre-rendered text (estimator reports and the like).
pub struct TextPrintStage<W> {
    name: String,
    input: ConduitReceiver<String>,
    out: SkipWriter<W>,
}

impl<W: Write + Send> TextPrintStage<W> {
    pub fn new(writer: W, input: ConduitReceiver<String>) -> Self {
        Self {
            name: format!("print[{}]", input.name()),
            input,
            out: SkipWriter::new(writer),
        }
    }

    /// Only write every `interval`-th string. `interval` must be ≥ 1.
    pub fn with_interval(mut self, interval: u64) -> PipelineResult<Self> {
        self.out.set_interval(interval)?;
        Ok(self)
    }
}

impl<W: Write + Send> Stage for TextPrintStage<W> {
    fn name(&self) -> &str {
        &self.name
    }

    fn ports(&self) -> Vec<PortDescriptor> {
        vec![
            PortDescriptor::input(self.input.name(), PortKind::Text),
            PortDescriptor::output("writer", PortKind::External),
        ]
    }

    fn run(&mut self, _ctx: &StageContext) -> PipelineResult<StageSummary> {
        let mut summary = StageSummary::default();
        while let Some(s) = self.input.recv() {
            summary.received += 1;
            self.out.offer(&self.name, s.as_bytes(), &mut summary);
        }
        self.out.finish(&self.name);
        Ok(summary)
    }
}
