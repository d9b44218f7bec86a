//! Numeric text source: scans lines of text into values.
//!
//! Each line is trimmed and parsed as one float. Blank, unparsable and
//! non-UTF-8 lines are logged and skipped; they never reach the output. The output is closed
//! at end of input, or early when a read fails.

use crate::pipeline::conduit::ConduitSender;
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::lifecycle::Lifecycle;
use crate::pipeline::port::{PortDescriptor, PortKind};
use crate::pipeline::stage::{close_output, deliver, Delivery, Stage, StageContext, StageSummary};
use crate::types::Value;
use std::io::BufRead;

/// Parse one line of input into a value.
pub fn parse_value(line: &str) -> PipelineResult<Value> {
    let trimmed = line.trim();
    trimmed
        .parse::<Value>()
        .map_err(|e| PipelineError::MalformedInput {
            line: trimmed.to_string(),
            message: e.to_string(),
        })
}

/// Decode raw line bytes and parse them. Invalid UTF-8 is malformed input.
fn decode_line(bytes: &[u8]) -> PipelineResult<Value> {
    let line = std::str::from_utf8(bytes).map_err(|e| PipelineError::MalformedInput {
        line: String::from_utf8_lossy(bytes).trim().to_string(),
        message: e.to_string(),
    })?;
    parse_value(line)
}

pub struct TextSource<R> {
    name: String,
    reader: R,
    output: ConduitSender<Value>,
}

impl<R: BufRead + Send> TextSource<R> {
    pub fn new(name: impl Into<String>, reader: R, output: ConduitSender<Value>) -> Self {
        Self {
            name: format!("scan[{}]", name.into()),
            reader,
            output,
        }
    }
}

impl<R: BufRead + Send> Stage for TextSource<R> {
    fn name(&self) -> &str {
        &self.name
    }

    fn ports(&self) -> Vec<PortDescriptor> {
        vec![
            PortDescriptor::input("reader", PortKind::External),
            PortDescriptor::output(self.output.name(), PortKind::Value),
        ]
    }

    fn run(&mut self, _ctx: &StageContext) -> PipelineResult<StageSummary> {
        let mut lifecycle = Lifecycle::new(&self.name);
        let mut summary = StageSummary::default();
        let mut line = Vec::new();
        let mut line_no = 0u64;

        let outcome = loop {
            line.clear();
            match self.reader.read_until(b'\n', &mut line) {
                Ok(0) => break Ok("end of input"),
                Ok(_) => {}
                Err(e) => {
                    tracing::error!("Stage '{}': read failed: {}", self.name, e);
                    break Err(PipelineError::Io(e));
                }
            }
            line_no += 1;
            summary.received += 1;

            match decode_line(&line) {
                Ok(x) => match deliver(&self.output, x)? {
                    Delivery::Delivered => summary.emitted += 1,
                    Delivery::Gone => break Ok("output dropped"),
                },
                Err(e) => {
                    tracing::warn!("Stage '{}': skipping line {}: {}", self.name, line_no, e);
                    summary.dropped += 1;
                }
            }
        };

        let reason = match &outcome {
            Ok(reason) => *reason,
            Err(_) => "read failed",
        };
        lifecycle.begin_drain(reason)?;
        close_output(&mut self.output)?;
        lifecycle.finish()?;
        outcome.map(|_| summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::conduit::conduit;
    use std::io::{self, BufReader, Cursor, Read};
    use std::thread;

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("1.5").unwrap(), 1.5);
        assert_eq!(parse_value("  -2\n").unwrap(), -2.0);
        assert_eq!(parse_value("1e3").unwrap(), 1000.0);
        assert!(matches!(
            parse_value("abc"),
            Err(PipelineError::MalformedInput { .. })
        ));
        assert!(parse_value("").is_err());
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let (tx, rx) = conduit("values");
        let mut stage = TextSource::new("stdin", Cursor::new("1.0\nabc\n2.0\n"), tx);
        let runner = thread::spawn(move || stage.run(&StageContext::detached()));

        let out: Vec<Value> = rx.iter().collect();
        let summary = runner.join().unwrap().unwrap();
        assert_eq!(out, vec![1.0, 2.0]);
        assert_eq!(summary.received, 3);
        assert_eq!(summary.dropped, 1);
    }

    #[test]
    fn test_last_line_without_newline() {
        let (tx, rx) = conduit("values");
        let mut stage = TextSource::new("stdin", Cursor::new("3\n4"), tx);
        let runner = thread::spawn(move || stage.run(&StageContext::detached()));
        let out: Vec<Value> = rx.iter().collect();
        runner.join().unwrap().unwrap();
        assert_eq!(out, vec![3.0, 4.0]);
    }

    #[test]
    fn test_invalid_utf8_line_is_skipped() {
        let (tx, rx) = conduit("values");
        let input = Cursor::new(b"1.0\n\xff\xfe\n2.0\n".to_vec());
        let mut stage = TextSource::new("bytes", input, tx);
        let runner = thread::spawn(move || stage.run(&StageContext::detached()));

        let out: Vec<Value> = rx.iter().collect();
        let summary = runner.join().unwrap().unwrap();
        assert_eq!(out, vec![1.0, 2.0]);
        assert_eq!(summary.received, 3);
        assert_eq!(summary.dropped, 1);
    }

    #[test]
    fn test_decode_line_rejects_invalid_utf8() {
        assert!(matches!(
            decode_line(b"\xff1"),
            Err(PipelineError::MalformedInput { .. })
        ));
        assert_eq!(decode_line(b" 7\r\n").unwrap(), 7.0);
    }

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "device gone"))
        }
    }

    #[test]
    fn test_read_error_closes_output() {
        let (tx, rx) = conduit::<Value>("values");
        let mut stage = TextSource::new("dev", BufReader::new(FailingReader), tx);
        let runner = thread::spawn(move || stage.run(&StageContext::detached()));

        assert_eq!(rx.recv(), None);
        let err = runner.join().unwrap().unwrap_err();
        assert!(matches!(err, PipelineError::Io(_)));
    }
}
