//! Run modes of the dataflow-rs binary.
//!
//! Each mode wires a pipeline from a [`RunConfig`], runs it to completion and
//! hands back the supervisor's report. Readers and writers are parameters so
//! the same wiring serves stdin/stdout and tests.
//!
//! ```text
//! stats:     [TextSource] ──► [EstimatorDriver] ──► [TextPrint]
//!                                   ▲
//!            [PeriodicQuery] ───────┘   (optional snapshot reports)
//!
//! generate:  [Source] ──► (count) ──► [Print]
//!
//! walk:      [Source] ──► (steps) ──► [Split] ──► [Print pos]
//!                                            └──► [Print neg]
//! ```

use crate::config::{GenerateSettings, RunConfig, RunMode, StatsSettings, WalkSettings};
use crate::error::{DataflowError, Result, ResultExt};
use crate::generators::{RandomValues, RandomWalk};
use crate::pipeline::{
    conduit, filters, ConduitReceiver, ConduitSender, EstimatorDriver, PeriodicQuery, Pipeline,
    PipelineError, PipelineReport, PrintStage, Report, RoutedOutput, SourceStage, SplitStage,
    TextPrintStage, TextSource,
};
use crate::types::Value;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};

/// Run the configured mode against stdin/stdout.
pub fn run(config: &RunConfig) -> Result<PipelineReport> {
    config.validate()?;
    tracing::info!("Running mode '{}'", config.mode);

    match config.mode {
        RunMode::Stats => {
            let input: Box<dyn BufRead + Send> = match &config.stats.input {
                Some(path) => {
                    let file = File::open(path).map_err(|e| {
                        DataflowError::from(e)
                            .with_context(format!("Failed to open {}", path.display()))
                    })?;
                    Box::new(BufReader::new(file))
                }
                None => Box::new(BufReader::new(io::stdin())),
            };
            run_stats(&config.stats, input, io::stdout())
        }
        RunMode::Generate => run_generate(&config.generate, io::stdout()),
        RunMode::Walk => run_walk(&config.walk, io::stdout(), io::stdout()),
    }
}

/// Streaming statistics over numbers read one per line.
pub fn run_stats<R, W>(settings: &StatsSettings, input: R, output: W) -> Result<PipelineReport>
where
    R: BufRead + Send + 'static,
    W: Write + Send + 'static,
{
    let (values_tx, values_rx) = conduit("values");
    let (text_tx, text_rx) = conduit("estimates");

    let mut pipeline = Pipeline::new();
    let source_id = pipeline.spawn(TextSource::new("input", input, values_tx))?;

    let mut driver = EstimatorDriver::new(
        settings.estimator.build(),
        settings.emit,
        values_rx,
        text_tx,
    );
    if let Some(period) = settings.report_period() {
        let (report_tx, report_rx) = conduit("reports");
        let sampler = PeriodicQuery::new(period, || Report::Snapshot, report_tx)
            .context("stats.report_period_ms")?;
        pipeline.spawn(sampler)?;
        driver = driver.with_reports(report_rx);
    }
    let driver_id = pipeline.spawn(driver)?;

    let printer = TextPrintStage::new(output, text_rx)
        .with_interval(settings.print_every)
        .context("stats.print_every")?;
    pipeline.spawn(printer)?;

    // The sampler never runs dry; stop it once the data is through.
    let driver_outcome = pipeline.wait(driver_id);
    if driver_outcome.as_ref().is_some_and(|o| o.result.is_err()) {
        // The reader may be blocked on input that never ends (stdin); it
        // stops on its own at the next line, so do not wait for it.
        pipeline.detach(source_id);
    }
    let mut report = pipeline.shutdown();
    report.outcomes.extend(driver_outcome);
    Ok(report)
}

/// Write `count` draws from the configured distribution.
pub fn run_generate<W>(settings: &GenerateSettings, output: W) -> Result<PipelineReport>
where
    W: Write + Send + 'static,
{
    let draws = RandomValues::new(settings.distribution, settings.seed.resolve())
        .context("generate.distribution")?;
    tracing::info!("Generating {} values", settings.count);

    let (raw_tx, raw_rx) = conduit("draws");
    let (out_tx, out_rx) = conduit("output");

    let mut pipeline = Pipeline::new();
    pipeline.spawn(SourceStage::new("draws", draws.into_generator(), raw_tx))?;
    pipeline.spawn(PrintStage::new(settings.format.clone(), output, out_rx))?;

    forward_bounded(raw_rx, out_tx, settings.count)?;
    Ok(pipeline.shutdown())
}

/// Random walk split into positive and non-positive streams.
pub fn run_walk<P, N>(settings: &WalkSettings, positive: P, negative: N) -> Result<PipelineReport>
where
    P: Write + Send + 'static,
    N: Write + Send + 'static,
{
    let walk = RandomWalk::new(settings.mean, settings.variance, settings.seed.resolve())
        .with_delay(settings.delay());
    tracing::info!("Walking {} steps, delay {:?}", settings.steps, settings.delay());

    let (raw_tx, raw_rx) = conduit("walk");
    let (steps_tx, steps_rx) = conduit("steps");
    let (pos_tx, pos_rx) = conduit("positive");
    let (neg_tx, neg_rx) = conduit("negative");

    let is_positive = filters::if_positive();
    let routes = vec![
        RoutedOutput::new(is_positive.clone(), pos_tx),
        RoutedOutput::new(filters::complement(&is_positive), neg_tx),
    ];

    let mut pipeline = Pipeline::new();
    pipeline.spawn(SourceStage::new("walk", walk.into_generator(), raw_tx))?;
    pipeline.spawn(SplitStage::new(steps_rx, routes))?;
    pipeline.spawn(PrintStage::new(
        settings.positive_format.clone(),
        positive,
        pos_rx,
    ))?;
    pipeline.spawn(PrintStage::new(
        settings.negative_format.clone(),
        negative,
        neg_rx,
    ))?;

    forward_bounded(raw_rx, steps_tx, settings.steps)?;
    Ok(pipeline.shutdown())
}

/// Pass at most `limit` values from an unbounded stream, then close the
/// downstream conduit and release the upstream one.
fn forward_bounded(
    upstream: ConduitReceiver<Value>,
    mut downstream: ConduitSender<Value>,
    limit: u64,
) -> Result<u64> {
    let mut passed = 0;
    while passed < limit {
        let Some(x) = upstream.recv() else {
            break;
        };
        match downstream.send(x) {
            Ok(()) => passed += 1,
            Err(PipelineError::Disconnected(name)) => {
                tracing::warn!("Consumer of '{}' left after {} values", name, passed);
                break;
            }
            Err(e) => return Err(e.into()),
        }
    }
    downstream.close()?;
    drop(upstream);
    Ok(passed)
}
