//! Per-mode settings for a dataflow-rs run.
//!
//! # Main Types
//!
//! - [`StatsSettings`] - Streaming statistics over a numeric text input
//! - [`GenerateSettings`] - Draws from a random distribution
//! - [`WalkSettings`] - Random walk split into positive and negative streams
//! - [`LogSettings`] - Log filter and optional log file

use crate::estimation::EstimatorKind;
use crate::generators::{Distribution, SeedPolicy};
use crate::pipeline::{EmitPolicy, FormatTemplate};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Which pipeline the binary builds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    #[default]
    Stats,
    Generate,
    Walk,
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunMode::Stats => write!(f, "stats"),
            RunMode::Generate => write!(f, "generate"),
            RunMode::Walk => write!(f, "walk"),
        }
    }
}

/// Streaming statistics over numbers read one per line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsSettings {
    /// Input file; stdin when absent
    pub input: Option<PathBuf>,

    pub estimator: EstimatorKind,

    /// When the estimate is written
    pub emit: EmitPolicy,

    /// Period of snapshot reports in milliseconds; no sampler when absent
    pub report_period_ms: Option<u64>,

    /// Write only every n-th report
    pub print_every: u64,
}

impl Default for StatsSettings {
    fn default() -> Self {
        Self {
            input: None,
            estimator: EstimatorKind::default(),
            emit: EmitPolicy::EveryValue,
            report_period_ms: None,
            print_every: 1,
        }
    }
}

impl StatsSettings {
    pub fn report_period(&self) -> Option<Duration> {
        self.report_period_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateSettings {
    pub distribution: Distribution,

    /// Number of values to write
    pub count: u64,

    pub seed: SeedPolicy,

    pub format: FormatTemplate,
}

impl Default for GenerateSettings {
    fn default() -> Self {
        Self {
            distribution: Distribution::default(),
            count: 10,
            seed: SeedPolicy::Fixed(0),
            format: FormatTemplate::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkSettings {
    /// Drift added every step
    pub mean: f64,

    /// Scale of the Gaussian step
    pub variance: f64,

    /// Sleep before each step in milliseconds
    pub delay_ms: u64,

    /// Number of steps before the run stops
    pub steps: u64,

    pub seed: SeedPolicy,

    pub positive_format: FormatTemplate,

    pub negative_format: FormatTemplate,
}

impl Default for WalkSettings {
    fn default() -> Self {
        Self {
            mean: 0.0,
            variance: 1.0,
            delay_ms: DEFAULT_WALK_DELAY_MS,
            steps: 50,
            seed: SeedPolicy::default(),
            positive_format: template_or_default("pos: {:.6}\n"),
            negative_format: template_or_default("neg: {:.6}\n"),
        }
    }
}

impl WalkSettings {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Default walk throttle, about 42ms per step.
pub const DEFAULT_WALK_DELAY_MS: u64 = 42;

fn template_or_default(template: &str) -> FormatTemplate {
    FormatTemplate::parse(template).unwrap_or_default()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// `EnvFilter` directives used when `RUST_LOG` is unset
    pub filter: Option<String>,

    /// Also write logs to this file
    pub file: Option<PathBuf>,
}
