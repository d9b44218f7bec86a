//! # dataflow-rs: streaming numeric pipelines
//!
//! A small runtime for composing streaming pipelines out of independent
//! stages connected by blocking rendezvous conduits. Producers emit scalar
//! values; stages map, broadcast, partition, join or reduce them; sinks
//! print them or feed them into a single-owner estimator.
//!
//! ## Architecture
//!
//! - **Conduits**: zero-capacity crossbeam channels; a send waits for the
//!   matching receive, which is the only backpressure in the system
//! - **Stages**: one OS thread each, running a blocking loop over their
//!   conduits with an explicit `Running → Draining → Closed` lifecycle
//! - **Supervisor**: spawns stages, cancels unbounded ones and collects
//!   every task's outcome
//! - **Estimators**: owned by exactly one driver task
//!
//! ## Configuration
//!
//! Runs are described by a [`RunConfig`] loaded from JSON or TOML. Without
//! an explicit path it is looked up in the per-user config directory under
//! `dataflow-rs`.
//!
//! ## Example
//!
//! ```ignore
//! use dataflow_rs::pipeline::{conduit, filters, MapStage, Pipeline, SourceStage};
//!
//! let (raw_tx, raw_rx) = conduit("raw");
//! let (out_tx, out_rx) = conduit("scaled");
//!
//! let mut pipeline = Pipeline::new();
//! pipeline.spawn(SourceStage::new("ones", || 1.0, raw_tx))?;
//! pipeline.spawn(MapStage::new(filters::affine(2.0, 1.0), raw_rx, out_tx))?;
//!
//! assert_eq!(out_rx.recv(), Some(3.0));
//! drop(out_rx);
//! let report = pipeline.shutdown();
//! assert!(report.is_success());
//! ```

pub mod app;
pub mod config;
pub mod error;
pub mod estimation;
pub mod generators;
pub mod pipeline;
pub mod types;

// Re-export commonly used types
pub use config::{RunConfig, RunMode};
pub use error::{DataflowError, Result, ResultExt};
pub use estimation::{Estimator, EstimatorKind, Range, TwoMoments};
pub use pipeline::{Pipeline, PipelineError, PipelineReport, PipelineResult};
pub use types::{PredicateOutcome, Transform, Tuple, Value};
