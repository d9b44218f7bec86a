//! Stage-based streaming pipeline.
//!
//! Values flow through stages connected by conduits: Source → Map / Tee /
//! Split / Zip / Reduce → Sink, with an estimator driver as the usual
//! terminal consumer. Each stage runs on its own thread and blocks on its
//! conduits; nothing else coordinates them.
//!
//! # Architecture
//!
//! ```text
//! [TextSource] ──► [EstimatorDriver] ──► [TextPrint]
//!                          ▲
//! [PeriodicQuery] ─────────┘
//! ```
//!
//! # Design
//!
//! - **Rendezvous conduits**: zero-capacity crossbeam channels, so a slow
//!   consumer stalls its producer.
//! - **Explicit close**: the single producer closes a conduit exactly once;
//!   multi-port stages follow a `Running → Draining → Closed` lifecycle.
//! - **Cancellation tokens** for the stages that never run dry.
//! - **Single-owner state**: estimators and reducer state live in one task.

pub mod cancel;
pub mod conduit;
pub mod driver;
pub mod error;
pub mod executor;
pub mod filters;
pub mod format;
pub mod id;
pub mod lifecycle;
pub mod nodes;
pub mod port;
pub mod stage;

pub use cancel::{CancelHandle, CancelToken};
pub use conduit::{conduit, ConduitReceiver, ConduitSender};
pub use driver::{EmitPolicy, EstimatorDriver, Report};
pub use error::{PipelineError, PipelineResult};
pub use executor::{Pipeline, PipelineReport, TaskOutcome, TaskSnapshot};
pub use format::FormatTemplate;
pub use id::TaskId;
pub use lifecycle::{Lifecycle, StageState};
pub use nodes::{
    DrainStage, MapStage, PeriodicQuery, PrintStage, ReduceStage, RoutedOutput, SourceStage,
    SplitStage, TapStage, TeeStage, TextPrintStage, TextSource, ZipStage,
};
pub use port::{PortDescriptor, PortDirection, PortKind};
pub use stage::{Stage, StageContext, StageSummary};
