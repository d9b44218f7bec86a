//! Built-in pipeline stages.

pub mod map;
pub mod reduce;
pub mod sampler;
pub mod sink;
pub mod source;
pub mod split;
pub mod tee;
pub mod text_source;
pub mod zip;

pub use map::{MapStage, TapStage};
pub use reduce::ReduceStage;
pub use sampler::PeriodicQuery;
pub use sink::{DrainStage, PrintStage, TextPrintStage};
pub use source::SourceStage;
pub use split::{RoutedOutput, SplitStage};
pub use tee::TeeStage;
pub use text_source::{parse_value, TextSource};
pub use zip::ZipStage;
