//! Pipeline module.
//!
//! Orchestrates loading, quality checks, cleaning, analysis and charts, and
//! reports progress per stage.

mod builder;
pub mod progress;

pub use builder::{Pipeline, PipelineBuilder};
pub use progress::{ClosureProgressReporter, PipelineStage, ProgressReporter, ProgressUpdate};
