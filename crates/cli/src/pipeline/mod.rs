//! Pipeline orchestration module.

mod orchestrator;
mod stats;

pub use orchestrator::{AgentPipeline, StorePipeline};
pub use stats::PipelineStats;
