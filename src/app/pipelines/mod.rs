pub mod sprint_pipeline;

pub use sprint_pipeline::SprintMetricsPipeline;
