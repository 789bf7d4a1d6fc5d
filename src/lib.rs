pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliArgs;

pub use adapters::{LocalStorage, RestBackend};
pub use app::pipelines::SprintMetricsPipeline;
pub use config::MetricsConfig;
pub use core::{
    aggregator::SprintMetricsAggregator,
    clock::{FixedClock, SystemClock},
    engine::{MetricsEngine, RunOutcome},
};
pub use domain::model::{
    BacklogItem, BurndownPoint, ItemStatus, ItemType, MetricsSettings, Sprint, SprintMetrics,
    SprintSnapshot, TeamMemberWorkload,
};
pub use utils::error::{MetricsError, Result};
