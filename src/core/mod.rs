pub mod aggregator;
pub mod burndown;
pub mod cache;
pub mod clock;
pub mod engine;
pub mod report;
pub mod workload;

pub use crate::domain::model::{
    BacklogItem, BurndownPoint, MetricsSettings, Sprint, SprintMetrics, SprintSnapshot,
    TeamMemberWorkload,
};
pub use crate::domain::ports::{Clock, ConfigProvider, Pipeline, ScrumBackend, Storage};
pub use crate::utils::error::Result;
