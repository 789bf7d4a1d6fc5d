use crate::domain::model::{
    BacklogItem, BugStats, BurndownPoint, MetricsSettings, Sprint, SprintMetrics, SprintSnapshot,
    TeamMember,
};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Source of "now" for elapsed/remaining-day calculations.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Read-only view of the Scrum backend REST API.
#[async_trait]
pub trait ScrumBackend: Send + Sync {
    async fn fetch_sprint(&self, sprint_id: &str) -> Result<Sprint>;
    async fn fetch_sprint_items(&self, sprint_id: &str) -> Result<Vec<BacklogItem>>;
    async fn fetch_team_members(&self) -> Result<Vec<TeamMember>>;
    /// Daily snapshots recorded by the backend; empty when it keeps none.
    async fn fetch_burndown(&self, sprint_id: &str) -> Result<Vec<BurndownPoint>>;
    async fn fetch_bug_stats(&self, sprint_id: &str) -> Result<Option<BugStats>>;
}

pub trait Storage: Send + Sync {
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    /// 實際寫入位置，用於回報輸出路徑
    fn resolve(&self, path: &str) -> String;
}

pub trait ConfigProvider: Send + Sync {
    fn output_path(&self) -> &str;
    fn output_formats(&self) -> &[String];
    /// ZIP 檔名；`None` 表示不壓縮，各檔案分開寫入
    fn bundle_filename(&self) -> Option<&str>;
    fn metrics_settings(&self) -> MetricsSettings;
    fn cache_enabled(&self) -> bool;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<SprintSnapshot>;
    async fn transform(&self, snapshot: SprintSnapshot) -> Result<SprintMetrics>;
    async fn load(&self, metrics: &SprintMetrics) -> Result<String>;
}
