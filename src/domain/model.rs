use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 預設燃盡圖最多天數
pub const DEFAULT_BURNDOWN_MAX_DAYS: usize = 14;
/// 預設已完成項目進度係數
pub const DEFAULT_COMPLETED_PROGRESS_FACTOR: f64 = 1.2;
/// 缺少或無法解析時的故事點數
pub const DEFAULT_STORY_POINTS: f64 = 1.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SprintStatus {
    #[default]
    Planned,
    Active,
    Completed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl ItemStatus {
    pub fn is_completed(self) -> bool {
        self == ItemStatus::Completed
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    #[default]
    Story,
    Task,
    Bug,
    Improvement,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sprint {
    pub id: Option<String>,
    pub name: String,
    pub goal: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub status: SprintStatus,
}

/// Reference to the member an item is assigned to. Every field is optional
/// because upstream payloads carry anything from a bare id to a full user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignee {
    pub id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    /// Structural hash of the raw assignee payload, used as the grouping key
    /// of last resort.
    #[serde(skip)]
    pub fingerprint: String,
}

impl Assignee {
    /// id, then lowercased email, then the structural fingerprint
    pub fn group_key(&self) -> String {
        self.id
            .clone()
            .or_else(|| self.email.as_deref().map(str::to_lowercase))
            .unwrap_or_else(|| format!("anon-{}", self.fingerprint))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacklogItem {
    pub id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub item_type: ItemType,
    pub status: ItemStatus,
    pub story_points: f64,
    pub assigned_to: Option<Assignee>,
    pub sprint_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    pub id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BurndownPoint {
    pub day: u32,
    pub planned: u64,
    pub actual: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BurndownSource {
    #[default]
    Synthetic,
    Backend,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMemberWorkload {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub role: String,
    pub planned_points: f64,
    pub completed_points: f64,
    pub items: Vec<BacklogItem>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BugStats {
    pub total: usize,
    pub open: usize,
    pub in_progress: usize,
    pub resolved: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemTypeCounts {
    pub story: usize,
    pub task: usize,
    pub bug: usize,
    pub improvement: usize,
}

impl ItemTypeCounts {
    pub fn record(&mut self, item_type: ItemType) {
        match item_type {
            ItemType::Story => self.story += 1,
            ItemType::Task => self.task += 1,
            ItemType::Bug => self.bug += 1,
            ItemType::Improvement => self.improvement += 1,
        }
    }
}

/// Display-ready metrics for one sprint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SprintMetrics {
    pub sprint_id: Option<String>,
    pub sprint_name: String,
    pub goal: Option<String>,
    pub status: SprintStatus,

    pub planned: usize,
    pub completed: usize,
    pub in_progress: usize,
    pub remaining: usize,
    pub completion_percentage: u32,

    pub total_story_points: f64,
    pub completed_story_points: f64,
    pub velocity: f64,

    pub total_days: u32,
    pub days_elapsed: u32,
    pub days_remaining: u32,
    pub is_overdue: bool,

    pub burndown_data: Vec<BurndownPoint>,
    pub burndown_source: BurndownSource,
    pub team_members: Vec<TeamMemberWorkload>,
    pub items_by_type: ItemTypeCounts,
    pub bug_stats: Option<BugStats>,
    pub generated_at: DateTime<Utc>,
}

/// Everything fetched from the backend for one sprint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SprintSnapshot {
    pub sprint: Sprint,
    pub items: Vec<BacklogItem>,
    pub team: Vec<TeamMember>,
    pub burndown: Vec<BurndownPoint>,
    pub bug_stats: Option<BugStats>,
}

/// Tunable heuristics of the metrics computation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricsSettings {
    pub burndown_max_days: usize,
    pub completed_progress_factor: f64,
    pub prefer_backend_burndown: bool,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            burndown_max_days: DEFAULT_BURNDOWN_MAX_DAYS,
            completed_progress_factor: DEFAULT_COMPLETED_PROGRESS_FACTOR,
            prefer_backend_burndown: true,
        }
    }
}
