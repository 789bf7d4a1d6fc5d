use crate::core::aggregator::SprintMetricsAggregator;
use crate::core::cache::{CacheKey, MetricsCache};
use crate::core::clock::SystemClock;
use crate::core::report::{bundle_zip, render_report};
use crate::domain::model::{SprintMetrics, SprintSnapshot};
use crate::domain::ports::{Clock, ConfigProvider, Pipeline, ScrumBackend, Storage};
use crate::utils::error::{MetricsError, Result};

/// Fetches one sprint from the backend, aggregates its metrics and writes
/// the report through `Storage`.
pub struct SprintMetricsPipeline<B: ScrumBackend, S: Storage, C: ConfigProvider> {
    backend: B,
    storage: S,
    config: C,
    sprint_id: String,
    clock: Box<dyn Clock>,
    aggregator: SprintMetricsAggregator,
    cache: Option<MetricsCache>,
}

impl<B: ScrumBackend, S: Storage, C: ConfigProvider> SprintMetricsPipeline<B, S, C> {
    pub fn new(backend: B, storage: S, config: C, sprint_id: impl Into<String>) -> Self {
        let aggregator = SprintMetricsAggregator::new(config.metrics_settings());
        let cache = config.cache_enabled().then(MetricsCache::default);
        Self {
            backend,
            storage,
            config,
            sprint_id: sprint_id.into(),
            clock: Box::new(SystemClock),
            aggregator,
            cache,
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_cache(mut self, cache: MetricsCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn sprint_id(&self) -> &str {
        &self.sprint_id
    }

    pub fn cache(&self) -> Option<&MetricsCache> {
        self.cache.as_ref()
    }
}

#[async_trait::async_trait]
impl<B: ScrumBackend, S: Storage, C: ConfigProvider> Pipeline for SprintMetricsPipeline<B, S, C> {
    async fn extract(&self) -> Result<SprintSnapshot> {
        let sprint_id = self.sprint_id.as_str();
        let wants_backend_burndown = self.aggregator.settings().prefer_backend_burndown;

        tracing::info!("📡 Fetching sprint {} from backend", sprint_id);

        // 五個端點同時請求
        let (sprint, items, team, burndown, bug_stats) = tokio::join!(
            self.backend.fetch_sprint(sprint_id),
            self.backend.fetch_sprint_items(sprint_id),
            self.backend.fetch_team_members(),
            async {
                if wants_backend_burndown {
                    self.backend.fetch_burndown(sprint_id).await
                } else {
                    Ok(Vec::new())
                }
            },
            self.backend.fetch_bug_stats(sprint_id),
        );

        let mut sprint = sprint?;
        if sprint.id.is_none() {
            sprint.id = Some(sprint_id.to_string());
        }

        // 只保留屬於此 sprint 的項目；沒有 sprint 參照的視為屬於此 sprint
        let fetched = items?;
        let fetched_count = fetched.len();
        let items: Vec<_> = fetched
            .into_iter()
            .filter(|item| {
                item.sprint_id
                    .as_deref()
                    .map_or(true, |reference| reference == sprint_id)
            })
            .collect();
        if items.len() < fetched_count {
            tracing::debug!(
                "Dropped {} backlog items that belong to other sprints",
                fetched_count - items.len()
            );
        }

        let team = team.unwrap_or_else(|e| {
            tracing::warn!("⚠️ Team members unavailable, continuing without roster: {}", e);
            Vec::new()
        });
        let burndown = burndown.unwrap_or_else(|e| {
            tracing::warn!("⚠️ Backend burndown unavailable, using synthetic series: {}", e);
            Vec::new()
        });
        let bug_stats = bug_stats.unwrap_or_else(|e| {
            tracing::warn!("⚠️ Bug statistics unavailable, deriving from backlog: {}", e);
            None
        });

        Ok(SprintSnapshot {
            sprint,
            items,
            team,
            burndown,
            bug_stats,
        })
    }

    async fn transform(&self, snapshot: SprintSnapshot) -> Result<SprintMetrics> {
        let now = self.clock.now();

        let metrics = match &self.cache {
            Some(cache) => cache.get_or_compute(CacheKey::for_snapshot(&snapshot, now), || {
                self.aggregator.compute_snapshot(&snapshot, now)
            }),
            None => self.aggregator.compute_snapshot(&snapshot, now),
        };

        if metrics.is_overdue {
            tracing::warn!(
                "⏰ Sprint '{}' is past its end date with {} items not completed",
                metrics.sprint_name,
                metrics.planned - metrics.completed
            );
        }

        Ok(metrics)
    }

    async fn load(&self, metrics: &SprintMetrics) -> Result<String> {
        let files = render_report(metrics, self.config.output_formats())?;
        if files.is_empty() {
            return Err(MetricsError::MissingConfigError {
                field: "load.output_formats".to_string(),
            });
        }

        if let Some(filename) = self.config.bundle_filename() {
            tracing::debug!("Creating ZIP file with {} files", files.len());
            let zip_data = bundle_zip(&files)?;
            self.storage.write_file(filename, &zip_data).await?;
            return Ok(self.storage.resolve(filename));
        }

        for file in &files {
            self.storage.write_file(&file.name, &file.data).await?;
        }
        Ok(self.storage.resolve(&files[0].name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::FixedClock;
    use crate::domain::model::{
        BacklogItem, BugStats, BurndownPoint, BurndownSource, ItemStatus, MetricsSettings, Sprint,
        TeamMember,
    };
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        fn new() -> Self {
            Self {
                files: Arc::new(Mutex::new(HashMap::new())),
            }
        }

        async fn names(&self) -> Vec<String> {
            let mut names: Vec<String> = self.files.lock().await.keys().cloned().collect();
            names.sort();
            names
        }
    }

    impl Storage for MockStorage {
        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }

        fn resolve(&self, path: &str) -> String {
            format!("mem://{}", path)
        }
    }

    struct MockConfig {
        formats: Vec<String>,
        bundle: Option<String>,
        settings: MetricsSettings,
        cache: bool,
    }

    impl MockConfig {
        fn new() -> Self {
            Self {
                formats: vec!["json".to_string(), "csv".to_string()],
                bundle: None,
                settings: MetricsSettings::default(),
                cache: false,
            }
        }
    }

    impl ConfigProvider for MockConfig {
        fn output_path(&self) -> &str {
            "test_output"
        }

        fn output_formats(&self) -> &[String] {
            &self.formats
        }

        fn bundle_filename(&self) -> Option<&str> {
            self.bundle.as_deref()
        }

        fn metrics_settings(&self) -> MetricsSettings {
            self.settings
        }

        fn cache_enabled(&self) -> bool {
            self.cache
        }
    }

    struct MockBackend {
        items: Vec<BacklogItem>,
        team_fails: bool,
        burndown: Vec<BurndownPoint>,
        burndown_calls: AtomicUsize,
    }

    impl MockBackend {
        fn new(items: Vec<BacklogItem>) -> Self {
            Self {
                items,
                team_fails: false,
                burndown: Vec::new(),
                burndown_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ScrumBackend for MockBackend {
        async fn fetch_sprint(&self, sprint_id: &str) -> Result<Sprint> {
            if sprint_id == "missing" {
                return Err(MetricsError::NotFoundError {
                    resource: format!("sprints/{}", sprint_id),
                });
            }
            Ok(Sprint {
                id: None,
                name: "Sprint 3".to_string(),
                start_date: Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()),
                end_date: Some(Utc.with_ymd_and_hms(2025, 1, 14, 0, 0, 0).unwrap()),
                ..Sprint::default()
            })
        }

        async fn fetch_sprint_items(&self, _sprint_id: &str) -> Result<Vec<BacklogItem>> {
            Ok(self.items.clone())
        }

        async fn fetch_team_members(&self) -> Result<Vec<TeamMember>> {
            if self.team_fails {
                return Err(MetricsError::HttpStatusError {
                    status: 500,
                    url: "team-members".to_string(),
                });
            }
            Ok(vec![TeamMember {
                id: Some("1".to_string()),
                name: Some("Ana".to_string()),
                ..TeamMember::default()
            }])
        }

        async fn fetch_burndown(&self, _sprint_id: &str) -> Result<Vec<BurndownPoint>> {
            self.burndown_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.burndown.clone())
        }

        async fn fetch_bug_stats(&self, _sprint_id: &str) -> Result<Option<BugStats>> {
            Ok(None)
        }
    }

    fn item(points: f64, status: ItemStatus, sprint_id: Option<&str>) -> BacklogItem {
        BacklogItem {
            story_points: points,
            status,
            sprint_id: sprint_id.map(String::from),
            ..BacklogItem::default()
        }
    }

    fn clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2025, 1, 5, 0, 0, 0).unwrap())
    }

    #[tokio::test]
    async fn test_extract_filters_foreign_items_and_fills_id() {
        let backend = MockBackend::new(vec![
            item(5.0, ItemStatus::Completed, Some("3")),
            item(3.0, ItemStatus::Pending, None),
            item(8.0, ItemStatus::Pending, Some("4")),
        ]);
        let pipeline = SprintMetricsPipeline::new(backend, MockStorage::new(), MockConfig::new(), "3");

        let snapshot = pipeline.extract().await.unwrap();

        assert_eq!(snapshot.sprint.id.as_deref(), Some("3"));
        assert_eq!(snapshot.items.len(), 2);
        assert_eq!(snapshot.team.len(), 1);
    }

    #[tokio::test]
    async fn test_extract_degrades_when_team_fails() {
        let mut backend = MockBackend::new(vec![]);
        backend.team_fails = true;
        let pipeline = SprintMetricsPipeline::new(backend, MockStorage::new(), MockConfig::new(), "3");

        let snapshot = pipeline.extract().await.unwrap();
        assert!(snapshot.team.is_empty());
    }

    #[tokio::test]
    async fn test_extract_propagates_missing_sprint() {
        let pipeline = SprintMetricsPipeline::new(
            MockBackend::new(vec![]),
            MockStorage::new(),
            MockConfig::new(),
            "missing",
        );

        assert!(matches!(
            pipeline.extract().await,
            Err(MetricsError::NotFoundError { .. })
        ));
    }

    #[tokio::test]
    async fn test_extract_skips_burndown_when_synthetic_only() {
        let mut config = MockConfig::new();
        config.settings.prefer_backend_burndown = false;
        let pipeline = SprintMetricsPipeline::new(MockBackend::new(vec![]), MockStorage::new(), config, "3");

        pipeline.extract().await.unwrap();
        assert_eq!(pipeline.backend.burndown_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_transform_uses_injected_clock() {
        let mut backend = MockBackend::new(vec![item(5.0, ItemStatus::Completed, None)]);
        backend.burndown = vec![BurndownPoint { day: 1, planned: 5, actual: 5 }];
        let pipeline = SprintMetricsPipeline::new(backend, MockStorage::new(), MockConfig::new(), "3")
            .with_clock(clock());

        let snapshot = pipeline.extract().await.unwrap();
        let metrics = pipeline.transform(snapshot).await.unwrap();

        assert_eq!(metrics.total_days, 13);
        assert_eq!(metrics.days_elapsed, 4);
        assert_eq!(metrics.days_remaining, 9);
        assert_eq!(metrics.burndown_source, BurndownSource::Backend);
        assert_eq!(metrics.generated_at, clock().0);
    }

    #[tokio::test]
    async fn test_transform_populates_cache() {
        let mut config = MockConfig::new();
        config.cache = true;
        let pipeline = SprintMetricsPipeline::new(MockBackend::new(vec![]), MockStorage::new(), config, "3")
            .with_clock(clock());

        let snapshot = pipeline.extract().await.unwrap();
        let first = pipeline.transform(snapshot.clone()).await.unwrap();
        let second = pipeline.transform(snapshot).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(pipeline.cache().map(|c| c.len()), Some(1));
    }

    #[tokio::test]
    async fn test_load_writes_each_format() {
        let storage = MockStorage::new();
        let pipeline = SprintMetricsPipeline::new(MockBackend::new(vec![]), storage.clone(), MockConfig::new(), "3");
        let metrics = SprintMetrics {
            sprint_id: Some("3".to_string()),
            ..SprintMetrics::default()
        };

        let output = pipeline.load(&metrics).await.unwrap();

        assert_eq!(output, "mem://sprint-3-metrics.json");
        assert_eq!(
            storage.names().await,
            vec![
                "sprint-3-burndown.csv",
                "sprint-3-metrics.json",
                "sprint-3-workload.csv"
            ]
        );
    }

    #[tokio::test]
    async fn test_load_bundles_zip() {
        let storage = MockStorage::new();
        let mut config = MockConfig::new();
        config.bundle = Some("bundle.zip".to_string());
        let pipeline = SprintMetricsPipeline::new(MockBackend::new(vec![]), storage.clone(), config, "3");

        let output = pipeline.load(&SprintMetrics::default()).await.unwrap();

        assert_eq!(output, "mem://bundle.zip");
        assert_eq!(storage.names().await, vec!["bundle.zip"]);
    }
}
