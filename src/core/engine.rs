use crate::domain::model::SprintMetrics;
use crate::domain::ports::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::RunMonitor;

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub output_path: String,
    pub metrics: SprintMetrics,
}

pub struct MetricsEngine<P: Pipeline> {
    pipeline: P,
    monitor: RunMonitor,
}

impl<P: Pipeline> MetricsEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: RunMonitor::new(monitor_enabled),
        }
    }

    pub fn monitor(&self) -> &RunMonitor {
        &self.monitor
    }

    pub async fn run(&self) -> Result<RunOutcome> {
        tracing::info!("🚀 Starting sprint metrics run");

        // Extract
        let snapshot = self.pipeline.extract().await?;
        tracing::info!(
            "📥 Fetched sprint '{}' with {} backlog items ({} team members)",
            snapshot.sprint.name,
            snapshot.items.len(),
            snapshot.team.len()
        );
        self.monitor.finish_phase("fetch");

        // Transform
        let metrics = self.pipeline.transform(snapshot).await?;
        tracing::info!(
            "🧮 {}/{} items completed ({}%), {} of {} story points",
            metrics.completed,
            metrics.planned,
            metrics.completion_percentage,
            metrics.completed_story_points,
            metrics.total_story_points
        );
        self.monitor.finish_phase("aggregate");

        // Load
        let output_path = self.pipeline.load(&metrics).await?;
        tracing::info!("💾 Report written to: {}", output_path);
        self.monitor.finish_phase("write");
        self.monitor.log_final_stats();

        Ok(RunOutcome {
            output_path,
            metrics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Sprint, SprintSnapshot};
    use crate::utils::error::MetricsError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct RecordingPipeline {
        fail_extract: bool,
        calls: Mutex<Vec<&'static str>>,
    }

    impl RecordingPipeline {
        fn new(fail_extract: bool) -> Self {
            Self {
                fail_extract,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Pipeline for RecordingPipeline {
        async fn extract(&self) -> Result<SprintSnapshot> {
            self.calls.lock().unwrap().push("extract");
            if self.fail_extract {
                return Err(MetricsError::NotFoundError {
                    resource: "sprint 9".to_string(),
                });
            }
            Ok(SprintSnapshot {
                sprint: Sprint {
                    id: Some("9".to_string()),
                    ..Sprint::default()
                },
                ..SprintSnapshot::default()
            })
        }

        async fn transform(&self, snapshot: SprintSnapshot) -> Result<SprintMetrics> {
            self.calls.lock().unwrap().push("transform");
            Ok(SprintMetrics {
                sprint_id: snapshot.sprint.id,
                ..SprintMetrics::default()
            })
        }

        async fn load(&self, metrics: &SprintMetrics) -> Result<String> {
            self.calls.lock().unwrap().push("load");
            Ok(format!("out/{}", metrics.sprint_id.as_deref().unwrap_or("")))
        }
    }

    #[tokio::test]
    async fn test_run_executes_phases_in_order() {
        let engine = MetricsEngine::new(RecordingPipeline::new(false));
        let outcome = engine.run().await.unwrap();

        assert_eq!(outcome.output_path, "out/9");
        assert_eq!(outcome.metrics.sprint_id.as_deref(), Some("9"));
        assert_eq!(
            *engine.pipeline.calls.lock().unwrap(),
            vec!["extract", "transform", "load"]
        );
        assert_eq!(engine.monitor().timings().len(), 3);
    }

    #[tokio::test]
    async fn test_run_stops_on_extract_failure() {
        let engine = MetricsEngine::new(RecordingPipeline::new(true));
        let result = engine.run().await;

        assert!(matches!(result, Err(MetricsError::NotFoundError { .. })));
        assert_eq!(*engine.pipeline.calls.lock().unwrap(), vec!["extract"]);
    }
}
