use crate::config::toml_config::{CompressionConfig, MetricsConfig};
use crate::utils::error::{MetricsError, Result};
use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "sprint-metrics")]
#[command(about = "Compute sprint metrics (counts, burndown, workload) from a Scrum backend")]
pub struct CliArgs {
    /// Sprint identifier to report on
    #[arg(long)]
    pub sprint_id: String,

    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Backend base URL (overrides [source] base_url)
    #[arg(long)]
    pub api_base: Option<String>,

    /// Output directory (overrides [load] output_path)
    #[arg(long)]
    pub output_path: Option<String>,

    /// Comma-separated output formats: json, csv
    #[arg(long, value_delimiter = ',')]
    pub formats: Vec<String>,

    /// Bundle the report files into one ZIP archive
    #[arg(long)]
    pub zip: bool,

    /// Freeze "now" (RFC 3339 or YYYY-MM-DD) for reproducible reports
    #[arg(long)]
    pub now: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Override monitoring setting from config
    #[arg(long)]
    pub monitor: Option<bool>,

    /// Fetch and aggregate, print the metrics, write nothing
    #[arg(long)]
    pub dry_run: bool,
}

impl CliArgs {
    /// 載入設定檔（若有）並套用命令列覆蓋
    pub fn resolve_config(&self) -> Result<MetricsConfig> {
        let mut config = match (&self.config, &self.api_base) {
            (Some(path), _) => MetricsConfig::from_file(path)?,
            (None, Some(base)) => MetricsConfig::with_base_url(base.clone()),
            (None, None) => {
                return Err(MetricsError::MissingConfigError {
                    field: "--config or --api-base".to_string(),
                })
            }
        };

        if let Some(base) = &self.api_base {
            config.source.base_url = base.clone();
        }
        if let Some(output_path) = &self.output_path {
            config.load.output_path = output_path.clone();
        }
        if !self.formats.is_empty() {
            config.load.output_formats = self.formats.clone();
        }
        if self.zip {
            let filename = config
                .load
                .compression
                .as_ref()
                .and_then(|c| c.filename.clone());
            config.load.compression = Some(CompressionConfig {
                enabled: true,
                filename,
            });
        }

        Ok(config)
    }

    pub fn monitor_enabled(&self, config: &MetricsConfig) -> bool {
        self.monitor.unwrap_or_else(|| config.monitoring_enabled())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::ConfigProvider;

    #[test]
    fn test_api_base_without_config_file() {
        let args = CliArgs::parse_from([
            "sprint-metrics",
            "--sprint-id",
            "5",
            "--api-base",
            "http://localhost:8080/api",
            "--formats",
            "csv",
            "--zip",
        ]);

        let config = args.resolve_config().unwrap();
        assert_eq!(config.source.base_url, "http://localhost:8080/api");
        assert_eq!(config.output_formats(), &["csv".to_string()]);
        assert_eq!(config.bundle_filename(), Some("sprint-metrics.zip"));
        assert!(!args.monitor_enabled(&config));
    }

    #[test]
    fn test_missing_source_is_config_error() {
        let args = CliArgs::parse_from(["sprint-metrics", "--sprint-id", "5"]);
        assert!(matches!(
            args.resolve_config(),
            Err(MetricsError::MissingConfigError { .. })
        ));
    }
}
