use crate::core::report::SUPPORTED_FORMATS;
use crate::domain::model::{
    MetricsSettings, DEFAULT_BURNDOWN_MAX_DAYS, DEFAULT_COMPLETED_PROGRESS_FACTOR,
};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{MetricsError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Placeholder replaced by the requested sprint id in endpoint paths.
pub const SPRINT_ID_PLACEHOLDER: &str = "{sprint_id}";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    pub source: SourceConfig,
    #[serde(default)]
    pub metrics: MetricsSection,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub load: LoadConfig,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub base_url: String,
    pub timeout_seconds: Option<u64>,
    pub retry_attempts: Option<u32>,
    pub retry_delay_seconds: Option<u64>,
    pub headers: Option<HashMap<String, String>>,
    #[serde(default)]
    pub endpoints: EndpointPaths,
}

/// 相對於 `base_url` 的路徑，可帶查詢字串
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointPaths {
    pub sprint: String,
    pub items: String,
    pub team: String,
    pub burndown: String,
    pub bug_stats: String,
}

impl Default for EndpointPaths {
    fn default() -> Self {
        Self {
            sprint: "sprints/{sprint_id}".to_string(),
            items: "sprints/{sprint_id}/backlog".to_string(),
            team: "team-members".to_string(),
            burndown: "sprints/{sprint_id}/burndown".to_string(),
            bug_stats: "bugs/stats?sprint_id={sprint_id}".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsSection {
    pub burndown_max_days: Option<usize>,
    pub completed_progress_factor: Option<f64>,
    pub prefer_backend_burndown: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    pub enabled: Option<bool>,
    pub capacity: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    pub output_path: String,
    pub output_formats: Vec<String>,
    pub compression: Option<CompressionConfig>,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            output_path: "./output".to_string(),
            output_formats: vec!["json".to_string(), "csv".to_string()],
            compression: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionConfig {
    pub enabled: bool,
    pub filename: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub log_level: Option<String>,
    pub json_logs: Option<bool>,
}

impl MetricsConfig {
    /// 只有 base URL 的預設配置，其餘使用預設值
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            source: SourceConfig {
                base_url: base_url.into(),
                timeout_seconds: None,
                retry_attempts: None,
                retry_delay_seconds: None,
                headers: None,
                endpoints: EndpointPaths::default(),
            },
            metrics: MetricsSection::default(),
            cache: CacheConfig::default(),
            load: LoadConfig::default(),
            monitoring: None,
        }
    }

    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(MetricsError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| MetricsError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${SCRUM_API_TOKEN})，未定義的保留原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").map_err(|e| {
            MetricsError::ConfigValidationError {
                field: "env_substitution".to_string(),
                message: e.to_string(),
            }
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_url("source.base_url", &self.source.base_url)?;
        validation::validate_path("load.output_path", &self.load.output_path)?;
        validation::validate_allowed_values(
            "load.output_formats",
            &self.load.output_formats,
            SUPPORTED_FORMATS,
        )?;

        if self.load.output_formats.is_empty() {
            return Err(MetricsError::MissingConfigError {
                field: "load.output_formats".to_string(),
            });
        }

        if let Some(days) = self.metrics.burndown_max_days {
            validation::validate_positive_number("metrics.burndown_max_days", days, 1)?;
        }
        if let Some(factor) = self.metrics.completed_progress_factor {
            validation::validate_non_negative_factor("metrics.completed_progress_factor", factor)?;
        }
        if let Some(capacity) = self.cache.capacity {
            validation::validate_positive_number("cache.capacity", capacity, 1)?;
        }
        if let Some(compression) = &self.load.compression {
            if let Some(filename) = &compression.filename {
                validation::validate_non_empty_string("load.compression.filename", filename)?;
            }
        }

        let endpoints = &self.source.endpoints;
        for (field, path) in [
            ("source.endpoints.sprint", &endpoints.sprint),
            ("source.endpoints.items", &endpoints.items),
        ] {
            if !path.contains(SPRINT_ID_PLACEHOLDER) {
                return Err(MetricsError::InvalidConfigValueError {
                    field: field.to_string(),
                    value: path.clone(),
                    reason: format!("Path must contain {}", SPRINT_ID_PLACEHOLDER),
                });
            }
        }

        Ok(())
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    pub fn log_level(&self) -> Option<&str> {
        self.monitoring.as_ref().and_then(|m| m.log_level.as_deref())
    }

    pub fn json_logs(&self) -> bool {
        self.monitoring
            .as_ref()
            .and_then(|m| m.json_logs)
            .unwrap_or(false)
    }

    pub fn cache_capacity(&self) -> Option<usize> {
        self.cache.capacity
    }
}

impl ConfigProvider for MetricsConfig {
    fn output_path(&self) -> &str {
        &self.load.output_path
    }

    fn output_formats(&self) -> &[String] {
        &self.load.output_formats
    }

    fn bundle_filename(&self) -> Option<&str> {
        match &self.load.compression {
            Some(compression) if compression.enabled => Some(
                compression
                    .filename
                    .as_deref()
                    .unwrap_or("sprint-metrics.zip"),
            ),
            _ => None,
        }
    }

    fn metrics_settings(&self) -> MetricsSettings {
        MetricsSettings {
            burndown_max_days: self
                .metrics
                .burndown_max_days
                .unwrap_or(DEFAULT_BURNDOWN_MAX_DAYS),
            completed_progress_factor: self
                .metrics
                .completed_progress_factor
                .unwrap_or(DEFAULT_COMPLETED_PROGRESS_FACTOR),
            prefer_backend_burndown: self.metrics.prefer_backend_burndown.unwrap_or(true),
        }
    }

    fn cache_enabled(&self) -> bool {
        self.cache.enabled.unwrap_or(false)
    }
}

impl Validate for MetricsConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
