use crate::config::toml_config::{EndpointPaths, SourceConfig, SPRINT_ID_PLACEHOLDER};
use crate::domain::model::{BacklogItem, BugStats, BurndownPoint, Sprint, TeamMember};
use crate::domain::normalize::{
    normalize_bug_stats, normalize_burndown_point, normalize_item, normalize_sprint,
    normalize_team_member,
};
use crate::domain::ports::ScrumBackend;
use crate::utils::error::{MetricsError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

/// 清單可能直接是陣列，或包在這些鍵底下
const LIST_WRAPPER_KEYS: &[&str] = &["data", "items", "results", "backlog"];

/// Scrum backend over its REST API.
pub struct RestBackend {
    client: Client,
    base_url: Url,
    endpoints: EndpointPaths,
    headers: HashMap<String, String>,
    timeout: Option<Duration>,
    retry_attempts: u32,
    retry_delay: Duration,
}

impl RestBackend {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url).map_err(|e| MetricsError::InvalidConfigValueError {
            field: "source.base_url".to_string(),
            value: base_url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client: Client::new(),
            base_url,
            endpoints: EndpointPaths::default(),
            headers: HashMap::new(),
            timeout: None,
            retry_attempts: 0,
            retry_delay: Duration::from_secs(1),
        })
    }

    pub fn from_config(source: &SourceConfig) -> Result<Self> {
        let mut backend = Self::new(&source.base_url)?;
        backend.endpoints = source.endpoints.clone();
        backend.headers = source.headers.clone().unwrap_or_default();
        backend.timeout = source.timeout_seconds.map(Duration::from_secs);
        backend.retry_attempts = source.retry_attempts.unwrap_or(0);
        if let Some(delay) = source.retry_delay_seconds {
            backend.retry_delay = Duration::from_secs(delay);
        }
        Ok(backend)
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn with_retry(mut self, attempts: u32, delay: Duration) -> Self {
        self.retry_attempts = attempts;
        self.retry_delay = delay;
        self
    }

    /// Resolves an endpoint template such as `bugs/stats?sprint_id={sprint_id}`
    /// against the base URL. The sprint id is percent-encoded.
    pub fn endpoint_url(&self, template: &str, sprint_id: &str) -> Result<Url> {
        let (path, query) = match template.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (template, None),
        };

        let mut url = self.base_url.clone();
        {
            let mut segments =
                url.path_segments_mut()
                    .map_err(|_| MetricsError::InvalidConfigValueError {
                        field: "source.base_url".to_string(),
                        value: self.base_url.to_string(),
                        reason: "URL cannot be a base".to_string(),
                    })?;
            segments.pop_if_empty();
            for segment in path.split('/').filter(|s| !s.is_empty()) {
                segments.push(&segment.replace(SPRINT_ID_PLACEHOLDER, sprint_id));
            }
        }

        if let Some(query) = query {
            let mut pairs = url.query_pairs_mut();
            for pair in query.split('&').filter(|p| !p.is_empty()) {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                pairs.append_pair(key, &value.replace(SPRINT_ID_PLACEHOLDER, sprint_id));
            }
        }

        Ok(url)
    }

    async fn get_once(&self, url: &Url) -> Result<Value> {
        let mut request = self.client.get(url.clone());

        for (key, value) in &self.headers {
            request = request.header(key, value);
        }

        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        tracing::debug!("Making API request to: {}", url);
        let response = request.send().await?;
        let status = response.status();
        tracing::debug!("API response status: {}", status);

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(MetricsError::NotFoundError {
                resource: url.to_string(),
            });
        }
        if !status.is_success() {
            return Err(MetricsError::HttpStatusError {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| MetricsError::PayloadError {
            endpoint: url.to_string(),
            message: format!("invalid JSON: {}", e),
        })
    }

    /// GET with retries on transport errors and 5xx responses.
    async fn get_json(&self, url: Url) -> Result<Value> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.get_once(&url).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt <= self.retry_attempts => {
                    tracing::warn!(
                        "⚠️ Request to {} failed (attempt {}/{}): {}",
                        url,
                        attempt,
                        self.retry_attempts + 1,
                        e
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn get_list(&self, template: &str, sprint_id: &str) -> Result<Vec<Value>> {
        let url = self.endpoint_url(template, sprint_id)?;
        let endpoint = url.to_string();
        unwrap_list(self.get_json(url).await?, &endpoint)
    }
}

fn unwrap_list(value: Value, endpoint: &str) -> Result<Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Null => Ok(Vec::new()),
        Value::Object(mut map) => LIST_WRAPPER_KEYS
            .iter()
            .find_map(|key| match map.remove(*key) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            })
            .ok_or_else(|| MetricsError::PayloadError {
                endpoint: endpoint.to_string(),
                message: "expected a list or an object wrapping one".to_string(),
            }),
        _ => Err(MetricsError::PayloadError {
            endpoint: endpoint.to_string(),
            message: "expected a list".to_string(),
        }),
    }
}

fn unwrap_object(value: Value, endpoint: &str) -> Result<Value> {
    match value {
        Value::Object(mut map) => match map.remove("data") {
            Some(inner @ Value::Object(_)) => Ok(inner),
            Some(other) => {
                map.insert("data".to_string(), other);
                Ok(Value::Object(map))
            }
            None => Ok(Value::Object(map)),
        },
        _ => Err(MetricsError::PayloadError {
            endpoint: endpoint.to_string(),
            message: "expected an object".to_string(),
        }),
    }
}

#[async_trait]
impl ScrumBackend for RestBackend {
    async fn fetch_sprint(&self, sprint_id: &str) -> Result<Sprint> {
        let url = self.endpoint_url(&self.endpoints.sprint, sprint_id)?;
        let endpoint = url.to_string();
        let record = unwrap_object(self.get_json(url).await?, &endpoint)?;

        let mut sprint = normalize_sprint(&record);
        if sprint.id.is_none() {
            sprint.id = Some(sprint_id.to_string());
        }
        Ok(sprint)
    }

    async fn fetch_sprint_items(&self, sprint_id: &str) -> Result<Vec<BacklogItem>> {
        let records = self.get_list(&self.endpoints.items, sprint_id).await?;
        Ok(records.iter().map(normalize_item).collect())
    }

    async fn fetch_team_members(&self) -> Result<Vec<TeamMember>> {
        let records = self.get_list(&self.endpoints.team, "").await?;
        Ok(records.iter().map(normalize_team_member).collect())
    }

    async fn fetch_burndown(&self, sprint_id: &str) -> Result<Vec<BurndownPoint>> {
        match self.get_list(&self.endpoints.burndown, sprint_id).await {
            Ok(records) => Ok(records
                .iter()
                .enumerate()
                .map(|(position, record)| normalize_burndown_point(record, position))
                .collect()),
            // 後端沒有紀錄燃盡圖
            Err(MetricsError::NotFoundError { .. }) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    async fn fetch_bug_stats(&self, sprint_id: &str) -> Result<Option<BugStats>> {
        let url = self.endpoint_url(&self.endpoints.bug_stats, sprint_id)?;
        let endpoint = url.to_string();
        match self.get_json(url).await {
            Ok(value) => Ok(match unwrap_object(value, &endpoint) {
                Ok(record) => normalize_bug_stats(&record),
                Err(_) => None,
            }),
            Err(MetricsError::NotFoundError { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
