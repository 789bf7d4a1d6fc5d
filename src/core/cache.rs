use crate::domain::model::{SprintMetrics, SprintSnapshot};
use chrono::{DateTime, Utc};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;

const DEFAULT_CAPACITY: usize = 64;

/// `(sprint id, input hash, now truncated to the minute)`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub sprint_id: String,
    pub input_hash: u64,
    pub minute: i64,
}

impl CacheKey {
    pub fn for_snapshot(snapshot: &SprintSnapshot, now: DateTime<Utc>) -> Self {
        // 序列化失敗時退回空字串，只會造成快取命中率下降
        let serialized = serde_json::to_string(snapshot).unwrap_or_default();
        let mut hasher = DefaultHasher::new();
        serialized.hash(&mut hasher);
        // 指紋不會序列化，但會影響工作量分組
        for item in &snapshot.items {
            item.assigned_to
                .as_ref()
                .map(|assignee| assignee.group_key())
                .hash(&mut hasher);
        }

        Self {
            sprint_id: snapshot.sprint.id.clone().unwrap_or_default(),
            input_hash: hasher.finish(),
            minute: now.timestamp().div_euclid(60),
        }
    }
}

/// Memoizes computed metrics. Entries from older minutes are dropped first
/// when the cache is full.
pub struct MetricsCache {
    entries: Mutex<HashMap<CacheKey, SprintMetrics>>,
    capacity: usize,
}

impl MetricsCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get_or_compute<F>(&self, key: CacheKey, compute: F) -> SprintMetrics
    where
        F: FnOnce() -> SprintMetrics,
    {
        let Ok(mut entries) = self.entries.lock() else {
            return compute();
        };

        if let Some(hit) = entries.get(&key) {
            tracing::debug!("Metrics cache hit for sprint {}", key.sprint_id);
            return hit.clone();
        }

        tracing::debug!("Metrics cache miss for sprint {}", key.sprint_id);
        let metrics = compute();

        if entries.len() >= self.capacity {
            entries.retain(|existing, _| existing.minute >= key.minute);
            if entries.len() >= self.capacity {
                entries.clear();
            }
        }
        entries.insert(key, metrics.clone());
        metrics
    }
}

impl Default for MetricsCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
