use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{debug, warn};

struct Entry {
    data: Value,
    expires_at: Instant,
}

/// Per-user cache for dashboard and analytics responses.
///
/// Keys look like `user_id:endpoint[:k=v&k=v]`; every write a user makes
/// clears all of that user's keys.
pub struct ResponseCache {
    entries: Mutex<HashMap<String, Entry>>,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub fn key(user_id: &str, endpoint: &str, params: &[(&str, String)]) -> String {
        let mut key = format!("{user_id}:{endpoint}");
        if !params.is_empty() {
            let mut sorted: Vec<_> = params.iter().collect();
            sorted.sort_by(|a, b| a.0.cmp(b.0));
            let joined = sorted
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("&");
            key.push(':');
            key.push_str(&joined);
        }
        key
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        let mut entries = match self.entries.lock() {
            Ok(guard) => guard,
            Err(_) => {
                warn!("response cache lock poisoned, bypassing cache");
                return None;
            }
        };

        match entries.get(key) {
            Some(entry) if Instant::now() < entry.expires_at => Some(entry.data.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Stores `data` and drops every entry that has already expired.
    pub fn set(&self, key: String, data: Value) {
        if let Ok(mut entries) = self.entries.lock() {
            let now = Instant::now();
            entries.retain(|_, entry| now < entry.expires_at);
            entries.insert(
                key,
                Entry {
                    data,
                    expires_at: Instant::now() + self.ttl,
                },
            );
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear_user(&self, user_id: &str) -> usize {
        let prefix = format!("{user_id}:");
        let Ok(mut entries) = self.entries.lock() else {
            warn!("response cache lock poisoned, could not clear entries for {}", user_id);
            return 0;
        };
        let before = entries.len();
        entries.retain(|k, _| !k.starts_with(&prefix));
        let removed = before - entries.len();
        if removed > 0 {
            debug!("cleared {} cached responses for {}", removed, user_id);
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_sorts_params() {
        let key = ResponseCache::key(
            "u1",
            "analytics/study-stats",
            &[("year", "2026".to_string()), ("days", "7".to_string())],
        );
        assert_eq!(key, "u1:analytics/study-stats:days=7&year=2026");
        assert_eq!(ResponseCache::key("u1", "dashboard/summary", &[]), "u1:dashboard/summary");
    }

    #[test]
    fn expired_entries_are_dropped() {
        let cache = ResponseCache::new(Duration::from_millis(0));
        cache.set("u1:x".to_string(), json!(1));
        assert!(cache.get("u1:x").is_none());
    }

    #[test]
    fn unread_expired_entries_do_not_pile_up() {
        let cache = ResponseCache::new(Duration::from_millis(0));
        for year in 0..5000 {
            let key = ResponseCache::key("u1", "analytics/heatmap", &[("year", year.to_string())]);
            cache.set(key, json!({ "year": year }));
        }
        assert!(cache.len() <= 1);

        let cache = ResponseCache::new(Duration::from_secs(60));
        cache.set("u1:a".to_string(), json!(1));
        cache.set("u1:b".to_string(), json!(2));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn clear_user_only_touches_that_user() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        cache.set("u1:a".to_string(), json!(1));
        cache.set("u1:b".to_string(), json!(2));
        cache.set("u10:a".to_string(), json!(3));

        assert_eq!(cache.clear_user("u1"), 2);
        assert!(cache.get("u1:a").is_none());
        assert_eq!(cache.get("u10:a"), Some(json!(3)));
    }
}
