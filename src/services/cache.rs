//! Read-through response cache for folder listings and thumbnails.
//!
//! Entries expire on their own TTL and are dropped explicitly whenever a
//! mutation changes the listing they hold.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::future::Cache;
use moka::Expiry;
use serde_json::Value;
use tracing::{debug, warn};

use crate::services::file_service::UpstreamError;

pub const FOLDER_LISTING_TTL: Duration = Duration::from_secs(120);
pub const THUMBNAIL_TTL: Duration = Duration::from_secs(3600);

const MAX_ENTRIES: u64 = 10_000;

/// Namespaced cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheKey<'a> {
    Folder(&'a str),
    Thumbnail(&'a str),
}

impl fmt::Display for CacheKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Folder(id) => write!(f, "folder:{}", id),
            CacheKey::Thumbnail(id) => write!(f, "thumbnail:{}", id),
        }
    }
}

impl CacheKey<'_> {
    pub fn ttl(&self) -> Duration {
        match self {
            CacheKey::Folder(_) => FOLDER_LISTING_TTL,
            CacheKey::Thumbnail(_) => THUMBNAIL_TTL,
        }
    }

    fn scope_id(&self) -> &str {
        match self {
            CacheKey::Folder(id) | CacheKey::Thumbnail(id) => id,
        }
    }
}

#[derive(Clone)]
struct Entry {
    payload: Arc<str>,
    ttl: Duration,
}

/// Expires each entry after the TTL it was written with.
struct PerEntryTtl;

impl Expiry<String, Entry> for PerEntryTtl {
    fn expire_after_create(&self, _key: &String, value: &Entry, _created_at: Instant) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

#[derive(Clone)]
pub struct ResponseCache {
    entries: Cache<String, Entry>,
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseCache {
    pub fn new() -> Self {
        let entries = Cache::builder()
            .max_capacity(MAX_ENTRIES)
            .expire_after(PerEntryTtl)
            .name("response_cache")
            .build();
        Self { entries }
    }

    /// Serialized payload for `key`, or `None` on miss or expiry.
    pub async fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).await.map(|entry| entry.payload.to_string())
    }

    /// Stores `value` under `key`, replacing any previous entry and its TTL.
    pub async fn set(&self, key: &str, value: String, ttl: Duration) {
        let entry = Entry {
            payload: Arc::from(value),
            ttl,
        };
        self.entries.insert(key.to_string(), entry).await;
    }

    /// Drops `key`. Blank keys are ignored.
    pub async fn invalidate(&self, key: &str) {
        if key.trim().is_empty() {
            return;
        }
        self.entries.invalidate(key).await;
        debug!(key, "cache cleared");
    }

    /// Drops the listing of `folder_id`. Absent or blank ids are ignored so an
    /// unknown scope never turns into a `folder:` key.
    pub async fn invalidate_folder(&self, folder_id: Option<&str>) {
        match folder_id.map(str::trim) {
            Some(id) if !id.is_empty() => self.invalidate(&CacheKey::Folder(id).to_string()).await,
            _ => {}
        }
    }

    pub async fn invalidate_thumbnail(&self, file_id: &str) {
        if file_id.trim().is_empty() {
            return;
        }
        self.invalidate(&CacheKey::Thumbnail(file_id).to_string()).await;
    }

    /// Returns the cached payload for `key`, or calls `fetch` and caches what
    /// it returns. Concurrent misses each call `fetch`; the last write wins.
    pub async fn read_through<F, Fut>(&self, key: CacheKey<'_>, fetch: F) -> Result<Value, UpstreamError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, UpstreamError>>,
    {
        let cache_key = key.to_string();

        if let Some(cached) = self.get(&cache_key).await {
            match serde_json::from_str(&cached) {
                Ok(value) => {
                    debug!(key = %cache_key, "cache hit");
                    return Ok(value);
                }
                Err(err) => warn!(key = %cache_key, error = %err, "discarding unreadable cache entry"),
            }
        }

        debug!(key = %cache_key, scope = key.scope_id(), "cache miss, fetching from file service");
        let value = fetch().await?;
        self.set(&cache_key, serde_json::to_string(&value)?, key.ttl())
            .await;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn keys_are_namespaced() {
        assert_eq!(CacheKey::Folder("abc").to_string(), "folder:abc");
        assert_eq!(CacheKey::Thumbnail("f1").to_string(), "thumbnail:f1");
        assert_eq!(CacheKey::Folder("x").ttl(), Duration::from_secs(120));
        assert_eq!(CacheKey::Thumbnail("x").ttl(), Duration::from_secs(3600));
    }

    #[tokio::test]
    async fn set_then_get_returns_value() {
        let cache = ResponseCache::new();
        cache.set("folder:a", "{\"n\":1}".into(), FOLDER_LISTING_TTL).await;
        assert_eq!(cache.get("folder:a").await.as_deref(), Some("{\"n\":1}"));
        assert_eq!(cache.get("folder:b").await, None);
    }

    #[tokio::test]
    async fn set_overwrites_unconditionally() {
        let cache = ResponseCache::new();
        cache.set("k", "old".into(), FOLDER_LISTING_TTL).await;
        cache.set("k", "new".into(), FOLDER_LISTING_TTL).await;
        assert_eq!(cache.get("k").await.as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn entries_expire_after_their_ttl() {
        let cache = ResponseCache::new();
        cache.set("short", "1".into(), Duration::from_millis(50)).await;
        cache.set("long", "2".into(), Duration::from_secs(60)).await;

        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(cache.get("short").await, None);
        assert_eq!(cache.get("long").await.as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn invalidate_is_idempotent_and_ignores_blank_scopes() {
        let cache = ResponseCache::new();
        cache.set("folder:a", "1".into(), FOLDER_LISTING_TTL).await;
        cache.set("folder:", "stray".into(), FOLDER_LISTING_TTL).await;

        cache.invalidate_folder(Some("a")).await;
        cache.invalidate_folder(Some("a")).await;
        cache.invalidate_folder(None).await;
        cache.invalidate_folder(Some("  ")).await;
        cache.invalidate("").await;

        assert_eq!(cache.get("folder:a").await, None);
        assert_eq!(cache.get("folder:").await.as_deref(), Some("stray"));
    }

    #[tokio::test]
    async fn read_through_fetches_once_per_ttl_window() {
        let cache = ResponseCache::new();
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let fetch = move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, UpstreamError>(json!({ "thumbnail_url": "https://cdn.test/t.jpg" }))
        };

        let first = cache.read_through(CacheKey::Thumbnail("f1"), fetch).await.unwrap();
        let second = cache.read_through(CacheKey::Thumbnail("f1"), fetch).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn read_through_does_not_cache_failures() {
        let cache = ResponseCache::new();
        let result = cache
            .read_through(CacheKey::Folder("f"), || async {
                Err::<Value, _>(UpstreamError::Status {
                    status: 500,
                    body: "boom".into(),
                })
            })
            .await;

        assert!(result.is_err());
        assert_eq!(cache.get("folder:f").await, None);
    }

    #[tokio::test]
    async fn unreadable_entries_fall_through_to_fetch() {
        let cache = ResponseCache::new();
        cache.set("folder:f", "not json".into(), FOLDER_LISTING_TTL).await;

        let value = cache
            .read_through(CacheKey::Folder("f"), || async { Ok::<_, UpstreamError>(json!([1, 2])) })
            .await
            .unwrap();

        assert_eq!(value, json!([1, 2]));
        assert_eq!(cache.get("folder:f").await.as_deref(), Some("[1,2]"));
    }
}
