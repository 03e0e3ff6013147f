//! Typed, fail-open view of the cache for post snapshots.
//!
//! Keys: `post:{id}` holds one JSON post, `posts:all` holds the JSON listing.
//! Every call is bounded by `timeout`. Reads turn any failure into a miss;
//! writes return the error so the caller can log the degraded side effect.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::post::Post;
use crate::infrastructure::cache::{Cache, CacheError};

pub const POSTS_ALL_KEY: &str = "posts:all";

/// Compare-and-set rounds a like patch gets before the entry is evicted.
const PATCH_ATTEMPTS: usize = 3;

pub fn post_key(id: Uuid) -> String {
    format!("post:{id}")
}

#[derive(Clone)]
pub struct PostCache {
    cache: Arc<dyn Cache>,
    ttl: Duration,
    timeout: Duration,
}

impl PostCache {
    pub fn new(cache: Arc<dyn Cache>, ttl: Duration, timeout: Duration) -> Self {
        Self {
            cache,
            ttl,
            timeout,
        }
    }

    pub async fn get_post(&self, id: Uuid) -> Option<Post> {
        self.read(&post_key(id)).await
    }

    pub async fn get_posts(&self) -> Option<Vec<Post>> {
        self.read(POSTS_ALL_KEY).await
    }

    pub async fn put_post(&self, post: &Post) -> Result<(), CacheError> {
        self.write(&post_key(post.id), post).await
    }

    pub async fn put_posts(&self, posts: &[Post]) -> Result<(), CacheError> {
        self.write(POSTS_ALL_KEY, posts).await
    }

    /// Drops the listing snapshot, which no longer reflects the store.
    pub async fn invalidate_list(&self) -> Result<(), CacheError> {
        self.bounded(self.cache.delete(&[POSTS_ALL_KEY.to_string()]))
            .await
    }

    /// Drops a single post together with the listing.
    pub async fn evict_post(&self, id: Uuid) -> Result<(), CacheError> {
        self.evict_posts(&[id]).await
    }

    /// Drops several posts together with the listing.
    pub async fn evict_posts(&self, ids: &[Uuid]) -> Result<(), CacheError> {
        let mut keys: Vec<String> = ids.iter().map(|id| post_key(*id)).collect();
        keys.push(POSTS_ALL_KEY.to_string());
        self.bounded(self.cache.delete(&keys)).await
    }

    /// Shifts the cached `like_count` of a post in place.
    ///
    /// The entry is swapped only if nobody rewrote it since it was read, and
    /// it keeps its remaining TTL. A patch that keeps losing that race evicts
    /// the entry instead. Returns `false` when nothing was patched; the next
    /// read then repopulates the post with the store's count.
    pub async fn adjust_like_count(&self, id: Uuid, delta: i64) -> Result<bool, CacheError> {
        let key = post_key(id);
        for _ in 0..PATCH_ATTEMPTS {
            let Some(raw) = self.bounded(self.cache.get(&key)).await? else {
                return Ok(false);
            };
            let mut post: Post = serde_json::from_slice(&raw)?;
            post.like_count = (post.like_count + delta).max(0);
            let patched = serde_json::to_vec(&post)?;

            if self
                .bounded(self.cache.compare_and_swap(&key, &raw, &patched))
                .await?
            {
                debug!(post_id = %id, like_count = post.like_count, "cached like count patched");
                return Ok(true);
            }
            debug!(post_id = %id, "cached post changed during like patch, retrying");
        }

        warn!(post_id = %id, "like patch kept racing, evicting cached post");
        self.bounded(self.cache.delete(&[key])).await?;
        Ok(false)
    }

    async fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.bounded(self.cache.get(key)).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(key, "cache miss");
                return None;
            }
            Err(e) => {
                warn!(key, error = %e, "cache read failed, falling back to store");
                return None;
            }
        };

        match serde_json::from_slice(&raw) {
            Ok(value) => {
                debug!(key, "cache hit");
                Some(value)
            }
            Err(e) => {
                warn!(key, error = %e, "discarding undecodable cache entry");
                None
            }
        }
    }

    async fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), CacheError> {
        let bytes = serde_json::to_vec(value)?;
        self.bounded(self.cache.set(key, &bytes, self.ttl)).await
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, CacheError>>,
    ) -> Result<T, CacheError> {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| CacheError::Timeout(self.timeout))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ContendedCache, FailingCache, MemoryCache, SlowCache, YieldingCache};

    fn post() -> Post {
        Post::new(Uuid::new_v4(), "cached".into(), None)
    }

    fn cache_over(backend: Arc<dyn Cache>) -> PostCache {
        PostCache::new(backend, Duration::from_secs(60), Duration::from_millis(50))
    }

    #[tokio::test]
    async fn stores_posts_under_post_key() {
        let backend = Arc::new(MemoryCache::default());
        let cache = cache_over(backend.clone());
        let post = post();

        cache.put_post(&post).await.unwrap();

        assert!(backend.contains(&format!("post:{}", post.id)));
        assert_eq!(cache.get_post(post.id).await, Some(post));
    }

    #[tokio::test]
    async fn failing_backend_reads_as_miss() {
        let cache = cache_over(Arc::new(FailingCache));
        assert_eq!(cache.get_post(Uuid::new_v4()).await, None);
        assert!(cache.put_post(&post()).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_backend_times_out_as_miss() {
        let cache = cache_over(Arc::new(SlowCache(Duration::from_secs(5))));
        assert_eq!(cache.get_posts().await, None);
        assert!(matches!(
            cache.invalidate_list().await,
            Err(CacheError::Timeout(_))
        ));
    }

    #[tokio::test]
    async fn like_count_patch_is_clamped_at_zero() {
        let cache = cache_over(Arc::new(MemoryCache::default()));
        let post = post();
        cache.put_post(&post).await.unwrap();

        assert!(cache.adjust_like_count(post.id, -1).await.unwrap());
        assert_eq!(cache.get_post(post.id).await.unwrap().like_count, 0);
    }

    #[tokio::test]
    async fn like_count_patch_keeps_remaining_ttl() {
        let backend = Arc::new(MemoryCache::default());
        let cache = cache_over(backend.clone());
        let post = post();
        cache.put_post(&post).await.unwrap();
        let expiry = backend.expires_at(&post_key(post.id));

        assert!(cache.adjust_like_count(post.id, 1).await.unwrap());

        assert!(expiry.is_some());
        assert_eq!(backend.expires_at(&post_key(post.id)), expiry);
    }

    #[tokio::test]
    async fn interleaved_like_count_patches_are_not_lost() {
        let backend = Arc::new(YieldingCache::default());
        let cache = cache_over(backend.clone());
        let post = post();
        cache.put_post(&post).await.unwrap();

        let (a, b) = tokio::join!(
            cache.adjust_like_count(post.id, 1),
            cache.adjust_like_count(post.id, 1)
        );

        assert!(a.unwrap() && b.unwrap());
        assert_eq!(cache.get_post(post.id).await.unwrap().like_count, 2);
    }

    #[tokio::test]
    async fn like_count_patch_that_keeps_losing_evicts_entry() {
        let backend = Arc::new(ContendedCache::default());
        let cache = cache_over(backend.clone());
        let post = post();
        cache.put_post(&post).await.unwrap();

        assert!(!cache.adjust_like_count(post.id, 1).await.unwrap());
        assert!(!backend.0.contains(&post_key(post.id)));
    }

    #[tokio::test]
    async fn evicting_posts_drops_listing_too() {
        let backend = Arc::new(MemoryCache::default());
        let cache = cache_over(backend.clone());
        let (first, second) = (post(), post());
        cache.put_post(&first).await.unwrap();
        cache.put_post(&second).await.unwrap();
        cache.put_posts(&[first.clone(), second.clone()]).await.unwrap();

        cache.evict_posts(&[first.id, second.id]).await.unwrap();

        assert!(!backend.contains(&post_key(first.id)));
        assert!(!backend.contains(&post_key(second.id)));
        assert!(!backend.contains(POSTS_ALL_KEY));
    }

    #[tokio::test]
    async fn like_count_patch_skips_uncached_posts() {
        let backend = Arc::new(MemoryCache::default());
        let cache = cache_over(backend.clone());
        let id = Uuid::new_v4();

        assert!(!cache.adjust_like_count(id, 1).await.unwrap());
        assert!(!backend.contains(&post_key(id)));
    }

    #[tokio::test]
    async fn undecodable_entry_is_a_miss() {
        let backend = Arc::new(MemoryCache::default());
        let id = Uuid::new_v4();
        backend
            .set(&post_key(id), b"not json", Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(cache_over(backend).get_post(id).await, None);
    }
}
