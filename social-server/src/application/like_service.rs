use std::sync::Arc;

use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::application::post_cache::PostCache;
use crate::data::like_repository::LikeRepository;
use crate::domain::error::DomainError;
use crate::domain::like::LikeTarget;

/// Keeps at most one like per user and target, and the cached post
/// counters in step with the store.
#[derive(Clone)]
pub struct LikeService<L: LikeRepository + 'static> {
    repo: Arc<L>,
    cache: PostCache,
}

impl<L> LikeService<L>
where
    L: LikeRepository + 'static,
{
    pub fn new(repo: Arc<L>, cache: PostCache) -> Self {
        Self { repo, cache }
    }

    #[instrument(skip(self))]
    pub async fn like(&self, target: LikeTarget, user_id: Uuid) -> Result<(), DomainError> {
        // Fast path only. Two racing requests can both get past it; the
        // store's primary key rejects the second insert.
        if self.repo.exists(target, user_id).await? {
            return Err(DomainError::AlreadyLiked(target));
        }
        self.repo.insert(target, user_id).await?;

        info!(%target, %user_id, "liked");
        self.patch_cached_count(target, 1).await;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn unlike(&self, target: LikeTarget, user_id: Uuid) -> Result<(), DomainError> {
        if !self.repo.remove(target, user_id).await? {
            return Err(DomainError::NotLiked(target));
        }

        info!(%target, %user_id, "unliked");
        self.patch_cached_count(target, -1).await;
        Ok(())
    }

    pub async fn is_liked(&self, target: LikeTarget, user_id: Uuid) -> Result<bool, DomainError> {
        self.repo.exists(target, user_id).await
    }

    async fn patch_cached_count(&self, target: LikeTarget, delta: i64) {
        // comments are never cached
        let LikeTarget::Post(post_id) = target else {
            return;
        };
        if let Err(e) = self.cache.adjust_like_count(post_id, delta).await {
            warn!(%post_id, error = %e, "failed to patch cached like count");
        }
    }
}
