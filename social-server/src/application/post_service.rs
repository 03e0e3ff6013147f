use std::sync::Arc;

use crate::application::post_cache::PostCache;
use crate::data::post_repository::PostRepository;
use crate::domain::access::authorize;
use crate::domain::{
    error::DomainError,
    post::{Post, PostPatch},
};
use tracing::{instrument, warn};
use uuid::Uuid;

/// Reads and writes posts through the store, keeping the cache coherent.
///
/// The store is always written first, the cache second. A crash or cache
/// failure in between leaves a stale entry that expires with its TTL, never
/// a cached post that the store does not have.
#[derive(Clone)]
pub struct PostService<R: PostRepository + 'static> {
    repo: Arc<R>,
    cache: PostCache,
}

impl<R> PostService<R>
where
    R: PostRepository + 'static,
{
    pub fn new(repo: Arc<R>, cache: PostCache) -> Self {
        Self { repo, cache }
    }

    #[instrument(skip(self))]
    pub async fn get_post(&self, id: Uuid) -> Result<Post, DomainError> {
        if let Some(post) = self.cache.get_post(id).await {
            return Ok(post);
        }

        let post = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or(DomainError::PostNotFound(id))?;

        if let Err(e) = self.cache.put_post(&post).await {
            warn!(post_id = %id, error = %e, "failed to repopulate post cache");
        }
        Ok(post)
    }

    #[instrument(skip(self))]
    pub async fn get_posts(&self) -> Result<Vec<Post>, DomainError> {
        if let Some(posts) = self.cache.get_posts().await {
            return Ok(posts);
        }

        let posts = self.repo.list().await?;

        if let Err(e) = self.cache.put_posts(&posts).await {
            warn!(error = %e, "failed to repopulate post listing cache");
        }
        Ok(posts)
    }

    /// Creates a post. A failed cache write degrades the call to a logged
    /// warning; the post is returned either way.
    #[instrument(skip(self, content))]
    pub async fn create_post(
        &self,
        author_id: Uuid,
        content: String,
        photo_url: Option<String>,
    ) -> Result<Post, DomainError> {
        let post = self
            .repo
            .create(Post::new(author_id, content, photo_url))
            .await?;

        if let Err(e) = self.cache.put_post(&post).await {
            warn!(post_id = %post.id, error = %e, "post created but not cached");
        }
        self.invalidate_listing().await;
        Ok(post)
    }

    #[instrument(skip(self, patch))]
    pub async fn update_post(
        &self,
        post_id: Uuid,
        actor_id: Uuid,
        patch: PostPatch,
    ) -> Result<Post, DomainError> {
        let current = self.resolve(post_id).await?;
        authorize(current.author_id, actor_id)?;

        let post = self
            .repo
            .update(post_id, &patch)
            .await?
            .ok_or(DomainError::PostNotFound(post_id))?;

        if let Err(e) = self.cache.put_post(&post).await {
            warn!(post_id = %post_id, error = %e, "post updated but cache not refreshed");
        }
        self.invalidate_listing().await;
        Ok(post)
    }

    #[instrument(skip(self))]
    pub async fn delete_post(&self, post_id: Uuid, actor_id: Uuid) -> Result<(), DomainError> {
        let current = self.resolve(post_id).await?;
        authorize(current.author_id, actor_id)?;

        if !self.repo.delete(post_id).await? {
            return Err(DomainError::PostNotFound(post_id));
        }

        if let Err(e) = self.cache.evict_post(post_id).await {
            warn!(post_id = %post_id, error = %e, "post deleted but cache entry not evicted");
        }
        Ok(())
    }

    /// Current value for an ownership check: cache first, store on miss.
    /// `author_id` never changes, so a stale cached copy is still good enough.
    async fn resolve(&self, post_id: Uuid) -> Result<Post, DomainError> {
        if let Some(post) = self.cache.get_post(post_id).await {
            return Ok(post);
        }
        self.repo
            .find_by_id(post_id)
            .await?
            .ok_or(DomainError::PostNotFound(post_id))
    }

    async fn invalidate_listing(&self) {
        if let Err(e) = self.cache.invalidate_list().await {
            warn!(error = %e, "failed to invalidate post listing cache");
        }
    }
}
