use std::sync::Arc;

use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::application::post_cache::PostCache;
use crate::data::user_repository::UserRepository;
use crate::domain::error::DomainError;
use crate::domain::user::{User, UserPatch};
use crate::infrastructure::security::hash_password;

/// Profile reads and changes to the caller's own account.
#[derive(Clone)]
pub struct UserService<R: UserRepository + 'static> {
    repo: Arc<R>,
    cache: PostCache,
}

impl<R> UserService<R>
where
    R: UserRepository + 'static,
{
    pub fn new(repo: Arc<R>, cache: PostCache) -> Self {
        Self { repo, cache }
    }

    pub async fn get_user(&self, id: Uuid) -> Result<User, DomainError> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or(DomainError::UserNotFound(id))
    }

    #[instrument(skip(self, patch, new_password))]
    pub async fn update_user(
        &self,
        id: Uuid,
        mut patch: UserPatch,
        new_password: Option<String>,
    ) -> Result<User, DomainError> {
        patch.email = patch.email.map(|email| email.trim().to_lowercase());
        if let Some(password) = new_password {
            let hash =
                hash_password(&password).map_err(|err| DomainError::Internal(err.to_string()))?;
            patch.password_hash = Some(hash);
        }

        self.repo
            .update(id, &patch)
            .await?
            .ok_or(DomainError::UserNotFound(id))
    }

    /// Deletes the account with its posts, comments and likes, and evicts the
    /// removed posts from the cache.
    #[instrument(skip(self))]
    pub async fn delete_user(&self, id: Uuid) -> Result<(), DomainError> {
        let post_ids = self
            .repo
            .delete(id)
            .await?
            .ok_or(DomainError::UserNotFound(id))?;

        info!(user_id = %id, posts = post_ids.len(), "account deleted");
        if let Err(e) = self.cache.evict_posts(&post_ids).await {
            warn!(user_id = %id, error = %e, "account deleted but cached posts not evicted");
        }
        Ok(())
    }
}
