use crate::data::{foreign_key_violation, unique_violation};
use crate::domain::error::DomainError;
use crate::domain::like::LikeTarget;
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, error};
use uuid::Uuid;

#[async_trait]
pub trait LikeRepository: Send + Sync {
    /// Inserts the like row. The store's primary key decides whether the
    /// user already liked the target.
    async fn insert(&self, target: LikeTarget, user_id: Uuid) -> Result<(), DomainError>;
    /// `false` when there was no like to remove.
    async fn remove(&self, target: LikeTarget, user_id: Uuid) -> Result<bool, DomainError>;
    async fn exists(&self, target: LikeTarget, user_id: Uuid) -> Result<bool, DomainError>;
}

#[derive(Clone)]
pub struct PostgresLikeRepository {
    pool: PgPool,
}

impl PostgresLikeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const INSERT_POST_LIKE: &str = "INSERT INTO post_likes (post_id, user_id) VALUES ($1, $2)";
const INSERT_COMMENT_LIKE: &str =
    "INSERT INTO comment_likes (comment_id, user_id) VALUES ($1, $2)";
const DELETE_POST_LIKE: &str = "DELETE FROM post_likes WHERE post_id = $1 AND user_id = $2";
const DELETE_COMMENT_LIKE: &str =
    "DELETE FROM comment_likes WHERE comment_id = $1 AND user_id = $2";
const EXISTS_POST_LIKE: &str =
    "SELECT EXISTS(SELECT 1 FROM post_likes WHERE post_id = $1 AND user_id = $2)";
const EXISTS_COMMENT_LIKE: &str =
    "SELECT EXISTS(SELECT 1 FROM comment_likes WHERE comment_id = $1 AND user_id = $2)";

#[async_trait]
impl LikeRepository for PostgresLikeRepository {
    async fn insert(&self, target: LikeTarget, user_id: Uuid) -> Result<(), DomainError> {
        let sql = match target {
            LikeTarget::Post(_) => INSERT_POST_LIKE,
            LikeTarget::Comment(_) => INSERT_COMMENT_LIKE,
        };

        sqlx::query(sql)
            .bind(target.id())
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if unique_violation(&e).is_some() {
                    debug!(%target, %user_id, "like rejected by uniqueness constraint");
                    return DomainError::AlreadyLiked(target);
                }
                match foreign_key_violation(&e) {
                    Some(constraint) if constraint.contains("user_id") => {
                        DomainError::UserNotFound(user_id)
                    }
                    Some(_) => DomainError::target_not_found(target),
                    None => {
                        error!("failed to like {}: {}", target, e);
                        DomainError::from(e)
                    }
                }
            })?;
        Ok(())
    }

    async fn remove(&self, target: LikeTarget, user_id: Uuid) -> Result<bool, DomainError> {
        let sql = match target {
            LikeTarget::Post(_) => DELETE_POST_LIKE,
            LikeTarget::Comment(_) => DELETE_COMMENT_LIKE,
        };

        let removed = sqlx::query(sql)
            .bind(target.id())
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("failed to unlike {}: {}", target, e);
                DomainError::from(e)
            })?;
        Ok(removed.rows_affected() > 0)
    }

    async fn exists(&self, target: LikeTarget, user_id: Uuid) -> Result<bool, DomainError> {
        let sql = match target {
            LikeTarget::Post(_) => EXISTS_POST_LIKE,
            LikeTarget::Comment(_) => EXISTS_COMMENT_LIKE,
        };

        sqlx::query_scalar(sql)
            .bind(target.id())
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("failed to check like on {}: {}", target, e);
                DomainError::from(e)
            })
    }
}
