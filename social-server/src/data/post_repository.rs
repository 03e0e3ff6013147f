use crate::data::{foreign_key_violation, unique_violation};
use crate::domain::error::DomainError;
use crate::domain::post::{Post, PostPatch};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tracing::{error, info};
use uuid::Uuid;

#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn create(&self, post: Post) -> Result<Post, DomainError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, DomainError>;
    async fn exists(&self, id: Uuid) -> Result<bool, DomainError>;
    async fn list(&self) -> Result<Vec<Post>, DomainError>;
    /// Writes the fields present in `patch`; `None` when the row is gone.
    async fn update(&self, id: Uuid, patch: &PostPatch) -> Result<Option<Post>, DomainError>;
    /// `false` when no row was deleted.
    async fn delete(&self, id: Uuid) -> Result<bool, DomainError>;
}

#[derive(Clone)]
pub struct PostgresPostRepository {
    pool: PgPool,
}

impl PostgresPostRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PostRepository for PostgresPostRepository {
    async fn create(&self, post: Post) -> Result<Post, DomainError> {
        sqlx::query(
            r#"
            INSERT INTO posts (id, author_id, content, photo_url, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(post.id)
        .bind(post.author_id)
        .bind(&post.content)
        .bind(&post.photo_url)
        .bind(post.created_at)
        .bind(post.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if foreign_key_violation(&e).is_some() {
                return DomainError::UserNotFound(post.author_id);
            }
            if let Some(constraint) = unique_violation(&e) {
                return DomainError::Conflict(constraint);
            }
            error!("failed to create post: {}", e);
            DomainError::from(e)
        })?;

        info!(post_id = %post.id, author_id = %post.author_id, "post created");
        Ok(post)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, DomainError> {
        sqlx::query_as::<_, Post>(
            r#"
            SELECT p.id, p.author_id, p.content, p.photo_url,
                   (SELECT COUNT(*) FROM post_likes l WHERE l.post_id = p.id) AS like_count,
                   p.created_at, p.updated_at
            FROM posts p
            WHERE p.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("db error find_by_id {}: {}", id, e);
            DomainError::from(e)
        })
    }

    async fn exists(&self, id: Uuid) -> Result<bool, DomainError> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM posts WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("db error checking post {}: {}", id, e);
                DomainError::from(e)
            })
    }

    async fn list(&self) -> Result<Vec<Post>, DomainError> {
        sqlx::query_as::<_, Post>(
            r#"
            SELECT p.id, p.author_id, p.content, p.photo_url,
                   (SELECT COUNT(*) FROM post_likes l WHERE l.post_id = p.id) AS like_count,
                   p.created_at, p.updated_at
            FROM posts p
            ORDER BY p.created_at DESC, p.id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("db error while fetching posts: {}", e);
            DomainError::from(e)
        })
    }

    async fn update(&self, id: Uuid, patch: &PostPatch) -> Result<Option<Post>, DomainError> {
        let updated = sqlx::query_as::<_, Post>(
            r#"
            UPDATE posts p
            SET content = COALESCE($1, p.content),
                photo_url = COALESCE($2, p.photo_url),
                updated_at = GREATEST(p.updated_at, $3)
            WHERE p.id = $4
            RETURNING p.id, p.author_id, p.content, p.photo_url,
                      (SELECT COUNT(*) FROM post_likes l WHERE l.post_id = p.id) AS like_count,
                      p.created_at, p.updated_at
            "#,
        )
        .bind(&patch.content)
        .bind(&patch.photo_url)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("failed to update post {}: {}", id, e);
            DomainError::from(e)
        })?;

        if updated.is_some() {
            info!(post_id = %id, "post updated");
        }

        Ok(updated)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        let deleted = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("failed to delete post {}: {}", id, e);
                DomainError::from(e)
            })?;

        if deleted.rows_affected() == 0 {
            return Ok(false);
        }

        info!(post_id = %id, "post deleted");
        Ok(true)
    }
}
