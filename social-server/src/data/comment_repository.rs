use crate::data::{foreign_key_violation, unique_violation};
use crate::domain::comment::Comment;
use crate::domain::error::DomainError;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tracing::{error, info};
use uuid::Uuid;

#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn create(&self, comment: Comment) -> Result<Comment, DomainError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Comment>, DomainError>;
    /// Every comment of a post, flat, oldest first.
    async fn list_by_post(&self, post_id: Uuid) -> Result<Vec<Comment>, DomainError>;
    async fn update_content(
        &self,
        id: Uuid,
        content: String,
    ) -> Result<Option<Comment>, DomainError>;
    /// Removes the comment and, through the cascade, its replies.
    async fn delete(&self, id: Uuid) -> Result<bool, DomainError>;
}

#[derive(Clone)]
pub struct PostgresCommentRepository {
    pool: PgPool,
}

impl PostgresCommentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CommentRepository for PostgresCommentRepository {
    async fn create(&self, comment: Comment) -> Result<Comment, DomainError> {
        sqlx::query(
            r#"
            INSERT INTO comments
                (id, post_id, author_id, parent_comment_id, content, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(comment.id)
        .bind(comment.post_id)
        .bind(comment.author_id)
        .bind(comment.parent_comment_id)
        .bind(&comment.content)
        .bind(comment.created_at)
        .bind(comment.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match foreign_key_violation(&e).as_deref() {
            Some("comments_post_id_fkey") => DomainError::PostNotFound(comment.post_id),
            // also raised when the parent exists but lives on another post
            Some("comments_parent_comment_id_fkey") => {
                DomainError::CommentNotFound(comment.parent_comment_id.unwrap_or_default())
            }
            Some(_) => DomainError::UserNotFound(comment.author_id),
            None => match unique_violation(&e) {
                Some(constraint) => DomainError::Conflict(constraint),
                None => {
                    error!("failed to create comment: {}", e);
                    DomainError::from(e)
                }
            },
        })?;

        info!(
            comment_id = %comment.id,
            post_id = %comment.post_id,
            parent_comment_id = ?comment.parent_comment_id,
            "comment created"
        );
        Ok(comment)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Comment>, DomainError> {
        sqlx::query_as::<_, Comment>(
            r#"
            SELECT c.id, c.post_id, c.author_id, c.parent_comment_id, c.content,
                   (SELECT COUNT(*) FROM comment_likes l WHERE l.comment_id = c.id) AS like_count,
                   c.created_at, c.updated_at
            FROM comments c
            WHERE c.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("db error find comment {}: {}", id, e);
            DomainError::from(e)
        })
    }

    async fn list_by_post(&self, post_id: Uuid) -> Result<Vec<Comment>, DomainError> {
        sqlx::query_as::<_, Comment>(
            r#"
            SELECT c.id, c.post_id, c.author_id, c.parent_comment_id, c.content,
                   COUNT(l.user_id) AS like_count,
                   c.created_at, c.updated_at
            FROM comments c
            LEFT JOIN comment_likes l ON l.comment_id = c.id
            WHERE c.post_id = $1
            GROUP BY c.id
            ORDER BY c.created_at, c.id
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("db error listing comments of post {}: {}", post_id, e);
            DomainError::from(e)
        })
    }

    async fn update_content(
        &self,
        id: Uuid,
        content: String,
    ) -> Result<Option<Comment>, DomainError> {
        let comment = sqlx::query_as::<_, Comment>(
            r#"
            UPDATE comments c
            SET content = $1,
                updated_at = GREATEST(c.updated_at, $2)
            WHERE c.id = $3
            RETURNING c.id, c.post_id, c.author_id, c.parent_comment_id, c.content,
                      (SELECT COUNT(*) FROM comment_likes l WHERE l.comment_id = c.id) AS like_count,
                      c.created_at, c.updated_at
            "#,
        )
        .bind(content)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("failed to update comment {}: {}", id, e);
            DomainError::from(e)
        })?;

        if comment.is_some() {
            info!(comment_id = %id, "comment updated");
        }
        Ok(comment)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        let deleted = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("failed to delete comment {}: {}", id, e);
                DomainError::from(e)
            })?;

        if deleted.rows_affected() == 0 {
            return Ok(false);
        }

        info!(comment_id = %id, "comment deleted");
        Ok(true)
    }
}
