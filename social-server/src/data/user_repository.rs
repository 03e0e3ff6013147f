use crate::data::unique_violation;
use crate::domain::error::DomainError;
use crate::domain::user::{User, UserPatch};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tracing::{error, info};
use uuid::Uuid;

const USER_COLUMNS: &str = "id, first_name, last_name, email, password_hash, date_of_birth, bio, \
                            avatar_url, created_at, updated_at";

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: User) -> Result<User, DomainError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DomainError>;
    /// Writes the fields present in `patch`; `None` when the row is gone.
    async fn update(&self, id: Uuid, patch: &UserPatch) -> Result<Option<User>, DomainError>;
    /// Deletes the user and everything cascading from it. Returns the ids of
    /// the posts removed along with the user, `None` when there was no user.
    async fn delete(&self, id: Uuid) -> Result<Option<Vec<Uuid>>, DomainError>;
}

#[derive(Clone)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn email_taken(e: &sqlx::Error) -> bool {
    unique_violation(e).is_some_and(|c| c.contains("users_email"))
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn create(&self, user: User) -> Result<User, DomainError> {
        sqlx::query(
            r#"
            INSERT INTO users
                (id, first_name, last_name, email, password_hash, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(user.id)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if email_taken(&e) {
                DomainError::UserAlreadyExists("email already registered".to_string())
            } else {
                error!("failed to create user: {}", e);
                DomainError::from(e)
            }
        })?;

        info!(user_id = %user.id, "user created");
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!("failed to find user by email: {}", e);
                DomainError::from(e)
            })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DomainError> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!("failed to find user {}: {}", id, e);
                DomainError::from(e)
            })
    }

    async fn update(&self, id: Uuid, patch: &UserPatch) -> Result<Option<User>, DomainError> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users u
            SET first_name = COALESCE($1, u.first_name),
                last_name = COALESCE($2, u.last_name),
                email = COALESCE($3, u.email),
                password_hash = COALESCE($4, u.password_hash),
                date_of_birth = COALESCE($5, u.date_of_birth),
                bio = COALESCE($6, u.bio),
                avatar_url = COALESCE($7, u.avatar_url),
                updated_at = GREATEST(u.updated_at, $8)
            WHERE u.id = $9
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&patch.first_name)
        .bind(&patch.last_name)
        .bind(&patch.email)
        .bind(&patch.password_hash)
        .bind(patch.date_of_birth)
        .bind(&patch.bio)
        .bind(&patch.avatar_url)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            if email_taken(&e) {
                DomainError::UserAlreadyExists("email already registered".to_string())
            } else {
                error!("failed to update user {}: {}", id, e);
                DomainError::from(e)
            }
        })?;

        if user.is_some() {
            info!(user_id = %id, "user updated");
        }
        Ok(user)
    }

    async fn delete(&self, id: Uuid) -> Result<Option<Vec<Uuid>>, DomainError> {
        let mut tx = self.pool.begin().await?;

        // Locking the user row holds off concurrent post inserts, whose
        // foreign-key check needs a share lock on it.
        let locked: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM users WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            return Ok(None);
        }

        let post_ids: Vec<Uuid> = sqlx::query_scalar("SELECT id FROM posts WHERE author_id = $1")
            .bind(id)
            .fetch_all(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                error!("failed to delete user {}: {}", id, e);
                DomainError::from(e)
            })?;
        tx.commit().await?;

        info!(user_id = %id, posts = post_ids.len(), "user deleted");
        Ok(Some(post_ids))
    }
}
