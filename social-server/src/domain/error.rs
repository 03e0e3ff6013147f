use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::like::LikeTarget;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("user not found: {0}")]
    UserNotFound(Uuid),
    #[error("user already exists: {0}")]
    UserAlreadyExists(String),
    #[error("post not found: {0}")]
    PostNotFound(Uuid),
    #[error("comment not found: {0}")]
    CommentNotFound(Uuid),
    #[error("access denied")]
    AccessDenied,
    #[error("already liked: {0}")]
    AlreadyLiked(LikeTarget),
    #[error("not liked: {0}")]
    NotLiked(LikeTarget),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("unauthorized")]
    Unauthorized,
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("service unavailable: {0}")]
    Unavailable(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl DomainError {
    /// Stable, caller-visible name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            DomainError::UserNotFound(_)
            | DomainError::PostNotFound(_)
            | DomainError::CommentNotFound(_) => "not_found",
            DomainError::AccessDenied => "access_denied",
            DomainError::AlreadyLiked(_) => "already_liked",
            DomainError::NotLiked(_) => "not_liked",
            DomainError::UserAlreadyExists(_) | DomainError::Conflict(_) => "conflict",
            DomainError::Unauthorized => "unauthorized",
            DomainError::Validation(_) => "validation",
            DomainError::Unavailable(_) => "unavailable",
            DomainError::Internal(_) => "internal",
        }
    }

    /// Not-found error for the entity a like points at.
    pub fn target_not_found(target: LikeTarget) -> Self {
        match target {
            LikeTarget::Post(id) => DomainError::PostNotFound(id),
            LikeTarget::Comment(id) => DomainError::CommentNotFound(id),
        }
    }
}

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                DomainError::Unavailable(err.to_string())
            }
            // 57014 = query_canceled, raised when statement_timeout fires
            sqlx::Error::Database(ref db) if db.code().as_deref() == Some("57014") => {
                DomainError::Unavailable(err.to_string())
            }
            other => DomainError::Internal(format!("database error: {}", other)),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl ResponseError for DomainError {
    fn status_code(&self) -> StatusCode {
        match self {
            DomainError::UserNotFound(_)
            | DomainError::PostNotFound(_)
            | DomainError::CommentNotFound(_) => StatusCode::NOT_FOUND,
            DomainError::Unauthorized => StatusCode::UNAUTHORIZED,
            DomainError::AccessDenied => StatusCode::FORBIDDEN,
            DomainError::UserAlreadyExists(_)
            | DomainError::AlreadyLiked(_)
            | DomainError::NotLiked(_)
            | DomainError::Conflict(_) => StatusCode::CONFLICT,
            DomainError::Validation(_) => StatusCode::BAD_REQUEST,
            DomainError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            DomainError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let details = match self {
            DomainError::PostNotFound(id) => Some(json!({ "resource": "post", "id": id })),
            DomainError::CommentNotFound(id) => Some(json!({ "resource": "comment", "id": id })),
            DomainError::UserNotFound(id) => Some(json!({ "resource": "user", "id": id })),
            DomainError::AlreadyLiked(target) | DomainError::NotLiked(target) => {
                Some(json!({ "target": target.kind(), "id": target.id() }))
            }
            DomainError::AccessDenied => {
                Some(json!({ "message": "only the author may modify this resource" }))
            }
            DomainError::Validation(msg) => Some(json!({ "message": msg })),
            _ => None,
        };
        let body = ErrorBody {
            error: self.kind(),
            details,
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}
