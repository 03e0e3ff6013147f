use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::error::DomainError;
use crate::domain::post::PostPatch;
use crate::domain::user::UserPatch;

const MIN_CONTENT_CHARS: usize = 3;
const MIN_NAME_CHARS: usize = 2;
const MIN_PASSWORD_CHARS: usize = 6;

fn validate_content(content: &str) -> Result<(), DomainError> {
    if content.trim().chars().count() < MIN_CONTENT_CHARS {
        return Err(DomainError::Validation(format!(
            "content must be at least {MIN_CONTENT_CHARS} characters"
        )));
    }
    Ok(())
}

fn validate_url(field: &str, url: &str) -> Result<(), DomainError> {
    if !(url.starts_with("https://") || url.starts_with("http://")) {
        return Err(DomainError::Validation(format!(
            "{field} must be an http(s) URL"
        )));
    }
    Ok(())
}

fn validate_name(field: &str, name: &str) -> Result<(), DomainError> {
    if name.trim().chars().count() < MIN_NAME_CHARS {
        return Err(DomainError::Validation(format!(
            "{field} must be at least {MIN_NAME_CHARS} characters"
        )));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), DomainError> {
    if !email.contains('@') {
        return Err(DomainError::Validation("invalid email".to_string()));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), DomainError> {
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(DomainError::Validation(format!(
            "password must be at least {MIN_PASSWORD_CHARS} characters"
        )));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<(), DomainError> {
        validate_name("first_name", &self.first_name)?;
        validate_name("last_name", &self.last_name)?;
        validate_email(&self.email)?;
        validate_password(&self.password)
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub expires_in: i64,
    pub token_type: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    /// `YYYY-MM-DD`
    pub date_of_birth: Option<NaiveDate>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
}

impl UpdateUserRequest {
    /// Validated profile patch plus the new plain-text password, if any.
    pub fn into_patch(self) -> Result<(UserPatch, Option<String>), DomainError> {
        if let Some(name) = &self.first_name {
            validate_name("first_name", name)?;
        }
        if let Some(name) = &self.last_name {
            validate_name("last_name", name)?;
        }
        if let Some(email) = &self.email {
            validate_email(email)?;
        }
        if let Some(password) = &self.password {
            validate_password(password)?;
        }
        if let Some(url) = &self.avatar_url {
            validate_url("avatar_url", url)?;
        }
        let patch = UserPatch {
            first_name: self.first_name.map(|n| n.trim().to_string()),
            last_name: self.last_name.map(|n| n.trim().to_string()),
            email: self.email,
            password_hash: None,
            date_of_birth: self.date_of_birth,
            bio: self.bio,
            avatar_url: self.avatar_url,
        };
        Ok((patch, self.password))
    }
}

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub content: String,
    #[serde(default)]
    pub photo_url: Option<String>,
}

impl CreatePostRequest {
    pub fn validate(&self) -> Result<(), DomainError> {
        validate_content(&self.content)?;
        if let Some(url) = &self.photo_url {
            validate_url("photo_url", url)?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdatePostRequest {
    pub content: Option<String>,
    pub photo_url: Option<String>,
}

impl UpdatePostRequest {
    pub fn into_patch(self) -> Result<PostPatch, DomainError> {
        if let Some(content) = &self.content {
            validate_content(content)?;
        }
        if let Some(url) = &self.photo_url {
            validate_url("photo_url", url)?;
        }
        Ok(PostPatch {
            content: self.content,
            photo_url: self.photo_url,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub content: String,
    #[serde(default)]
    pub parent_comment_id: Option<Uuid>,
}

impl CreateCommentRequest {
    pub fn validate(&self) -> Result<(), DomainError> {
        validate_content(&self.content)
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateCommentRequest {
    pub content: String,
}

impl UpdateCommentRequest {
    pub fn validate(&self) -> Result<(), DomainError> {
        validate_content(&self.content)
    }
}

#[derive(Debug, Serialize)]
pub struct LikeStatusResponse {
    pub liked: bool,
}
