use crate::domain::error::DomainError;
use crate::domain::like::LikeTarget;
use crate::presentation::dto::LikeStatusResponse;
use crate::presentation::handlers::Likes;
use crate::presentation::utils::AuthenticatedUser;
use actix_web::{HttpResponse, delete, get, post, web};
use uuid::Uuid;

#[post("/posts/{id}/like")]
async fn like_post(
    user: AuthenticatedUser,
    likes: web::Data<Likes>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, DomainError> {
    likes.like(LikeTarget::Post(path.into_inner()), user.id).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[delete("/posts/{id}/like")]
async fn unlike_post(
    user: AuthenticatedUser,
    likes: web::Data<Likes>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, DomainError> {
    likes
        .unlike(LikeTarget::Post(path.into_inner()), user.id)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

#[get("/posts/{id}/like")]
async fn post_like_status(
    user: AuthenticatedUser,
    likes: web::Data<Likes>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, DomainError> {
    let liked = likes
        .is_liked(LikeTarget::Post(path.into_inner()), user.id)
        .await?;
    Ok(HttpResponse::Ok().json(LikeStatusResponse { liked }))
}

#[post("/comments/{id}/like")]
async fn like_comment(
    user: AuthenticatedUser,
    likes: web::Data<Likes>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, DomainError> {
    likes
        .like(LikeTarget::Comment(path.into_inner()), user.id)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

#[delete("/comments/{id}/like")]
async fn unlike_comment(
    user: AuthenticatedUser,
    likes: web::Data<Likes>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, DomainError> {
    likes
        .unlike(LikeTarget::Comment(path.into_inner()), user.id)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}
