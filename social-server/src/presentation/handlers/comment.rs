use crate::domain::comment::thread_to_json;
use crate::domain::error::DomainError;
use crate::presentation::dto::{CreateCommentRequest, UpdateCommentRequest};
use crate::presentation::handlers::Comments;
use crate::presentation::utils::{AuthenticatedUser, request_id};
use actix_web::http::header::ContentType;
use actix_web::{HttpRequest, HttpResponse, delete, get, post, put, web};
use tracing::info;
use uuid::Uuid;

#[get("/posts/{id}/comments")]
async fn get_thread(
    comments: web::Data<Comments>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, DomainError> {
    let thread = comments.get_thread(path.into_inner()).await?;
    let body = thread_to_json(&thread)
        .map_err(|e| DomainError::Internal(format!("failed to render thread: {e}")))?;
    Ok(HttpResponse::Ok()
        .content_type(ContentType::json())
        .body(body))
}

#[post("/posts/{id}/comments")]
async fn create_comment(
    req: HttpRequest,
    user: AuthenticatedUser,
    comments: web::Data<Comments>,
    payload: web::Json<CreateCommentRequest>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, DomainError> {
    payload.validate()?;
    let post_id = path.into_inner();
    let CreateCommentRequest {
        content,
        parent_comment_id,
    } = payload.into_inner();
    let comment = comments
        .create_comment(post_id, user.id, parent_comment_id, content)
        .await?;

    info!(
        request_id = %request_id(&req),
        user_id = %user.id,
        comment_id = %comment.id,
        "comment created"
    );

    Ok(HttpResponse::Created().json(comment))
}

#[get("/comments/{id}")]
async fn get_comment(
    comments: web::Data<Comments>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, DomainError> {
    let comment = comments.get_comment(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(comment))
}

#[put("/comments/{id}")]
async fn update_comment(
    user: AuthenticatedUser,
    comments: web::Data<Comments>,
    payload: web::Json<UpdateCommentRequest>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, DomainError> {
    payload.validate()?;
    let comment = comments
        .update_comment(path.into_inner(), user.id, payload.into_inner().content)
        .await?;
    Ok(HttpResponse::Ok().json(comment))
}

#[delete("/comments/{id}")]
async fn delete_comment(
    req: HttpRequest,
    user: AuthenticatedUser,
    comments: web::Data<Comments>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, DomainError> {
    let comment_id = path.into_inner();
    comments.delete_comment(comment_id, user.id).await?;

    info!(
        request_id = %request_id(&req),
        user_id = %user.id,
        comment_id = %comment_id,
        "comment deleted"
    );

    Ok(HttpResponse::NoContent().finish())
}
