use crate::domain::error::DomainError;
use crate::presentation::dto::UpdateUserRequest;
use crate::presentation::handlers::Users;
use crate::presentation::utils::{AuthenticatedUser, request_id};
use actix_web::{HttpRequest, HttpResponse, delete, get, patch, web};
use tracing::info;
use uuid::Uuid;

#[get("/users/{id}")]
async fn get_user(
    users: web::Data<Users>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, DomainError> {
    let user = users.get_user(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(user))
}

#[patch("/users")]
async fn update_user(
    req: HttpRequest,
    user: AuthenticatedUser,
    users: web::Data<Users>,
    payload: web::Json<UpdateUserRequest>,
) -> Result<HttpResponse, DomainError> {
    let (patch, new_password) = payload.into_inner().into_patch()?;
    let updated = users.update_user(user.id, patch, new_password).await?;

    info!(
        request_id = %request_id(&req),
        user_id = %user.id,
        "profile updated"
    );

    Ok(HttpResponse::Ok().json(updated))
}

#[delete("/users")]
async fn delete_user(
    req: HttpRequest,
    user: AuthenticatedUser,
    users: web::Data<Users>,
) -> Result<HttpResponse, DomainError> {
    users.delete_user(user.id).await?;

    info!(
        request_id = %request_id(&req),
        user_id = %user.id,
        "account deleted"
    );

    Ok(HttpResponse::NoContent().finish())
}
