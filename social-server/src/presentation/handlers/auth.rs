use crate::domain::error::DomainError;
use crate::infrastructure::security::ACCESS_TOKEN_TTL_HOURS;
use crate::presentation::dto::{AuthResponse, LoginRequest, RegisterRequest};
use crate::presentation::handlers::Auth;
use actix_web::{HttpResponse, Responder, Scope, post, web};
use tracing::info;

pub fn scope() -> Scope {
    web::scope("/auth").service(register).service(login)
}

fn bearer(access_token: String) -> AuthResponse {
    AuthResponse {
        access_token,
        expires_in: ACCESS_TOKEN_TTL_HOURS * 3600,
        token_type: "Bearer".to_string(),
    }
}

#[post("/register")]
async fn register(
    service: web::Data<Auth>,
    payload: web::Json<RegisterRequest>,
) -> Result<impl Responder, DomainError> {
    payload.validate()?;
    let user = service
        .register(
            &payload.first_name,
            &payload.last_name,
            &payload.email,
            &payload.password,
        )
        .await?;
    let jwt = service.login(&user.email, &payload.password).await?;

    info!(user_id = %user.id, "user registered and logged in");
    Ok(HttpResponse::Created().json(bearer(jwt)))
}

#[post("/login")]
async fn login(
    service: web::Data<Auth>,
    payload: web::Json<LoginRequest>,
) -> Result<impl Responder, DomainError> {
    let jwt = service.login(&payload.email, &payload.password).await?;
    Ok(HttpResponse::Ok().json(bearer(jwt)))
}
