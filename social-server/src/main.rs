mod application;
mod data;
mod domain;
mod infrastructure;
mod presentation;
#[cfg(test)]
mod testing;

use std::sync::Arc;

use crate::application::auth_service::AuthService;
use crate::application::comment_service::CommentService;
use crate::application::like_service::LikeService;
use crate::application::post_cache::PostCache;
use crate::application::post_service::PostService;
use crate::application::user_service::UserService;
use crate::data::comment_repository::PostgresCommentRepository;
use crate::data::like_repository::PostgresLikeRepository;
use crate::data::post_repository::PostgresPostRepository;
use crate::data::user_repository::PostgresUserRepository;
use crate::infrastructure::cache::{Cache, NoopCache, RedisCache};
use actix_cors::Cors;
use actix_web::middleware::DefaultHeaders;
use actix_web::{App, HttpResponse, HttpServer, Responder, web};
use chrono::{DateTime, Utc};
use infrastructure::config::AppConfig;
use infrastructure::database::{create_pool, run_migrations};
use infrastructure::logging::init_logging;
use infrastructure::security::JwtKeys;
use presentation::handlers;
use presentation::middleware::RequestTracing;
use serde::Serialize;
use tracing::{info, warn};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let config = AppConfig::from_env()?;
    let pool = create_pool(&config.database_url, config.db_statement_timeout).await?;
    run_migrations(&pool).await?;

    let cache = connect_cache(&config).await;
    let post_cache = PostCache::new(cache, config.cache_ttl, config.cache_timeout);

    let user_repo = Arc::new(PostgresUserRepository::new(pool.clone()));
    let post_repo = Arc::new(PostgresPostRepository::new(pool.clone()));
    let comment_repo = Arc::new(PostgresCommentRepository::new(pool.clone()));
    let like_repo = Arc::new(PostgresLikeRepository::new(pool.clone()));

    let keys = JwtKeys::new(&config.jwt_secret);
    let auth_service = AuthService::new(Arc::clone(&user_repo), keys.clone());
    let user_service = UserService::new(Arc::clone(&user_repo), post_cache.clone());
    let post_service = PostService::new(Arc::clone(&post_repo), post_cache.clone());
    let comment_service = CommentService::new(Arc::clone(&comment_repo), Arc::clone(&post_repo));
    let like_service = LikeService::new(Arc::clone(&like_repo), post_cache);

    let config_data = config.clone();
    info!(host = %config.host, port = config.port, "HTTP server starting");

    HttpServer::new(move || {
        let cors = build_cors(&config_data);
        App::new()
            .wrap(RequestTracing)
            .wrap(
                DefaultHeaders::new()
                    .add(("X-Content-Type-Options", "nosniff"))
                    .add(("Referrer-Policy", "no-referrer")),
            )
            .wrap(cors)
            .app_data(web::Data::new(keys.clone()))
            .app_data(web::Data::new(auth_service.clone()))
            .app_data(web::Data::new(user_service.clone()))
            .app_data(web::Data::new(post_service.clone()))
            .app_data(web::Data::new(comment_service.clone()))
            .app_data(web::Data::new(like_service.clone()))
            .service(
                web::scope("/api")
                    .route("/health", web::get().to(health))
                    .service(handlers::auth::scope())
                    .service(handlers::user::get_user)
                    .service(handlers::user::update_user)
                    .service(handlers::user::delete_user)
                    .service(handlers::post::get_posts)
                    .service(handlers::post::get_post)
                    .service(handlers::post::create_post)
                    .service(handlers::post::update_post)
                    .service(handlers::post::delete_post)
                    .service(handlers::comment::get_thread)
                    .service(handlers::comment::create_comment)
                    .service(handlers::comment::get_comment)
                    .service(handlers::comment::update_comment)
                    .service(handlers::comment::delete_comment)
                    .service(handlers::like::like_post)
                    .service(handlers::like::unlike_post)
                    .service(handlers::like::post_like_status)
                    .service(handlers::like::like_comment)
                    .service(handlers::like::unlike_comment),
            )
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await?;

    Ok(())
}

/// Redis when configured and reachable, otherwise a cache that always misses.
async fn connect_cache(config: &AppConfig) -> Arc<dyn Cache> {
    let Some(url) = config.redis_url.as_deref() else {
        warn!("REDIS_URL not set, post cache disabled");
        return Arc::new(NoopCache);
    };
    match RedisCache::connect(url, config.cache_timeout).await {
        Ok(cache) => Arc::new(cache),
        Err(e) => {
            warn!(error = %e, "Redis unavailable, post cache disabled");
            Arc::new(NoopCache)
        }
    }
}

fn build_cors(config: &AppConfig) -> Cors {
    let mut cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE"])
        .allowed_headers(vec![
            actix_web::http::header::CONTENT_TYPE,
            actix_web::http::header::AUTHORIZATION,
        ])
        .max_age(3600);

    for origin in &config.cors_origins {
        if origin == "*" {
            cors = cors.allow_any_origin();
        } else {
            cors = cors.allowed_origin(origin);
        }
    }

    cors
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: DateTime<Utc>,
}

async fn health() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok",
        timestamp: Utc::now(),
    })
}
