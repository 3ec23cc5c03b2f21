use actix_web::{web, HttpResponse, Responder};

use crate::models::HealthResponse;
use crate::state::AppState;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check));
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let pg_healthy = state.db.health_check().await.unwrap_or(false);
    let cache = state.cache.stats();

    let status = if pg_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: pg_healthy,
        cache_entries: cache.l1_size,
        redis_enabled: cache.redis_enabled,
        connected_users: state.hub.connected_users(),
        timestamp: chrono::Utc::now(),
    })
}
