// Route exports
pub mod auth;
pub mod conversations;
pub mod discover;
pub mod groups;
pub mod health;
pub mod journals;
pub mod marketplace;
pub mod matches;
pub mod swipes;
pub mod users;
pub mod ws;

use actix_web::web;
use uuid::Uuid;

use crate::state::AppState;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(health::configure)
            .configure(auth::configure)
            .configure(users::configure)
            .configure(discover::configure)
            .configure(swipes::configure)
            .configure(matches::configure)
            .configure(conversations::configure)
            .configure(groups::configure)
            .configure(journals::configure)
            .configure(marketplace::configure)
            .configure(ws::configure),
    );
}

/// Drop cached views of `user_id`; a cache failure never fails the request
pub(crate) async fn invalidate_user_cache(state: &AppState, user_id: Uuid) {
    if let Err(e) = state.cache.invalidate_user(user_id).await {
        tracing::warn!("Failed to invalidate cache for {}: {}", user_id, e);
    }
}

/// Offset and limit for list endpoints
pub(crate) fn page(state: &AppState, limit: Option<u16>, offset: Option<u32>) -> (i64, i64) {
    (state.page_limit(limit) as i64, i64::from(offset.unwrap_or(0)))
}
