use actix_web::{web, HttpResponse};
use uuid::Uuid;
use validator::Validate;

use super::invalidate_user_cache;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::models::{PublicProfile, UpdatePreferencesRequest, UpdateProfileRequest};
use crate::services::CacheKey;
use crate::state::AppState;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/users/me", web::get().to(get_me))
        .route("/users/me", web::put().to(update_me))
        .route("/users/me", web::delete().to(delete_me))
        .route("/users/me/preferences", web::get().to(get_preferences))
        .route("/users/me/preferences", web::put().to(update_preferences))
        .route("/users/{id}", web::get().to(get_user));
}

async fn get_me(state: web::Data<AppState>, auth: AuthUser) -> Result<HttpResponse, ApiError> {
    let user = state.db.get_active_user(auth.user_id).await?;
    Ok(HttpResponse::Ok().json(user))
}

/// PUT /api/v1/users/me
async fn update_me(
    state: web::Data<AppState>,
    auth: AuthUser,
    req: web::Json<UpdateProfileRequest>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;

    let user = state.db.update_profile(auth.user_id, &req).await?;
    invalidate_user_cache(&state, auth.user_id).await;

    tracing::debug!("Profile updated for {}", auth.user_id);
    Ok(HttpResponse::Ok().json(user))
}

/// Deactivate the account. Matches end, data stays for the audit trail.
async fn delete_me(state: web::Data<AppState>, auth: AuthUser) -> Result<HttpResponse, ApiError> {
    if !state.db.deactivate_user(auth.user_id).await? {
        return Err(ApiError::not_found("User"));
    }
    invalidate_user_cache(&state, auth.user_id).await;
    state
        .cache
        .store(&CacheKey::account_status(auth.user_id), &false)
        .await;

    tracing::info!("User {} deactivated", auth.user_id);
    Ok(HttpResponse::NoContent().finish())
}

async fn get_preferences(state: web::Data<AppState>, auth: AuthUser) -> Result<HttpResponse, ApiError> {
    let prefs = state.db.get_preferences(auth.user_id).await?;
    Ok(HttpResponse::Ok().json(prefs))
}

async fn update_preferences(
    state: web::Data<AppState>,
    auth: AuthUser,
    req: web::Json<UpdatePreferencesRequest>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;

    let prefs = state.db.upsert_preferences(auth.user_id, &req).await?;
    invalidate_user_cache(&state, auth.user_id).await;

    Ok(HttpResponse::Ok().json(prefs))
}

/// Public profile of another traveller
async fn get_user(
    state: web::Data<AppState>,
    _auth: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let user_id = path.into_inner();
    let key = CacheKey::profile(user_id);

    if let Some(profile) = state.cache.lookup::<PublicProfile>(&key).await {
        return Ok(HttpResponse::Ok().json(profile));
    }

    let profile = PublicProfile::from(&state.db.get_active_user(user_id).await?);
    state.cache.store(&key, &profile).await;

    Ok(HttpResponse::Ok().json(profile))
}
