use actix_web::{web, HttpResponse};
use validator::Validate;

use crate::auth::{hash_password, verify_password, AuthError};
use crate::error::ApiError;
use crate::models::{AuthResponse, LoginRequest, RegisterRequest};
use crate::services::NewUser;
use crate::state::AppState;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/auth/register", web::post().to(register))
        .route("/auth/login", web::post().to(login));
}

/// Create an account
///
/// POST /api/v1/auth/register
async fn register(
    state: web::Data<AppState>,
    req: web::Json<RegisterRequest>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;
    let req = req.into_inner();

    // bcrypt is CPU bound, keep it off the async workers
    let cost = state.bcrypt_cost;
    let password = req.password;
    let password_hash = web::block(move || hash_password(&password, cost)).await??;

    let user = state
        .db
        .create_user(&NewUser {
            email: req.email,
            password_hash,
            name: req.name,
            age: req.age,
            gender: req.gender,
        })
        .await?;

    let token = state.tokens.issue(user.id)?;

    Ok(HttpResponse::Created().json(AuthResponse { token, user }))
}

/// Exchange credentials for a token
///
/// POST /api/v1/auth/login
async fn login(
    state: web::Data<AppState>,
    req: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;

    let credentials = state
        .db
        .find_credentials(&req.email)
        .await?
        .filter(|c| c.is_active)
        .ok_or(AuthError::InvalidCredentials)?;

    let password = req.into_inner().password;
    let hash = credentials.password_hash;
    let valid = web::block(move || verify_password(&password, &hash)).await?;
    if !valid {
        tracing::debug!("Failed login for {}", credentials.user_id);
        return Err(AuthError::InvalidCredentials.into());
    }

    let user = state.db.get_active_user(credentials.user_id).await?;
    let token = state.tokens.issue(user.id)?;

    tracing::info!("User {} logged in", user.id);
    Ok(HttpResponse::Ok().json(AuthResponse { token, user }))
}
