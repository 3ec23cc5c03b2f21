use actix_web::{web, HttpResponse};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/matches", web::get().to(list_matches))
        .route("/matches/{id}", web::delete().to(unmatch));
}

/// Active matches, newest first
async fn list_matches(state: web::Data<AppState>, auth: AuthUser) -> Result<HttpResponse, ApiError> {
    let matches = state.db.list_matches(auth.user_id).await?;
    Ok(HttpResponse::Ok().json(matches))
}

/// End a match. The direct conversation stays readable but closed.
async fn unmatch(
    state: web::Data<AppState>,
    auth: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    state.db.unmatch(path.into_inner(), auth.user_id).await?;
    Ok(HttpResponse::NoContent().finish())
}
