use actix_web::{web, HttpResponse};
use uuid::Uuid;
use validator::Validate;

use super::page;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::models::{
    CreateJournalRequest, JournalVisibility, JournalsQuery, LikeResponse, TravelJournal, UpdateJournalRequest,
};
use crate::state::AppState;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/journals", web::post().to(create_journal))
        .route("/journals", web::get().to(list_journals))
        .route("/journals/{id}", web::get().to(get_journal))
        .route("/journals/{id}", web::put().to(update_journal))
        .route("/journals/{id}", web::delete().to(delete_journal))
        .route("/journals/{id}/like", web::post().to(like_journal));
}

/// Journal if `viewer_id` may read it; hidden journals look missing
async fn visible_journal(state: &AppState, journal_id: Uuid, viewer_id: Uuid) -> Result<TravelJournal, ApiError> {
    let journal = state
        .db
        .get_journal(journal_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Journal"))?;

    let is_author = journal.author_id == viewer_id;
    let is_matched = journal.visibility == JournalVisibility::Matches
        && !is_author
        && state.db.are_matched(viewer_id, journal.author_id).await?;

    if !journal.visibility.allows(is_author, is_matched) {
        return Err(ApiError::not_found("Journal"));
    }
    Ok(journal)
}

async fn create_journal(
    state: web::Data<AppState>,
    auth: AuthUser,
    req: web::Json<CreateJournalRequest>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;
    let journal = state.db.create_journal(auth.user_id, &req).await?;
    Ok(HttpResponse::Created().json(journal))
}

/// GET /api/v1/journals?authorId=...&limit=20&offset=0
async fn list_journals(
    state: web::Data<AppState>,
    auth: AuthUser,
    query: web::Query<JournalsQuery>,
) -> Result<HttpResponse, ApiError> {
    let (limit, offset) = page(&state, query.limit, query.offset);
    let journals = state
        .db
        .list_journals(auth.user_id, query.author_id, limit, offset)
        .await?;
    Ok(HttpResponse::Ok().json(journals))
}

async fn get_journal(
    state: web::Data<AppState>,
    auth: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let journal = visible_journal(&state, path.into_inner(), auth.user_id).await?;
    Ok(HttpResponse::Ok().json(journal))
}

async fn update_journal(
    state: web::Data<AppState>,
    auth: AuthUser,
    path: web::Path<Uuid>,
    req: web::Json<UpdateJournalRequest>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;
    let journal = state.db.update_journal(path.into_inner(), auth.user_id, &req).await?;
    Ok(HttpResponse::Ok().json(journal))
}

async fn delete_journal(
    state: web::Data<AppState>,
    auth: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    state.db.delete_journal(path.into_inner(), auth.user_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Toggle the caller's like
async fn like_journal(
    state: web::Data<AppState>,
    auth: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let journal = visible_journal(&state, path.into_inner(), auth.user_id).await?;
    let (liked, like_count) = state.db.toggle_journal_like(journal.id, auth.user_id).await?;
    Ok(HttpResponse::Ok().json(LikeResponse { liked, like_count }))
}
