use actix_web::{web, HttpResponse};
use uuid::Uuid;
use validator::Validate;

use super::page;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::models::{CreateGroupRequest, GroupsQuery, JoinGroupResponse, JoinOutcome};
use crate::state::AppState;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/groups", web::post().to(create_group))
        .route("/groups", web::get().to(list_groups))
        .route("/groups/{id}", web::get().to(get_group))
        .route("/groups/{id}", web::delete().to(delete_group))
        .route("/groups/{id}/join", web::post().to(join_group))
        .route("/groups/{id}/leave", web::post().to(leave_group));
}

async fn create_group(
    state: web::Data<AppState>,
    auth: AuthUser,
    req: web::Json<CreateGroupRequest>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;
    let group = state.db.create_group(auth.user_id, &req).await?;
    Ok(HttpResponse::Created().json(group))
}

/// GET /api/v1/groups?destination=lisbon&limit=20&offset=0
async fn list_groups(
    state: web::Data<AppState>,
    auth: AuthUser,
    query: web::Query<GroupsQuery>,
) -> Result<HttpResponse, ApiError> {
    let (limit, offset) = page(&state, query.limit, query.offset);
    let groups = state
        .db
        .list_groups(auth.user_id, query.destination.as_deref(), limit, offset)
        .await?;
    Ok(HttpResponse::Ok().json(groups))
}

/// Private groups are invisible to non-members
async fn get_group(
    state: web::Data<AppState>,
    auth: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let group_id = path.into_inner();
    let group = state
        .db
        .get_group(group_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Group"))?;

    if !group.is_public && !state.db.is_group_member(group_id, auth.user_id).await? {
        return Err(ApiError::not_found("Group"));
    }

    Ok(HttpResponse::Ok().json(group))
}

async fn delete_group(
    state: web::Data<AppState>,
    auth: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    state.db.delete_group(path.into_inner(), auth.user_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

async fn join_group(
    state: web::Data<AppState>,
    auth: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let group_id = path.into_inner();

    let outcome = state.db.join_group(group_id, auth.user_id).await?;
    if let Some(err) = join_error(outcome) {
        return Err(err);
    }

    let group = state
        .db
        .get_group(group_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Group"))?;

    Ok(HttpResponse::Ok().json(JoinGroupResponse { outcome, group }))
}

/// Private groups answer like missing ones to non-members
fn join_error(outcome: JoinOutcome) -> Option<ApiError> {
    match outcome {
        JoinOutcome::Joined | JoinOutcome::AlreadyMember => None,
        JoinOutcome::Full => Some(ApiError::Conflict("Group is full".to_string())),
        JoinOutcome::Private | JoinOutcome::NotFound => Some(ApiError::not_found("Group")),
    }
}

async fn leave_group(
    state: web::Data<AppState>,
    auth: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    if !state.db.leave_group(path.into_inner(), auth.user_id).await? {
        return Err(ApiError::NotFound("Not a member of this group".to_string()));
    }
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, ResponseError};

    #[test]
    fn test_private_group_join_looks_missing() {
        let private = join_error(JoinOutcome::Private).unwrap();
        let missing = join_error(JoinOutcome::NotFound).unwrap();
        assert_eq!(private.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(private.to_string(), missing.to_string());

        assert_eq!(join_error(JoinOutcome::Full).unwrap().status_code(), StatusCode::CONFLICT);
        assert!(join_error(JoinOutcome::Joined).is_none());
        assert!(join_error(JoinOutcome::AlreadyMember).is_none());
    }
}
