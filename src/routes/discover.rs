use actix_web::{web, HttpResponse};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::core::{build_candidate_query, Compatibility};
use crate::error::ApiError;
use crate::models::{CompatibilityResponse, DiscoverQuery, DiscoverResponse};
use crate::services::CacheKey;
use crate::state::AppState;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/discover", web::get().to(discover))
        .route("/users/{id}/compatibility", web::get().to(compatibility));
}

/// Cursors are the decimal offset of the next page
pub(crate) fn parse_cursor(cursor: Option<&str>) -> Result<usize, ApiError> {
    match cursor.map(str::trim).filter(|c| !c.is_empty()) {
        None => Ok(0),
        Some(c) => c
            .parse::<usize>()
            .map_err(|_| ApiError::Validation(format!("Invalid cursor: {}", c))),
    }
}

/// Ranked candidates for the caller
///
/// GET /api/v1/discover?limit=20&cursor=40
async fn discover(
    state: web::Data<AppState>,
    auth: AuthUser,
    query: web::Query<DiscoverQuery>,
) -> Result<HttpResponse, ApiError> {
    let offset = parse_cursor(query.cursor.as_deref())?;
    let limit = state.page_limit(query.limit);
    let user_id = auth.user_id;

    let key = CacheKey::discover(user_id, offset, limit);
    if let Some(cached) = state.cache.lookup::<DiscoverResponse>(&key).await {
        tracing::debug!("Discovery cache hit for {}", user_id);
        return Ok(HttpResponse::Ok().json(cached));
    }

    let viewer = state.db.get_active_user(user_id).await?;
    let preferences = state.db.get_preferences(user_id).await?;
    let swiped = state.db.swiped_user_ids(user_id).await?;

    let candidate_query =
        build_candidate_query(&viewer, &preferences, swiped.clone(), state.matching.candidate_pool_size);
    let candidates = state.db.query_candidates(&candidate_query).await?;

    tracing::debug!("Found {} candidates for {}", candidates.len(), user_id);

    let result = state
        .matcher
        .discover(&viewer, &preferences, candidates, swiped, offset, limit);

    let response = DiscoverResponse {
        candidates: result.candidates,
        next_cursor: result.next_offset.map(|o| o.to_string()),
        total_results: result.total_candidates,
    };

    state.cache.store(&key, &response).await;

    tracing::info!(
        "Returning {} candidates for user {} (from {} ranked)",
        response.candidates.len(),
        user_id,
        result.total_candidates
    );

    Ok(HttpResponse::Ok().json(response))
}

/// Score breakdown between the caller and another traveller
async fn compatibility(
    state: web::Data<AppState>,
    auth: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let other_id = path.into_inner();
    if other_id == auth.user_id {
        return Err(ApiError::Validation("Cannot score a user against themselves".to_string()));
    }

    let key = CacheKey::compatibility(auth.user_id, other_id);
    let compatibility = match state.cache.lookup::<Compatibility>(&key).await {
        Some(cached) => cached,
        None => {
            let viewer = state.db.get_active_user(auth.user_id).await?;
            let other = state.db.get_active_user(other_id).await?;
            let computed = state
                .matcher
                .score_pair(&viewer, &other, state.matching.max_distance_km);
            state.cache.store(&key, &computed).await;
            computed
        }
    };

    Ok(HttpResponse::Ok().json(CompatibilityResponse {
        user_id: other_id,
        score: compatibility.score,
        breakdown: compatibility.breakdown,
        shared_interests: compatibility.shared_interests,
        shared_destinations: compatibility.shared_destinations,
        distance_km: compatibility.distance_km,
    }))
}
