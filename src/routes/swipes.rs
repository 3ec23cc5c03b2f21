use actix_web::{web, HttpResponse};

use crate::auth::AuthUser;
use crate::core::{resolve_swipe, MatchPair, SwipeOutcome};
use crate::error::ApiError;
use crate::models::{MatchRecord, SwipeAction, SwipeRequest, SwipeResponse};
use crate::services::{CacheKey, CreatedMatch, ServerEvent};
use crate::state::AppState;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/swipes", web::post().to(swipe));
}

/// Record a swipe and detect a mutual match
///
/// POST /api/v1/swipes
///
/// Request body:
/// ```json
/// { "targetId": "uuid", "action": "like|superlike|reject" }
/// ```
async fn swipe(
    state: web::Data<AppState>,
    auth: AuthUser,
    req: web::Json<SwipeRequest>,
) -> Result<HttpResponse, ApiError> {
    let swiper_id = auth.user_id;
    let SwipeRequest { target_id, action } = req.into_inner();

    let pair = MatchPair::new(swiper_id, target_id)
        .ok_or_else(|| ApiError::Validation("Cannot swipe on yourself".to_string()))?;

    let target = state.db.get_active_user(target_id).await?;

    state.db.record_swipe(swiper_id, target_id, action).await?;

    if let Err(e) = state
        .cache
        .invalidate_pattern(&CacheKey::discover_pattern(swiper_id))
        .await
    {
        tracing::warn!("Failed to invalidate discovery cache for {}: {}", swiper_id, e);
    }

    if action == SwipeAction::Superlike {
        state.hub.publish(
            target_id,
            ServerEvent::Swipe {
                from_user_id: swiper_id,
                action,
            },
        );
    }

    let reverse = if action.is_positive() {
        state.db.find_swipe(target_id, swiper_id).await?
    } else {
        None
    };

    let mut outcome = resolve_swipe(action, reverse);
    let mut matched: Option<MatchRecord> = None;

    if outcome == SwipeOutcome::Matched {
        match state.db.find_match_between(pair).await? {
            // An ended match is not revived by swiping again
            Some(existing) if !existing.is_active => outcome = SwipeOutcome::Pending,
            Some(existing) => matched = Some(existing),
            None => {
                let swiper = state.db.get_active_user(swiper_id).await?;
                let compatibility = state
                    .matcher
                    .score_pair(&swiper, &target, state.matching.max_distance_km);

                match state.db.create_match(pair, compatibility.score).await? {
                    Some(created) => {
                        notify_match(&state, &created);
                        matched = Some(created.record);
                    }
                    // The other side's swipe created it first
                    None => matched = state.db.find_match_between(pair).await?,
                }
            }
        }
    }

    tracing::debug!("Swipe {:?} by {} on {} -> {:?}", action, swiper_id, target_id, outcome);

    Ok(HttpResponse::Ok().json(SwipeResponse { outcome, matched }))
}

/// Push the match to both travellers, each seeing the other as partner
fn notify_match(state: &AppState, created: &CreatedMatch) {
    let record = &created.record;
    for user_id in [record.user1_id, record.user2_id] {
        state.hub.publish(
            user_id,
            ServerEvent::Match {
                match_id: record.id,
                user_id: record.partner_of(user_id),
                conversation_id: created.conversation_id,
                compatibility_score: record.compatibility_score,
            },
        );
    }
}
