use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::compatibility::ScoreBreakdown;
use crate::core::swipe::SwipeOutcome;
use crate::models::domain::{JoinOutcome, MatchRecord, Message, ScoredCandidate, TravelGroup, UserProfile};

/// Response for the discovery endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoverResponse {
    pub candidates: Vec<ScoredCandidate>,
    pub next_cursor: Option<String>,
    pub total_results: usize,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: bool,
    pub cache_entries: u64,
    pub redis_enabled: bool,
    pub connected_users: usize,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserProfile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwipeResponse {
    pub outcome: SwipeOutcome,
    #[serde(rename = "match")]
    pub matched: Option<MatchRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompatibilityResponse {
    pub user_id: Uuid,
    pub score: f64,
    pub breakdown: ScoreBreakdown,
    pub shared_interests: Vec<String>,
    pub shared_destinations: Vec<String>,
    pub distance_km: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagesResponse {
    pub messages: Vec<Message>,
    pub has_more: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeResponse {
    pub liked: bool,
    pub like_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinGroupResponse {
    pub outcome: JoinOutcome,
    pub group: TravelGroup,
}
