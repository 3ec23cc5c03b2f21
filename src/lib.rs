//! WanderPair - travel-companion matchmaking service
//!
//! Compatibility scoring and discovery live in [`core`]; persistence, caching,
//! the realtime hub and the score refresher in [`services`]; the HTTP and
//! WebSocket surface in [`routes`].

pub mod auth;
pub mod config;
pub mod core;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

// Re-export commonly used types
pub use core::{
    calculate_compatibility,
    distance::{calculate_bounding_box, haversine_distance},
    Matcher,
};
pub use error::ApiError;
pub use models::{ScoredCandidate, ScoringWeights, UserPreferences, UserProfile};
pub use state::AppState;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        let bbox = calculate_bounding_box(38.7223, -9.1393, 10.0);
        assert!(bbox.min_lat < 38.7223);
        assert!(haversine_distance(0.0, 0.0, 0.0, 0.0).abs() < f64::EPSILON);
    }
}
