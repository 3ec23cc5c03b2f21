// Core algorithm exports
pub mod compatibility;
pub mod distance;
pub mod filters;
pub mod matcher;
pub mod swipe;

pub use compatibility::{calculate_compatibility, Compatibility, ScoreBreakdown};
pub use distance::{calculate_bounding_box, haversine_distance, is_within_bounding_box, profile_distance};
pub use filters::{build_candidate_query, is_discoverable, matches_preferences, matches_query_constraints};
pub use matcher::{DiscoveryResult, Matcher};
pub use swipe::{resolve_swipe, MatchPair, SwipeOutcome};
