use std::cmp::Ordering;

use crate::core::{
    compatibility::{calculate_compatibility, Compatibility},
    filters::{build_candidate_query, is_discoverable, matches_preferences, matches_query_constraints},
};
use crate::models::{PublicProfile, ScoredCandidate, ScoringWeights, UserPreferences, UserProfile};
use uuid::Uuid;

/// Candidates below this score are not worth showing
pub const DEFAULT_MIN_SCORE: f64 = 20.0;

/// One page of discovery results
#[derive(Debug)]
pub struct DiscoveryResult {
    pub candidates: Vec<ScoredCandidate>,
    /// Candidates that survived filtering and the score threshold
    pub total_candidates: usize,
    pub next_offset: Option<usize>,
}

/// Discovery orchestrator
///
/// # Pipeline Stages
/// 1. Drop self, excluded ids and anything outside the bounding box
/// 2. Drop inactive or half-onboarded profiles
/// 3. Apply the viewer's hard preferences (gender, age, distance)
/// 4. Score, threshold, rank and page
#[derive(Debug, Clone)]
pub struct Matcher {
    weights: ScoringWeights,
    min_score: f64,
}

impl Matcher {
    pub fn new(weights: ScoringWeights, min_score: f64) -> Self {
        Self { weights, min_score }
    }

    pub fn with_default_weights() -> Self {
        Self::new(ScoringWeights::default(), DEFAULT_MIN_SCORE)
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Score a pair outside of discovery (match records, compatibility lookups)
    pub fn score_pair(&self, a: &UserProfile, b: &UserProfile, max_distance_km: f64) -> Compatibility {
        calculate_compatibility(a, b, max_distance_km, &self.weights)
    }

    /// Rank candidates for `viewer` and return the page at `offset..offset + limit`
    pub fn discover(
        &self,
        viewer: &UserProfile,
        preferences: &UserPreferences,
        candidates: Vec<UserProfile>,
        exclude_user_ids: Vec<Uuid>,
        offset: usize,
        limit: usize,
    ) -> DiscoveryResult {
        let query = build_candidate_query(viewer, preferences, exclude_user_ids, limit);
        let max_distance_km = f64::from(preferences.max_distance_km);

        let mut scored: Vec<ScoredCandidate> = candidates
            .into_iter()
            .filter(|profile| matches_query_constraints(profile, &query))
            .filter(is_discoverable)
            .filter(|profile| matches_preferences(profile, viewer, preferences))
            .filter_map(|profile| {
                let compatibility = self.score_pair(viewer, &profile, max_distance_km);
                if compatibility.score < self.min_score {
                    return None;
                }
                Some(ScoredCandidate {
                    profile: PublicProfile::from(&profile),
                    compatibility_score: compatibility.score,
                    distance_km: compatibility.distance_km,
                    shared_interests: compatibility.shared_interests,
                    shared_destinations: compatibility.shared_destinations,
                })
            })
            .collect();

        // Score descending, then distance ascending (unknown last), then id for stable paging
        scored.sort_by(|a, b| {
            b.compatibility_score
                .partial_cmp(&a.compatibility_score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| compare_distance(a.distance_km, b.distance_km))
                .then_with(|| a.profile.id.cmp(&b.profile.id))
        });

        let total_candidates = scored.len();
        let page: Vec<ScoredCandidate> = scored.into_iter().skip(offset).take(limit).collect();
        let next_offset = (offset + page.len() < total_candidates).then(|| offset + page.len());

        DiscoveryResult {
            candidates: page,
            total_candidates,
            next_offset,
        }
    }
}

fn compare_distance(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::with_default_weights()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BudgetLevel, PersonalityType};
    use chrono::Utc;

    fn candidate(name: &str, age: i16, gender: &str, lat: f64, lon: f64) -> UserProfile {
        UserProfile {
            id: Uuid::new_v4(),
            email: format!("{}@example.com", name),
            name: name.to_string(),
            age,
            gender: gender.to_string(),
            bio: None,
            home_city: None,
            latitude: Some(lat),
            longitude: Some(lon),
            personality: Some(PersonalityType::Ambivert),
            budget: Some(BudgetLevel::Moderate),
            travel_style: None,
            interests: vec!["hiking".to_string()],
            languages: vec![],
            destinations: vec!["peru".to_string()],
            is_verified: true,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn viewer_and_prefs() -> (UserProfile, UserPreferences) {
        let viewer = candidate("viewer", 30, "male", 38.7223, -9.1393);
        let prefs = UserPreferences {
            user_id: viewer.id,
            preferred_genders: vec!["female".to_string()],
            min_age: 21,
            max_age: 35,
            max_distance_km: 50,
            require_location: false,
        };
        (viewer, prefs)
    }

    #[test]
    fn test_discover_filters() {
        let matcher = Matcher::with_default_weights();
        let (viewer, prefs) = viewer_and_prefs();
        let good = candidate("good", 28, "female", 38.73, -9.14);
        let good_id = good.id;

        let candidates = vec![
            good,
            candidate("old", 40, "female", 38.73, -9.14),
            candidate("male", 28, "male", 38.73, -9.14),
            viewer.clone(),
        ];

        let result = matcher.discover(&viewer, &prefs, candidates, vec![], 0, 10);

        assert_eq!(result.candidates.len(), 1);
        assert_eq!(result.candidates[0].profile.id, good_id);
    }

    #[test]
    fn test_closer_ranks_first_on_equal_profiles() {
        let matcher = Matcher::with_default_weights();
        let (viewer, prefs) = viewer_and_prefs();
        let near = candidate("near", 28, "female", 38.725, -9.14);
        let far = candidate("far", 28, "female", 38.9, -9.14);
        let near_id = near.id;

        let result = matcher.discover(&viewer, &prefs, vec![far, near], vec![], 0, 10);

        assert_eq!(result.candidates.len(), 2);
        assert_eq!(result.candidates[0].profile.id, near_id);
        assert!(result.candidates[0].compatibility_score >= result.candidates[1].compatibility_score);
    }

    #[test]
    fn test_paging() {
        let matcher = Matcher::with_default_weights();
        let (viewer, prefs) = viewer_and_prefs();
        let candidates: Vec<UserProfile> = (0..7)
            .map(|i| candidate(&format!("c{}", i), 25, "female", 38.72 + i as f64 * 0.01, -9.14))
            .collect();

        let first = matcher.discover(&viewer, &prefs, candidates.clone(), vec![], 0, 5);
        assert_eq!(first.candidates.len(), 5);
        assert_eq!(first.next_offset, Some(5));
        assert_eq!(first.total_candidates, 7);

        let second = matcher.discover(&viewer, &prefs, candidates, vec![], 5, 5);
        assert_eq!(second.candidates.len(), 2);
        assert_eq!(second.next_offset, None);
    }

    #[test]
    fn test_excluded_ids_skipped() {
        let matcher = Matcher::with_default_weights();
        let (viewer, prefs) = viewer_and_prefs();
        let seen = candidate("seen", 28, "female", 38.73, -9.14);
        let seen_id = seen.id;

        let result = matcher.discover(&viewer, &prefs, vec![seen], vec![seen_id], 0, 10);
        assert!(result.candidates.is_empty());
    }

    #[test]
    fn test_min_score_threshold() {
        let matcher = Matcher::new(ScoringWeights::default(), 100.1);
        let (viewer, prefs) = viewer_and_prefs();
        let c = candidate("c", 28, "female", 38.73, -9.14);
        let result = matcher.discover(&viewer, &prefs, vec![c], vec![], 0, 10);
        assert!(result.candidates.is_empty());
    }
}
