use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::core::distance::profile_distance;
use crate::models::{BudgetLevel, PersonalityType, ScoringWeights, UserProfile};

/// Component score used when one side has not filled in an attribute
const NEUTRAL: f64 = 0.5;

/// Per-component scores, each in 0..=1
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub personality: f64,
    pub budget: f64,
    pub interests: f64,
    pub location: f64,
    pub destinations: f64,
}

/// Result of comparing two travellers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Compatibility {
    pub score: f64,
    pub breakdown: ScoreBreakdown,
    pub shared_interests: Vec<String>,
    pub shared_destinations: Vec<String>,
    pub distance_km: Option<f64>,
}

/// Compatibility score (0-100) between two profiles.
///
/// ```text
/// score = 100 * (
///     personality  * w_personality +   # same energy level scores best
///     budget       * w_budget +        # ordinal distance between budget levels
///     interests    * w_interests +     # Jaccard overlap of interest tags
///     location     * w_location +      # exponential decay up to max distance
///     destinations * w_destinations    # Jaccard overlap of wish-list places
/// ) / sum(w)
/// ```
///
/// Every component is symmetric, so `score(a, b) == score(b, a)`.
pub fn calculate_compatibility(
    a: &UserProfile,
    b: &UserProfile,
    max_distance_km: f64,
    weights: &ScoringWeights,
) -> Compatibility {
    let personality = personality_score(a.personality, b.personality);
    let budget = budget_score(a.budget, b.budget);
    let (interests, shared_interests) = tag_overlap(&a.interests, &b.interests);
    let (destinations, shared_destinations) = tag_overlap(&a.destinations, &b.destinations);

    let distance_km = profile_distance(a, b);
    let location = match distance_km {
        Some(d) => distance_score(d, max_distance_km),
        None => NEUTRAL,
    };

    let breakdown = ScoreBreakdown {
        personality,
        budget,
        interests,
        location,
        destinations,
    };

    Compatibility {
        score: weighted_score(&breakdown, weights),
        breakdown,
        shared_interests,
        shared_destinations,
        distance_km,
    }
}

/// Weighted combination of the breakdown, scaled to 0-100
pub fn weighted_score(breakdown: &ScoreBreakdown, weights: &ScoringWeights) -> f64 {
    let total_weight = weights.total();
    if total_weight <= 0.0 {
        return 0.0;
    }

    let sum = breakdown.personality * weights.personality
        + breakdown.budget * weights.budget
        + breakdown.interests * weights.interests
        + breakdown.location * weights.location
        + breakdown.destinations * weights.destinations;

    (sum / total_weight * 100.0).clamp(0.0, 100.0)
}

#[inline]
fn personality_score(a: Option<PersonalityType>, b: Option<PersonalityType>) -> f64 {
    match (a, b) {
        (Some(a), Some(b)) => match (a.rank() - b.rank()).abs() {
            0 => 1.0,
            1 => 0.6,
            _ => 0.2,
        },
        _ => NEUTRAL,
    }
}

#[inline]
fn budget_score(a: Option<BudgetLevel>, b: Option<BudgetLevel>) -> f64 {
    match (a, b) {
        (Some(a), Some(b)) => 1.0 - f64::from((a.rank() - b.rank()).abs()) / 2.0,
        _ => NEUTRAL,
    }
}

/// Closer is better, decaying exponentially; zero at or beyond the max distance
#[inline]
fn distance_score(distance_km: f64, max_distance_km: f64) -> f64 {
    if max_distance_km <= 0.0 || distance_km >= max_distance_km {
        return 0.0;
    }
    (-distance_km / (max_distance_km * 0.5)).exp()
}

/// Jaccard index over normalized tags, plus the sorted intersection
fn tag_overlap(a: &[String], b: &[String]) -> (f64, Vec<String>) {
    let left = normalize_tags(a);
    let right = normalize_tags(b);

    if left.is_empty() || right.is_empty() {
        return (NEUTRAL, Vec::new());
    }

    let shared: Vec<String> = left.intersection(&right).cloned().collect();
    let union = left.union(&right).count();

    (shared.len() as f64 / union as f64, shared)
}

fn normalize_tags(tags: &[String]) -> BTreeSet<String> {
    tags.iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn traveller(
        personality: Option<PersonalityType>,
        budget: Option<BudgetLevel>,
        interests: &[&str],
        location: Option<(f64, f64)>,
    ) -> UserProfile {
        UserProfile {
            id: Uuid::new_v4(),
            email: "t@example.com".to_string(),
            name: "Traveller".to_string(),
            age: 30,
            gender: "female".to_string(),
            bio: None,
            home_city: None,
            latitude: location.map(|l| l.0),
            longitude: location.map(|l| l.1),
            personality,
            budget,
            travel_style: None,
            interests: interests.iter().map(|s| s.to_string()).collect(),
            languages: vec![],
            destinations: vec!["Japan".to_string()],
            is_verified: false,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_identical_profiles_score_high() {
        let a = traveller(
            Some(PersonalityType::Ambivert),
            Some(BudgetLevel::Moderate),
            &["hiking", "food"],
            Some((38.72, -9.14)),
        );
        let b = a.clone();
        let result = calculate_compatibility(&a, &b, 100.0, &ScoringWeights::default());

        assert!(result.score > 99.0, "got {}", result.score);
        assert_eq!(result.shared_interests, vec!["food", "hiking"]);
        assert_eq!(result.shared_destinations, vec!["japan"]);
    }

    #[test]
    fn test_score_is_symmetric() {
        let a = traveller(
            Some(PersonalityType::Introvert),
            Some(BudgetLevel::Budget),
            &["Hiking", "museums", "surf"],
            Some((38.72, -9.14)),
        );
        let b = traveller(
            Some(PersonalityType::Extrovert),
            Some(BudgetLevel::Luxury),
            &["hiking ", "nightlife"],
            Some((38.80, -9.30)),
        );
        let weights = ScoringWeights::default();
        let ab = calculate_compatibility(&a, &b, 50.0, &weights);
        let ba = calculate_compatibility(&b, &a, 50.0, &weights);

        assert!((ab.score - ba.score).abs() < 1e-9);
        assert_eq!(ab.shared_interests, ba.shared_interests);
    }

    #[test]
    fn test_personality_component() {
        assert_eq!(personality_score(Some(PersonalityType::Introvert), Some(PersonalityType::Introvert)), 1.0);
        assert_eq!(personality_score(Some(PersonalityType::Introvert), Some(PersonalityType::Ambivert)), 0.6);
        assert_eq!(personality_score(Some(PersonalityType::Introvert), Some(PersonalityType::Extrovert)), 0.2);
        assert_eq!(personality_score(None, Some(PersonalityType::Extrovert)), NEUTRAL);
    }

    #[test]
    fn test_budget_component() {
        assert_eq!(budget_score(Some(BudgetLevel::Budget), Some(BudgetLevel::Budget)), 1.0);
        assert_eq!(budget_score(Some(BudgetLevel::Budget), Some(BudgetLevel::Moderate)), 0.5);
        assert_eq!(budget_score(Some(BudgetLevel::Budget), Some(BudgetLevel::Luxury)), 0.0);
    }

    #[test]
    fn test_distance_component() {
        assert!(distance_score(1.0, 50.0) > 0.9);
        assert_eq!(distance_score(50.0, 50.0), 0.0);
        assert_eq!(distance_score(10.0, 0.0), 0.0);
    }

    #[test]
    fn test_unknown_location_is_neutral() {
        let a = traveller(None, None, &[], None);
        let b = traveller(None, None, &[], Some((1.0, 1.0)));
        let result = calculate_compatibility(&a, &b, 50.0, &ScoringWeights::default());
        assert_eq!(result.breakdown.location, NEUTRAL);
        assert!(result.distance_km.is_none());
    }

    #[test]
    fn test_zero_weights() {
        let weights = ScoringWeights {
            personality: 0.0,
            budget: 0.0,
            interests: 0.0,
            location: 0.0,
            destinations: 0.0,
        };
        let a = traveller(None, None, &["food"], None);
        let result = calculate_compatibility(&a, &a, 50.0, &weights);
        assert_eq!(result.score, 0.0);
    }
}
