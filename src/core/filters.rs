use crate::core::distance::{calculate_bounding_box, is_within_bounding_box, profile_distance};
use crate::models::{CandidateQuery, UserPreferences, UserProfile};
use uuid::Uuid;

/// Profile is active and has finished onboarding
#[inline]
pub fn is_discoverable(profile: &UserProfile) -> bool {
    profile.is_active && !profile.name.trim().is_empty() && profile.age >= 18
}

/// Check a candidate against the viewer's hard preferences
#[inline]
pub fn matches_preferences(
    candidate: &UserProfile,
    viewer: &UserProfile,
    preferences: &UserPreferences,
) -> bool {
    if !preferences.preferred_genders.is_empty()
        && !preferences
            .preferred_genders
            .iter()
            .any(|g| g.eq_ignore_ascii_case(&candidate.gender))
    {
        return false;
    }

    if candidate.age < preferences.min_age || candidate.age > preferences.max_age {
        return false;
    }

    match profile_distance(viewer, candidate) {
        Some(distance) => distance <= f64::from(preferences.max_distance_km),
        // One side never shared a location
        None => !preferences.require_location || candidate.location().is_some(),
    }
}

/// Build the query shared by the SQL pre-filter and the in-memory pipeline
pub fn build_candidate_query(
    viewer: &UserProfile,
    preferences: &UserPreferences,
    exclude_user_ids: Vec<Uuid>,
    limit: usize,
) -> CandidateQuery {
    let bounding_box = viewer.location().map(|(lat, lon)| {
        calculate_bounding_box(lat, lon, f64::from(preferences.max_distance_km))
    });

    CandidateQuery {
        viewer_id: viewer.id,
        bounding_box,
        preferred_genders: preferences.preferred_genders.clone(),
        min_age: preferences.min_age,
        max_age: preferences.max_age,
        exclude_user_ids,
        require_location: preferences.require_location,
        limit,
    }
}

/// Cheap pre-filter: bounding box, exclusions and ranges
#[inline]
pub fn matches_query_constraints(profile: &UserProfile, query: &CandidateQuery) -> bool {
    if profile.id == query.viewer_id || query.exclude_user_ids.contains(&profile.id) {
        return false;
    }

    match (profile.location(), query.bounding_box.as_ref()) {
        (Some((lat, lon)), Some(bbox)) => {
            if !is_within_bounding_box(lat, lon, bbox) {
                return false;
            }
        }
        (None, _) if query.require_location => return false,
        _ => {}
    }

    if profile.age < query.min_age || profile.age > query.max_age {
        return false;
    }

    query.preferred_genders.is_empty()
        || query
            .preferred_genders
            .iter()
            .any(|g| g.eq_ignore_ascii_case(&profile.gender))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn profile(age: i16, gender: &str, location: Option<(f64, f64)>) -> UserProfile {
        UserProfile {
            id: Uuid::new_v4(),
            email: "p@example.com".to_string(),
            name: "Pat".to_string(),
            age,
            gender: gender.to_string(),
            bio: None,
            home_city: None,
            latitude: location.map(|l| l.0),
            longitude: location.map(|l| l.1),
            personality: None,
            budget: None,
            travel_style: None,
            interests: vec![],
            languages: vec![],
            destinations: vec![],
            is_verified: false,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn preferences(viewer: &UserProfile) -> UserPreferences {
        UserPreferences {
            user_id: viewer.id,
            preferred_genders: vec!["Female".to_string()],
            min_age: 25,
            max_age: 35,
            max_distance_km: 50,
            require_location: false,
        }
    }

    #[test]
    fn test_preferences_match() {
        let viewer = profile(30, "male", Some((38.72, -9.14)));
        let candidate = profile(28, "female", Some((38.75, -9.15)));
        assert!(matches_preferences(&candidate, &viewer, &preferences(&viewer)));
    }

    #[test]
    fn test_preferences_fail_age_and_gender() {
        let viewer = profile(30, "male", None);
        let prefs = preferences(&viewer);
        assert!(!matches_preferences(&profile(40, "female", None), &viewer, &prefs));
        assert!(!matches_preferences(&profile(28, "male", None), &viewer, &prefs));
    }

    #[test]
    fn test_preferences_fail_distance() {
        let viewer = profile(30, "male", Some((38.72, -9.14)));
        let far = profile(28, "female", Some((41.16, -8.63)));
        assert!(!matches_preferences(&far, &viewer, &preferences(&viewer)));
    }

    #[test]
    fn test_require_location() {
        let viewer = profile(30, "male", Some((38.72, -9.14)));
        let nowhere = profile(28, "female", None);
        let mut prefs = preferences(&viewer);
        assert!(matches_preferences(&nowhere, &viewer, &prefs));

        prefs.require_location = true;
        assert!(!matches_preferences(&nowhere, &viewer, &prefs));
    }

    #[test]
    fn test_inactive_not_discoverable() {
        let mut p = profile(28, "female", None);
        assert!(is_discoverable(&p));
        p.is_active = false;
        assert!(!is_discoverable(&p));
    }

    #[test]
    fn test_query_excludes_viewer_and_ids() {
        let viewer = profile(30, "male", Some((38.72, -9.14)));
        let excluded = profile(28, "female", Some((38.73, -9.14)));
        let query = build_candidate_query(&viewer, &preferences(&viewer), vec![excluded.id], 100);

        assert!(!matches_query_constraints(&viewer, &query));
        assert!(!matches_query_constraints(&excluded, &query));
        assert!(matches_query_constraints(&profile(28, "female", Some((38.73, -9.14))), &query));
    }
}
