use crate::models::{BoundingBox, UserProfile};

/// Earth's radius in kilometers
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Kilometers per degree of latitude
const KM_PER_DEGREE: f64 = 111.0;

/// Great-circle distance between two points in kilometers
#[inline]
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Distance between two travellers, if both shared a location
pub fn profile_distance(a: &UserProfile, b: &UserProfile) -> Option<f64> {
    let (lat1, lon1) = a.location()?;
    let (lat2, lon2) = b.location()?;
    Some(haversine_distance(lat1, lon1, lat2, lon2))
}

/// Bounding box around a center point, used as a cheap pre-filter before Haversine.
///
/// Near the poles the longitude span degenerates, so it widens to the full range.
pub fn calculate_bounding_box(lat: f64, lon: f64, radius_km: f64) -> BoundingBox {
    let lat_delta = radius_km / KM_PER_DEGREE;

    let cos_lat = lat.to_radians().cos().abs();
    let lon_delta = if cos_lat < 1e-6 {
        180.0
    } else {
        (radius_km / (KM_PER_DEGREE * cos_lat)).min(180.0)
    };

    BoundingBox {
        min_lat: (lat - lat_delta).max(-90.0),
        max_lat: (lat + lat_delta).min(90.0),
        min_lon: lon - lon_delta,
        max_lon: lon + lon_delta,
    }
}

/// Check if a point is within a bounding box
#[inline]
pub fn is_within_bounding_box(lat: f64, lon: f64, bbox: &BoundingBox) -> bool {
    lat >= bbox.min_lat && lat <= bbox.max_lat && lon >= bbox.min_lon && lon <= bbox.max_lon
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lisbon_to_porto() {
        // ~274 km
        let distance = haversine_distance(38.7223, -9.1393, 41.1579, -8.6291);
        assert!((distance - 274.0).abs() < 10.0, "got {}", distance);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let there = haversine_distance(13.7563, 100.5018, 18.7883, 98.9853);
        let back = haversine_distance(18.7883, 98.9853, 13.7563, 100.5018);
        assert!((there - back).abs() < 1e-9);
    }

    #[test]
    fn test_bounding_box_contains_center() {
        let bbox = calculate_bounding_box(38.7223, -9.1393, 25.0);
        assert!(is_within_bounding_box(38.7223, -9.1393, &bbox));
        assert!(!is_within_bounding_box(41.1579, -8.6291, &bbox));

        let lat_span = bbox.max_lat - bbox.min_lat;
        assert!((lat_span - 0.45).abs() < 0.02);
    }

    #[test]
    fn test_bounding_box_at_pole() {
        let bbox = calculate_bounding_box(90.0, 0.0, 100.0);
        assert_eq!(bbox.max_lat, 90.0);
        assert!(is_within_bounding_box(89.5, 170.0, &bbox));
    }
}
