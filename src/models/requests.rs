use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::models::domain::{
    BudgetLevel, JournalVisibility, ListingCategory, ListingStatus, PersonalityType, SwipeAction,
};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    #[validate(length(min = 1, max = 80))]
    pub name: String,
    #[validate(range(min = 18, max = 120))]
    pub age: i16,
    #[validate(length(min = 1, max = 32))]
    pub gender: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Partial profile update; absent fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_location_pair"))]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 80))]
    pub name: Option<String>,
    #[validate(range(min = 18, max = 120))]
    pub age: Option<i16>,
    #[validate(length(min = 1, max = 32))]
    pub gender: Option<String>,
    #[validate(length(max = 1000))]
    pub bio: Option<String>,
    #[validate(length(max = 120))]
    pub home_city: Option<String>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,
    pub personality: Option<PersonalityType>,
    pub budget: Option<BudgetLevel>,
    #[validate(length(max = 40))]
    pub travel_style: Option<String>,
    #[validate(length(max = 30), custom(function = "validate_tags"))]
    pub interests: Option<Vec<String>>,
    #[validate(length(max = 10), custom(function = "validate_tags"))]
    pub languages: Option<Vec<String>>,
    #[validate(length(max = 20), custom(function = "validate_tags"))]
    pub destinations: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_age_range"))]
pub struct UpdatePreferencesRequest {
    #[serde(default)]
    pub preferred_genders: Vec<String>,
    #[validate(range(min = 18, max = 120))]
    pub min_age: i16,
    #[validate(range(min = 18, max = 120))]
    pub max_age: i16,
    #[validate(range(min = 1, max = 20000))]
    pub max_distance_km: i32,
    #[serde(default)]
    pub require_location: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoverQuery {
    pub limit: Option<u16>,
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwipeRequest {
    pub target_id: Uuid,
    pub action: SwipeAction,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    #[validate(length(min = 1, max = 2000), custom(function = "validate_not_blank"))]
    pub body: String,
}

/// Keyset cursor over `(created_at, id)`. Pass the last message of the
/// previous page as `before` and `beforeId`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_message_cursor"))]
pub struct MessagesQuery {
    pub before: Option<DateTime<Utc>>,
    pub before_id: Option<Uuid>,
    pub limit: Option<u16>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingRequest {
    #[serde(default = "default_true")]
    pub is_typing: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_group_dates"))]
pub struct CreateGroupRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub destination: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[validate(range(min = 2, max = 50))]
    pub max_members: i32,
    #[serde(default = "default_true")]
    pub is_public: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupsQuery {
    pub destination: Option<String>,
    pub limit: Option<u16>,
    pub offset: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_journal_dates"))]
pub struct CreateJournalRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 20000))]
    pub body: String,
    #[validate(length(max = 100))]
    pub destination: Option<String>,
    #[serde(default)]
    pub visibility: JournalVisibility,
    pub trip_start: Option<NaiveDate>,
    pub trip_end: Option<NaiveDate>,
    #[serde(default)]
    #[validate(length(max = 20), custom(function = "validate_tags"))]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateJournalRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 20000))]
    pub body: Option<String>,
    #[validate(length(max = 100))]
    pub destination: Option<String>,
    pub visibility: Option<JournalVisibility>,
    #[validate(length(max = 20), custom(function = "validate_tags"))]
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalsQuery {
    pub author_id: Option<Uuid>,
    pub limit: Option<u16>,
    pub offset: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateListingRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    pub category: ListingCategory,
    #[validate(range(min = 0))]
    pub price_cents: i64,
    #[validate(length(equal = 3))]
    pub currency: String,
    #[validate(length(max = 120))]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateListingRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    pub category: Option<ListingCategory>,
    #[validate(range(min = 0))]
    pub price_cents: Option<i64>,
    #[validate(length(max = 120))]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingStatusRequest {
    pub status: ListingStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingsQuery {
    pub category: Option<ListingCategory>,
    pub q: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub status: Option<ListingStatus>,
    pub limit: Option<u16>,
    pub offset: Option<u32>,
}

fn validate_tags(tags: &[String]) -> Result<(), ValidationError> {
    if tags.iter().any(|t| t.trim().is_empty() || t.chars().count() > 50) {
        return Err(ValidationError::new("invalid_tag"));
    }
    Ok(())
}

fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

/// A location is both coordinates or neither
fn validate_location_pair(req: &UpdateProfileRequest) -> Result<(), ValidationError> {
    if req.latitude.is_some() != req.longitude.is_some() {
        return Err(ValidationError::new("incomplete_location"));
    }
    Ok(())
}

fn validate_age_range(req: &UpdatePreferencesRequest) -> Result<(), ValidationError> {
    if req.min_age > req.max_age {
        return Err(ValidationError::new("min_age_exceeds_max_age"));
    }
    Ok(())
}

fn validate_message_cursor(query: &MessagesQuery) -> Result<(), ValidationError> {
    if query.before_id.is_some() && query.before.is_none() {
        let mut err = ValidationError::new("incomplete_cursor");
        err.message = Some("beforeId requires before".into());
        return Err(err);
    }
    Ok(())
}

fn validate_group_dates(req: &CreateGroupRequest) -> Result<(), ValidationError> {
    check_date_order(req.start_date, req.end_date)
}

fn validate_journal_dates(req: &CreateJournalRequest) -> Result<(), ValidationError> {
    check_date_order(req.trip_start, req.trip_end)
}

fn check_date_order(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<(), ValidationError> {
    match (start, end) {
        (Some(s), Some(e)) if e < s => Err(ValidationError::new("end_before_start")),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preferences_age_range() {
        let req = UpdatePreferencesRequest {
            preferred_genders: vec![],
            min_age: 40,
            max_age: 30,
            max_distance_km: 100,
            require_location: false,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_location_needs_both_coordinates() {
        let half = UpdateProfileRequest {
            latitude: Some(38.72),
            ..Default::default()
        };
        assert!(half.validate().is_err());

        let full = UpdateProfileRequest {
            latitude: Some(38.72),
            longitude: Some(-9.14),
            ..Default::default()
        };
        assert!(full.validate().is_ok());
        assert!(UpdateProfileRequest::default().validate().is_ok());
    }

    #[test]
    fn test_message_cursor_id_needs_timestamp() {
        let dangling = MessagesQuery {
            before_id: Some(Uuid::new_v4()),
            ..Default::default()
        };
        assert!(dangling.validate().is_err());

        let full = MessagesQuery {
            before: Some(Utc::now()),
            before_id: Some(Uuid::new_v4()),
            limit: Some(20),
        };
        assert!(full.validate().is_ok());
        assert!(MessagesQuery::default().validate().is_ok());
    }

    #[test]
    fn test_blank_message_rejected() {
        let req = SendMessageRequest { body: "   ".to_string() };
        assert!(req.validate().is_err());

        let ok = SendMessageRequest { body: "See you in Lisbon".to_string() };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_register_request_camel_case() {
        let req: RegisterRequest = serde_json::from_value(serde_json::json!({
            "email": "ana@example.com",
            "password": "hunter22hunter",
            "name": "Ana",
            "age": 29,
            "gender": "female"
        }))
        .unwrap();
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_group_dates_ordered() {
        let req = CreateGroupRequest {
            name: "Patagonia trek".to_string(),
            description: None,
            destination: "El Chaltén".to_string(),
            start_date: NaiveDate::from_ymd_opt(2026, 3, 10),
            end_date: NaiveDate::from_ymd_opt(2026, 3, 1),
            max_members: 6,
            is_public: true,
        };
        assert!(req.validate().is_err());
    }
}
