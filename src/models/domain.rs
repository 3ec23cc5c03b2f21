use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Self-reported social energy, used by the personality component of the score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "personality_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PersonalityType {
    Introvert,
    Ambivert,
    Extrovert,
}

impl PersonalityType {
    /// Position on the introvert..extrovert axis
    pub fn rank(self) -> i8 {
        match self {
            PersonalityType::Introvert => 0,
            PersonalityType::Ambivert => 1,
            PersonalityType::Extrovert => 2,
        }
    }
}

/// How much a traveller expects to spend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "budget_level", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BudgetLevel {
    Budget,
    Moderate,
    Luxury,
}

impl BudgetLevel {
    pub fn rank(self) -> i8 {
        match self {
            BudgetLevel::Budget => 0,
            BudgetLevel::Moderate => 1,
            BudgetLevel::Luxury => 2,
        }
    }
}

/// A user's reaction to another profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "swipe_action", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SwipeAction {
    Like,
    Superlike,
    Reject,
}

impl SwipeAction {
    pub fn is_positive(self) -> bool {
        matches!(self, SwipeAction::Like | SwipeAction::Superlike)
    }
}

/// User profile as stored and returned to its owner
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub age: i16,
    pub gender: String,
    pub bio: Option<String>,
    pub home_city: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub personality: Option<PersonalityType>,
    pub budget: Option<BudgetLevel>,
    pub travel_style: Option<String>,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub destinations: Vec<String>,
    pub is_verified: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    /// Coordinates when both are known
    pub fn location(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }
}

/// Profile as other users see it (no email)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
    pub id: Uuid,
    pub name: String,
    pub age: i16,
    pub gender: String,
    pub bio: Option<String>,
    pub home_city: Option<String>,
    pub personality: Option<PersonalityType>,
    pub budget: Option<BudgetLevel>,
    pub travel_style: Option<String>,
    pub interests: Vec<String>,
    pub languages: Vec<String>,
    pub destinations: Vec<String>,
    pub is_verified: bool,
}

impl From<&UserProfile> for PublicProfile {
    fn from(p: &UserProfile) -> Self {
        Self {
            id: p.id,
            name: p.name.clone(),
            age: p.age,
            gender: p.gender.clone(),
            bio: p.bio.clone(),
            home_city: p.home_city.clone(),
            personality: p.personality,
            budget: p.budget,
            travel_style: p.travel_style.clone(),
            interests: p.interests.clone(),
            languages: p.languages.clone(),
            destinations: p.destinations.clone(),
            is_verified: p.is_verified,
        }
    }
}

/// Discovery preferences
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    pub user_id: Uuid,
    pub preferred_genders: Vec<String>,
    pub min_age: i16,
    pub max_age: i16,
    pub max_distance_km: i32,
    pub require_location: bool,
}

impl UserPreferences {
    pub fn default_for(user_id: Uuid) -> Self {
        Self {
            user_id,
            preferred_genders: vec![],
            min_age: 18,
            max_age: 99,
            max_distance_km: 500,
            require_location: false,
        }
    }
}

/// Mutual match between two users; `user1_id < user2_id` always
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MatchRecord {
    pub id: Uuid,
    pub user1_id: Uuid,
    pub user2_id: Uuid,
    pub compatibility_score: f64,
    pub matched_at: DateTime<Utc>,
    pub is_active: bool,
}

impl MatchRecord {
    pub fn involves(&self, user_id: Uuid) -> bool {
        self.user1_id == user_id || self.user2_id == user_id
    }

    /// The other side of the match, from `user_id`'s point of view
    pub fn partner_of(&self, user_id: Uuid) -> Uuid {
        if self.user1_id == user_id {
            self.user2_id
        } else {
            self.user1_id
        }
    }
}

/// Position of the score refresher in the `(updated_at, id)` order of users.
/// Persisted so a restart resumes where the last pass stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RefreshCursor {
    pub updated_at: DateTime<Utc>,
    pub user_id: Uuid,
}

impl RefreshCursor {
    /// Cursor placed before every user changed at or after `at`
    pub fn starting_at(at: DateTime<Utc>) -> Self {
        Self {
            updated_at: at,
            user_id: Uuid::nil(),
        }
    }
}

/// Match as listed to one of its participants
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchSummary {
    pub match_id: Uuid,
    pub partner: PublicProfile,
    pub compatibility_score: f64,
    pub matched_at: DateTime<Utc>,
    pub conversation_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "conversation_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ConversationKind {
    Direct,
    Group,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub id: Uuid,
    pub kind: ConversationKind,
    pub match_id: Option<Uuid>,
    pub group_id: Option<Uuid>,
    pub participant_ids: Vec<Uuid>,
    pub last_message: Option<Message>,
    pub unread_count: i64,
    pub created_at: DateTime<Utc>,
}

/// What a user may do in a conversation
#[derive(Debug, Clone, Copy)]
pub struct ConversationAccess {
    pub kind: ConversationKind,
    pub is_participant: bool,
    /// Only set for direct conversations
    pub match_active: Option<bool>,
}

impl ConversationAccess {
    pub fn can_read(&self) -> bool {
        self.is_participant
    }

    pub fn can_post(&self) -> bool {
        self.is_participant
            && match self.kind {
                ConversationKind::Direct => self.match_active.unwrap_or(false),
                ConversationKind::Group => true,
            }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "group_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum GroupRole {
    Owner,
    Member,
}

/// Travel group with its live member count
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TravelGroup {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub destination: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub max_members: i32,
    pub owner_id: Uuid,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub member_count: i64,
    pub conversation_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinOutcome {
    Joined,
    AlreadyMember,
    Full,
    Private,
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "journal_visibility", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum JournalVisibility {
    #[default]
    Public,
    Matches,
    Private,
}

impl JournalVisibility {
    pub fn allows(self, is_author: bool, is_matched: bool) -> bool {
        match self {
            JournalVisibility::Public => true,
            JournalVisibility::Matches => is_author || is_matched,
            JournalVisibility::Private => is_author,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TravelJournal {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub body: String,
    pub destination: Option<String>,
    pub visibility: JournalVisibility,
    pub trip_start: Option<NaiveDate>,
    pub trip_end: Option<NaiveDate>,
    pub tags: Vec<String>,
    pub like_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "listing_category", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ListingCategory {
    Gear,
    Ticket,
    Accommodation,
    Service,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "listing_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    Active,
    Reserved,
    Sold,
}

impl ListingStatus {
    /// `active -> reserved -> sold`, `reserved -> active`; `sold` is terminal
    pub fn can_transition_to(self, next: ListingStatus) -> bool {
        matches!(
            (self, next),
            (ListingStatus::Active, ListingStatus::Reserved)
                | (ListingStatus::Active, ListingStatus::Sold)
                | (ListingStatus::Reserved, ListingStatus::Sold)
                | (ListingStatus::Reserved, ListingStatus::Active)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MarketplaceListing {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub category: ListingCategory,
    pub price_cents: i64,
    pub currency: String,
    pub location: Option<String>,
    pub status: ListingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Geospatial bounding box
#[derive(Debug, Clone, Copy)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

/// Candidate query parameters shared by the SQL pre-filter and the in-memory pipeline
#[derive(Debug, Clone)]
pub struct CandidateQuery {
    pub viewer_id: Uuid,
    pub bounding_box: Option<BoundingBox>,
    pub preferred_genders: Vec<String>,
    pub min_age: i16,
    pub max_age: i16,
    pub exclude_user_ids: Vec<Uuid>,
    pub require_location: bool,
    pub limit: usize,
}

/// Per-component weights of the compatibility score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub personality: f64,
    pub budget: f64,
    pub interests: f64,
    pub location: f64,
    pub destinations: f64,
}

impl ScoringWeights {
    pub fn total(&self) -> f64 {
        self.personality + self.budget + self.interests + self.location + self.destinations
    }
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            personality: 0.25,
            budget: 0.20,
            interests: 0.30,
            location: 0.15,
            destinations: 0.10,
        }
    }
}

/// Candidate returned from discovery, ranked by compatibility
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredCandidate {
    pub profile: PublicProfile,
    pub compatibility_score: f64,
    pub distance_km: Option<f64>,
    pub shared_interests: Vec<String>,
    pub shared_destinations: Vec<String>,
}
