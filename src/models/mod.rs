// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    BoundingBox, BudgetLevel, CandidateQuery, ConversationAccess, ConversationKind,
    ConversationSummary, GroupRole, JoinOutcome, JournalVisibility, ListingCategory,
    ListingStatus, MarketplaceListing, MatchRecord, MatchSummary, Message, PersonalityType,
    PublicProfile, RefreshCursor, ScoredCandidate, ScoringWeights, SwipeAction, TravelGroup, TravelJournal,
    UserPreferences, UserProfile,
};
pub use requests::{
    CreateGroupRequest, CreateJournalRequest, CreateListingRequest, DiscoverQuery, GroupsQuery,
    JournalsQuery, ListingStatusRequest, ListingsQuery, LoginRequest, MessagesQuery,
    RegisterRequest, SendMessageRequest, SwipeRequest, TypingRequest, UpdateJournalRequest,
    UpdateListingRequest, UpdatePreferencesRequest, UpdateProfileRequest,
};
pub use responses::{
    AuthResponse, CompatibilityResponse, DiscoverResponse, ErrorResponse, HealthResponse,
    JoinGroupResponse, LikeResponse, MessagesResponse, SwipeResponse,
};
