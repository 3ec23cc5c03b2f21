// Service exports
pub mod cache;
pub mod groups;
pub mod journals;
pub mod marketplace;
pub mod messaging;
pub mod postgres;
pub mod realtime;
pub mod refresher;
pub mod swipes;
pub mod users;

pub use cache::{CacheError, CacheKey, CacheManager, CacheStats};
pub use marketplace::ListingFilter;
pub use postgres::{PostgresClient, PostgresError};
pub use realtime::{ClientEvent, RealtimeHub, ServerEvent};
pub use refresher::{RefreshReport, ScoreRefresher};
pub use swipes::CreatedMatch;
pub use users::{NewUser, UserCredentials};
