pub mod rate_limit;

pub use rate_limit::{RateLimitConfig, RateLimiter, RateLimiterState};
