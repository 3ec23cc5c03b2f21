use std::sync::Arc;

use crate::auth::TokenService;
use crate::config::MatchingSettings;
use crate::core::Matcher;
use crate::services::{CacheManager, PostgresClient, RealtimeHub};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<PostgresClient>,
    pub cache: Arc<CacheManager>,
    pub hub: RealtimeHub,
    pub matcher: Matcher,
    pub tokens: TokenService,
    pub matching: MatchingSettings,
    pub bcrypt_cost: u32,
}

impl AppState {
    pub fn new(
        db: Arc<PostgresClient>,
        cache: Arc<CacheManager>,
        tokens: TokenService,
        matching: MatchingSettings,
        matcher: Matcher,
        bcrypt_cost: u32,
    ) -> Self {
        Self {
            db,
            cache,
            hub: RealtimeHub::new(),
            matcher,
            tokens,
            matching,
            bcrypt_cost,
        }
    }

    /// Clamp a requested page size to the configured bounds
    pub fn page_limit(&self, requested: Option<u16>) -> usize {
        let limit = requested.unwrap_or(self.matching.default_limit);
        usize::from(limit.clamp(1, self.matching.max_limit.max(1)))
    }
}
