// Fixed-window rate limiting, keyed by authenticated user or client IP

use std::collections::HashMap;
use std::future::{ready, Future, Ready};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use actix_web::{
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderName, HeaderValue},
    Error, ResponseError,
};

use crate::auth::{bearer_token, TokenService};
use crate::config::RateLimitSettings;
use crate::error::ApiError;

/// Rate limiter configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests per window
    pub max_requests: u32,
    pub window_duration: Duration,
    pub enabled: bool,
    /// Use the forwarded client address instead of the socket peer
    pub trust_proxy_headers: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 120,
            window_duration: Duration::from_secs(60),
            enabled: true,
            trust_proxy_headers: false,
        }
    }
}

impl From<&RateLimitSettings> for RateLimitConfig {
    fn from(s: &RateLimitSettings) -> Self {
        Self {
            max_requests: s.max_requests,
            window_duration: Duration::from_secs(s.window_secs),
            enabled: s.enabled,
            trust_proxy_headers: s.trust_proxy_headers,
        }
    }
}

/// Token bucket refilled in full at each window boundary
struct TokenBucket {
    tokens: u32,
    last_refill: Instant,
}

impl TokenBucket {
    fn new(max_tokens: u32) -> Self {
        Self {
            tokens: max_tokens,
            last_refill: Instant::now(),
        }
    }

    fn try_consume(&mut self, max_tokens: u32, window: Duration) -> bool {
        let now = Instant::now();
        if now.duration_since(self.last_refill) >= window {
            self.tokens = max_tokens;
            self.last_refill = now;
        }
        if self.tokens > 0 {
            self.tokens -= 1;
            true
        } else {
            false
        }
    }
}

/// Rate limiter state shared across workers
pub struct RateLimiterState {
    buckets: Mutex<HashMap<String, TokenBucket>>,
    config: RateLimitConfig,
}

impl RateLimiterState {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// Returns whether the request is allowed and how many remain in the window
    pub fn check(&self, key: &str) -> (bool, u32) {
        if !self.config.enabled {
            return (true, self.config.max_requests);
        }

        let mut buckets = match self.buckets.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let bucket = buckets
            .entry(key.to_string())
            .or_insert_with(|| TokenBucket::new(self.config.max_requests));

        let allowed = bucket.try_consume(self.config.max_requests, self.config.window_duration);
        (allowed, bucket.tokens)
    }

    /// Drop buckets idle for more than two windows
    pub fn cleanup(&self) -> usize {
        let mut buckets = match self.buckets.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let before = buckets.len();
        let now = Instant::now();
        buckets.retain(|_, bucket| {
            now.duration_since(bucket.last_refill) < self.config.window_duration * 2
        });
        before - buckets.len()
    }

    pub fn tracked_keys(&self) -> usize {
        match self.buckets.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }
}

/// Rate limiting middleware factory
#[derive(Clone)]
pub struct RateLimiter {
    state: Arc<RateLimiterState>,
    tokens: Option<TokenService>,
}

impl RateLimiter {
    /// `tokens` lets authenticated callers get a bucket per user instead of per IP
    pub fn new(config: RateLimitConfig, tokens: Option<TokenService>) -> Self {
        Self {
            state: Arc::new(RateLimiterState::new(config)),
            tokens,
        }
    }

    pub fn state(&self) -> Arc<RateLimiterState> {
        self.state.clone()
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimiter
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = RateLimiterMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimiterMiddleware {
            service,
            state: self.state.clone(),
            tokens: self.tokens.clone(),
        }))
    }
}

/// Socket peer address; forwarded headers are client-controlled unless a proxy rewrites them
fn client_ip(req: &ServiceRequest, trust_proxy_headers: bool) -> String {
    let ip = if trust_proxy_headers {
        req.connection_info().realip_remote_addr().map(str::to_string)
    } else {
        req.peer_addr().map(|addr| addr.ip().to_string())
    };
    ip.unwrap_or_else(|| "unknown".to_string())
}

pub struct RateLimiterMiddleware<S> {
    service: S,
    state: Arc<RateLimiterState>,
    tokens: Option<TokenService>,
}

impl<S> RateLimiterMiddleware<S> {
    fn client_key(&self, req: &ServiceRequest) -> String {
        let subject = self.tokens.as_ref().and_then(|tokens| {
            bearer_token(req.headers(), req.query_string())
                .and_then(|token| tokens.verify(&token).ok())
                .map(|claims| claims.sub)
        });

        match subject {
            Some(user_id) => format!("user:{}", user_id),
            None => format!("ip:{}", client_ip(req, self.state.config.trust_proxy_headers)),
        }
    }
}

impl<S, B> Service<ServiceRequest> for RateLimiterMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(&self, ctx: &mut std::task::Context<'_>) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let key = self.client_key(&req);
        let (allowed, remaining) = self.state.check(&key);
        let max_requests = self.state.config.max_requests;

        if !allowed {
            tracing::debug!("Rate limit exceeded for {}", key);
            let mut response = ApiError::RateLimited.error_response();
            let headers = response.headers_mut();
            headers.insert(HeaderName::from_static("x-ratelimit-limit"), HeaderValue::from(max_requests));
            headers.insert(HeaderName::from_static("x-ratelimit-remaining"), HeaderValue::from(0u32));
            headers.insert(
                actix_web::http::header::RETRY_AFTER,
                HeaderValue::from(self.state.config.window_duration.as_secs()),
            );

            return Box::pin(async move { Ok(req.into_response(response).map_into_right_body()) });
        }

        let fut = self.service.call(req);

        Box::pin(async move {
            let mut res = fut.await?;
            let headers = res.headers_mut();
            headers.insert(HeaderName::from_static("x-ratelimit-limit"), HeaderValue::from(max_requests));
            headers.insert(HeaderName::from_static("x-ratelimit-remaining"), HeaderValue::from(remaining));
            Ok(res.map_into_left_body())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max_requests: u32, window: Duration) -> RateLimitConfig {
        RateLimitConfig {
            max_requests,
            window_duration: window,
            enabled: true,
            trust_proxy_headers: false,
        }
    }

    #[test]
    fn test_bucket_exhausts() {
        let state = RateLimiterState::new(config(2, Duration::from_secs(60)));
        assert_eq!(state.check("ip:1"), (true, 1));
        assert_eq!(state.check("ip:1"), (true, 0));
        assert_eq!(state.check("ip:1"), (false, 0));
        // Separate keys have separate buckets
        assert!(state.check("ip:2").0);
    }

    #[test]
    fn test_window_refills() {
        let state = RateLimiterState::new(config(1, Duration::from_millis(20)));
        assert!(state.check("k").0);
        assert!(!state.check("k").0);
        std::thread::sleep(Duration::from_millis(30));
        assert!(state.check("k").0);
    }

    #[test]
    fn test_disabled_always_allows() {
        let mut cfg = config(1, Duration::from_secs(60));
        cfg.enabled = false;
        let state = RateLimiterState::new(cfg);
        for _ in 0..5 {
            assert!(state.check("k").0);
        }
        assert_eq!(state.tracked_keys(), 0);
    }

    #[test]
    fn test_client_ip_ignores_forwarded_headers() {
        let peer: std::net::SocketAddr = "203.0.113.7:51000".parse().unwrap();
        let req = actix_web::test::TestRequest::default()
            .peer_addr(peer)
            .insert_header(("X-Forwarded-For", "198.51.100.1"))
            .to_srv_request();

        assert_eq!(client_ip(&req, false), "203.0.113.7");
        assert_eq!(client_ip(&req, true), "198.51.100.1");
    }

    #[test]
    fn test_cleanup_removes_idle() {
        let state = RateLimiterState::new(config(5, Duration::from_millis(5)));
        state.check("a");
        std::thread::sleep(Duration::from_millis(15));
        assert_eq!(state.cleanup(), 1);
        assert_eq!(state.tracked_keys(), 0);
    }
}
