use std::sync::Arc;
use std::time::Duration;

use actix_cors::Cors;
use actix_web::{middleware::Compress, middleware::Logger, web, App, HttpServer};
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use wanderpair::auth::TokenService;
use wanderpair::config::{LoggingSettings, Settings};
use wanderpair::core::Matcher;
use wanderpair::error::{json_config, path_config, query_config};
use wanderpair::middleware::{RateLimitConfig, RateLimiter};
use wanderpair::models::ScoringWeights;
use wanderpair::routes;
use wanderpair::services::{CacheManager, PostgresClient, ScoreRefresher};
use wanderpair::state::AppState;

fn init_logging(logging: &LoggingSettings) {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if logging.format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.json().init();
    }
}

fn io_error(message: String) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, message)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = Settings::load().map_err(|e| io_error(format!("Configuration error: {}", e)))?;

    init_logging(&settings.logging);
    info!("Starting WanderPair service...");

    // Redis is optional; without it the L1 cache serves alone
    let cache_ttl = settings.cache.ttl_secs.unwrap_or(300);
    let l1_cache_size = settings.cache.l1_cache_size.unwrap_or(10_000);

    let cache = if settings.cache.redis_url.is_empty() {
        info!("Redis disabled, using in-process cache only");
        CacheManager::in_memory(l1_cache_size, cache_ttl)
    } else {
        match CacheManager::new(&settings.cache.redis_url, l1_cache_size, cache_ttl).await {
            Ok(c) => {
                info!("Cache manager initialized (L1: {} entries, TTL: {}s)", l1_cache_size, cache_ttl);
                c
            }
            Err(e) => {
                warn!("Failed to connect to Redis ({}), using in-process cache only", e);
                CacheManager::in_memory(l1_cache_size, cache_ttl)
            }
        }
    };
    let cache = Arc::new(cache);

    let db_max_conn = settings.database.max_connections.unwrap_or(10);
    let postgres = PostgresClient::from_settings(
        &settings.database.url,
        Some(db_max_conn),
        settings.database.min_connections,
        settings.database.acquire_timeout_secs,
        settings.database.idle_timeout_secs,
    )
    .await
    .map_err(|e| {
        error!("Failed to connect to PostgreSQL: {}", e);
        io_error(format!("PostgreSQL connection error: {}", e))
    })?;
    let postgres = Arc::new(postgres);

    info!("PostgreSQL client initialized (max: {} connections)", db_max_conn);

    let weights = ScoringWeights::from(&settings.scoring.weights);
    if weights.total() <= 0.0 {
        return Err(io_error("Scoring weights must sum to a positive value".to_string()));
    }
    let matcher = Matcher::new(weights, settings.matching.min_score);

    info!("Matcher initialized with weights: {:?}", weights);

    let tokens = TokenService::new(&settings.auth.jwt_secret, settings.auth.token_ttl_secs);

    let app_state = AppState::new(
        postgres.clone(),
        cache.clone(),
        tokens.clone(),
        settings.matching.clone(),
        matcher.clone(),
        settings.auth.bcrypt_cost,
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let refresher = if settings.refresh.enabled {
        let refresher = ScoreRefresher::new(
            postgres.clone(),
            cache.clone(),
            matcher,
            settings.matching.max_distance_km,
            Duration::from_secs(settings.refresh.interval_secs.max(1)),
            settings.refresh.batch_size,
        );
        Some(refresher.spawn(shutdown_rx.clone()))
    } else {
        info!("Score refresher disabled");
        None
    };

    let rate_limiter = RateLimiter::new(RateLimitConfig::from(&settings.rate_limit), Some(tokens));

    // Periodic cleanup of idle rate limit buckets and closed realtime channels
    {
        let limiter_state = rate_limiter.state();
        let hub = app_state.hub.clone();
        let mut shutdown = shutdown_rx.clone();
        let window = Duration::from_secs(settings.rate_limit.window_secs.max(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(window * 2);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = limiter_state.cleanup();
                        let pruned = hub.prune();
                        if removed + pruned > 0 {
                            tracing::debug!("Cleanup removed {} rate limit buckets, {} channels", removed, pruned);
                        }
                    }
                    _ = shutdown.changed() => break,
                }
            }
        });
    }

    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    let server = HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(json_config())
            .app_data(query_config())
            .app_data(path_config())
            .wrap(rate_limiter.clone())
            .wrap(cors)
            .wrap(Logger::default())
            .wrap(Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run();

    let result = server.await;

    info!("HTTP server stopped, shutting down background tasks");
    let _ = shutdown_tx.send(true);
    if let Some(handle) = refresher {
        if let Err(e) = handle.await {
            warn!("Score refresher ended abnormally: {}", e);
        }
    }

    result
}
