//! Rate limiting middleware using a sliding window counter
//!
//! Requests are keyed by the resolved client IP. The number of requests in
//! the current fixed window is combined with the previous window, weighted
//! by how much of it still overlaps the sliding window:
//!
//! ```text
//! rate = previous * (window - elapsed) / window + current
//! ```
//!
//! Counters live behind [`LimitCounter`]: Redis when a connection string is
//! configured so that every instance shares one budget, otherwise an
//! in-process map.
//!
//! Responses carry `X-RateLimit-Limit`, `X-RateLimit-Remaining` and
//! `X-RateLimit-Reset`; rejected requests get 429 with `Retry-After`.

use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use redis::aio::ConnectionManager;
use std::{
    sync::Arc,
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};
use tokio::time::sleep;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::{parse_counter_store_url, RateLimitConfig};
use crate::http::{
    middleware::{real_ip::ClientIp, request_id::request_id_of},
    responses::ErrorResponse,
};
use crate::types::Result;

const KEY_PREFIX: &str = "gatehouse:ratelimit";

const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Request counts for a key in the current and the previous fixed window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowCounts {
    pub current: u64,
    pub previous: u64,
}

/// Fixed window a request falls into
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowSlot {
    /// Start of the current window in unix seconds
    pub start: u64,
    pub length: Duration,
    /// Share of the previous window still inside the sliding window, in `[0, 1]`
    pub overlap: f64,
}

/// Result of an admission attempt
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Acquired {
    pub admitted: bool,
    /// Counts seen before this request was recorded
    pub counts: WindowCounts,
}

/// Keyed counter store backing the limiter
#[async_trait]
pub trait LimitCounter: Send + Sync {
    /// Read the counts for `key`, and record the request only if the sliding
    /// estimate including it stays within `limit`. Both steps are atomic.
    async fn try_acquire(&self, key: &str, slot: WindowSlot, limit: u32) -> Result<Acquired>;

    fn name(&self) -> &'static str;
}

/// Reads both windows, compares and counts in one server-side step.
/// Returns `{admitted, current, previous}` with counts from before the request.
const ACQUIRE_SCRIPT: &str = r#"
local current = tonumber(redis.call('GET', KEYS[1]) or '0')
local previous = tonumber(redis.call('GET', KEYS[2]) or '0')
local overlap = tonumber(ARGV[1])
local limit = tonumber(ARGV[2])
if previous * overlap + current + 1 > limit then
  return {0, current, previous}
end
redis.call('INCR', KEYS[1])
redis.call('EXPIRE', KEYS[1], tonumber(ARGV[3]))
return {1, current, previous}
"#;

/// Counter shared between instances through Redis
pub struct RedisCounter {
    connection: ConnectionManager,
    acquire: redis::Script,
}

impl RedisCounter {
    /// Connect to the store; fails when it cannot be reached
    pub async fn connect(url: &Url) -> Result<Self> {
        let client = redis::Client::open(url.as_str())?;
        let connection = ConnectionManager::new(client).await?;
        Ok(Self {
            connection,
            acquire: redis::Script::new(ACQUIRE_SCRIPT),
        })
    }

    fn key(key: &str, window_start: u64) -> String {
        format!("{}:{}:{}", KEY_PREFIX, key, window_start)
    }
}

#[async_trait]
impl LimitCounter for RedisCounter {
    async fn try_acquire(&self, key: &str, slot: WindowSlot, limit: u32) -> Result<Acquired> {
        let mut connection = self.connection.clone();
        let length = slot.length.as_secs();
        let previous_start = slot.start.saturating_sub(length);
        // Keep the key alive while it can still be the previous window
        let ttl = length * 3;

        let (admitted, current, previous): (i64, u64, u64) = self
            .acquire
            .key(Self::key(key, slot.start))
            .key(Self::key(key, previous_start))
            .arg(slot.overlap)
            .arg(limit)
            .arg(ttl)
            .invoke_async(&mut connection)
            .await?;

        Ok(Acquired {
            admitted: admitted == 1,
            counts: WindowCounts { current, previous },
        })
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

#[derive(Debug, Clone)]
struct LocalWindow {
    window_start: u64,
    current: u64,
    previous: u64,
    last_access: Instant,
}

impl LocalWindow {
    /// Counts as seen from `window_start`, shifting stale windows out
    fn counts_at(&self, window_start: u64, window: u64) -> WindowCounts {
        if self.window_start == window_start {
            WindowCounts {
                current: self.current,
                previous: self.previous,
            }
        } else if self.window_start + window == window_start {
            WindowCounts {
                current: 0,
                previous: self.current,
            }
        } else {
            WindowCounts::default()
        }
    }

    fn is_stale(&self, threshold: Duration) -> bool {
        Instant::now().duration_since(self.last_access) > threshold
    }
}

/// In-process counter for single instance deployments
#[derive(Default)]
pub struct LocalCounter {
    windows: Arc<DashMap<String, LocalWindow>>,
}

impl LocalCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a background task to clean up stale entries
    pub fn start_cleanup_task(&self, window: Duration) {
        let windows = self.windows.clone();
        let threshold = window * 2;
        tokio::spawn(async move {
            loop {
                sleep(window.max(Duration::from_secs(1))).await;
                let before = windows.len();
                windows.retain(|_, entry| !entry.is_stale(threshold));
                let removed = before.saturating_sub(windows.len());
                if removed > 0 {
                    debug!("Rate limiter: cleaned up {} stale entries", removed);
                }
            }
        });
    }

    #[cfg(test)]
    fn active_keys(&self) -> usize {
        self.windows.len()
    }
}

#[async_trait]
impl LimitCounter for LocalCounter {
    async fn try_acquire(&self, key: &str, slot: WindowSlot, limit: u32) -> Result<Acquired> {
        let now = Instant::now();
        // The entry guard holds the shard lock across the read and the write
        let mut entry = self
            .windows
            .entry(key.to_string())
            .or_insert_with(|| LocalWindow {
                window_start: slot.start,
                current: 0,
                previous: 0,
                last_access: now,
            });

        let counts = entry.counts_at(slot.start, slot.length.as_secs());
        let admitted = admits(counts, slot.overlap, limit);

        entry.window_start = slot.start;
        entry.current = counts.current + u64::from(admitted);
        entry.previous = counts.previous;
        entry.last_access = now;

        Ok(Acquired { admitted, counts })
    }

    fn name(&self) -> &'static str {
        "local"
    }
}

/// Outcome of a rate limit check
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Unix time at which the current window ends
    pub reset_at: u64,
    pub retry_after: Duration,
}

impl Decision {
    fn apply_headers(&self, headers: &mut HeaderMap) {
        headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(self.limit));
        headers.insert(
            X_RATELIMIT_REMAINING,
            HeaderValue::from(self.remaining),
        );
        headers.insert(X_RATELIMIT_RESET, HeaderValue::from(self.reset_at));
        if !self.allowed {
            headers.insert(
                axum::http::header::RETRY_AFTER,
                HeaderValue::from(self.retry_after.as_secs()),
            );
        }
    }
}

/// Sliding window rate limiter
pub struct RateLimiter {
    counter: Arc<dyn LimitCounter>,
    limit: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(counter: Arc<dyn LimitCounter>, limit: u32, window: Duration) -> Self {
        Self {
            counter,
            limit,
            window: window.max(Duration::from_secs(1)),
        }
    }

    /// Build the limiter described by the configuration, if limiting is on.
    ///
    /// A configured counter store must parse and be reachable.
    pub async fn from_config(config: &RateLimitConfig) -> Result<Option<Arc<Self>>> {
        if !config.is_active() {
            return Ok(None);
        }

        let counter: Arc<dyn LimitCounter> = match config.redis_url.as_deref() {
            Some(raw) if !raw.is_empty() => {
                let url = parse_counter_store_url(raw)?;
                info!(
                    host = url.host_str().unwrap_or_default(),
                    port = url.port(),
                    "Connecting to rate limit counter store"
                );
                Arc::new(RedisCounter::connect(&url).await?)
            }
            _ => {
                let counter = LocalCounter::new();
                counter.start_cleanup_task(config.window());
                Arc::new(counter)
            }
        };

        info!(
            backend = counter.name(),
            requests = config.requests,
            window_secs = config.window,
            "Rate limiter initialized"
        );

        Ok(Some(Arc::new(Self::new(
            counter,
            config.requests,
            config.window(),
        ))))
    }

    /// Check and, when admitted, count a request for `key`
    pub async fn check(&self, key: &str) -> Result<Decision> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        self.check_at(key, now).await
    }

    async fn check_at(&self, key: &str, now: Duration) -> Result<Decision> {
        let window_secs = self.window.as_secs();
        let now_secs = now.as_secs();
        let window_start = now_secs - now_secs % window_secs;
        let reset_at = window_start + window_secs;

        let slot = WindowSlot {
            start: window_start,
            length: self.window,
            overlap: overlap(now.as_secs_f64() - window_start as f64, window_secs as f64),
        };
        let acquired = self.counter.try_acquire(key, slot, self.limit).await?;

        if !acquired.admitted {
            return Ok(Decision {
                allowed: false,
                limit: self.limit,
                remaining: 0,
                reset_at,
                retry_after: Duration::from_secs(reset_at.saturating_sub(now_secs).max(1)),
            });
        }

        let rate = estimate_rate(acquired.counts, slot.overlap);
        Ok(Decision {
            allowed: true,
            limit: self.limit,
            remaining: (self.limit as f64 - rate - 1.0).max(0.0).floor() as u32,
            reset_at,
            retry_after: Duration::ZERO,
        })
    }
}

fn overlap(elapsed: f64, window: f64) -> f64 {
    ((window - elapsed) / window).clamp(0.0, 1.0)
}

fn estimate_rate(counts: WindowCounts, overlap: f64) -> f64 {
    counts.previous as f64 * overlap + counts.current as f64
}

/// Whether one more request keeps the sliding estimate within `limit`
fn admits(counts: WindowCounts, overlap: f64, limit: u32) -> bool {
    estimate_rate(counts, overlap) + 1.0 <= limit as f64
}

/// Axum middleware for rate limiting
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let client_ip = match request.extensions().get::<ClientIp>() {
        Some(ClientIp(ip)) => *ip,
        None => {
            warn!("Could not determine client IP address for rate limiting");
            return next.run(request).await;
        }
    };

    match limiter.check(&client_ip.to_string()).await {
        Ok(decision) if decision.allowed => {
            let mut response = next.run(request).await;
            decision.apply_headers(response.headers_mut());
            response
        }
        Ok(decision) => {
            warn!(
                client_ip = %client_ip,
                uri = %request.uri(),
                method = %request.method(),
                retry_after_secs = decision.retry_after.as_secs(),
                "Request rate limited"
            );
            crate::metrics::record_rate_limited();

            let mut response =
                ErrorResponse::from_status(StatusCode::TOO_MANY_REQUESTS, request_id_of(&request))
                    .into_response();
            decision.apply_headers(response.headers_mut());
            response
        }
        Err(e) => {
            warn!(
                error = %e,
                client_ip = %client_ip,
                "Rate limit counter unavailable, admitting request"
            );
            next.run(request).await
        }
    }
}
