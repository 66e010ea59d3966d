//! Rate Limiting Middleware
//!
//! Redis-based distributed rate limiting using a sliding window. Applied to
//! the auth endpoints (per client IP) and the device API (per terminal).
//! Without Redis the limiter is bypassed.

use std::net::{IpAddr, SocketAddr};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use redis::aio::ConnectionManager;
use serde::Serialize;

use crate::config::RateLimitSettings;
use crate::domain::Device;
use crate::infrastructure::cache::keys;
use crate::shared::error::ErrorResponse;
use crate::startup::AppState;

/// Endpoint group a limit applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitScope {
    /// Login, registration and token refresh
    Auth,
    /// Terminal API
    Device,
}

impl RateLimitScope {
    fn as_str(&self) -> &'static str {
        match self {
            RateLimitScope::Auth => "auth",
            RateLimitScope::Device => "device",
        }
    }

    fn limit(&self, settings: &RateLimitSettings) -> u32 {
        match self {
            RateLimitScope::Auth => settings.auth_requests_per_window,
            RateLimitScope::Device => settings.device_requests_per_window,
        }
    }
}

/// Rate limit status returned to clients.
#[derive(Debug, Clone, Serialize)]
pub struct RateLimitInfo {
    pub limit: u32,
    pub remaining: u32,
    /// Unix timestamp when the window resets
    pub reset_at: i64,
    pub retry_after: u64,
}

#[derive(Debug, Serialize)]
struct RateLimitExceededResponse {
    #[serde(flatten)]
    error: ErrorResponse,
    rate_limit: RateLimitInfo,
}

/// Members are `now_ms:random`, scored by time. Returns
/// `{allowed, count, limit, retry_after_ms}`.
const SLIDING_WINDOW_SCRIPT: &str = r#"
local key = KEYS[1]
local now_ms = tonumber(ARGV[1])
local window_start = tonumber(ARGV[2])
local max_requests = tonumber(ARGV[3])
local window_seconds = tonumber(ARGV[4])

redis.call('ZREMRANGEBYSCORE', key, '-inf', window_start)
local current_count = redis.call('ZCARD', key)

if current_count < max_requests then
    local member = now_ms .. ':' .. math.random(1000000)
    redis.call('ZADD', key, now_ms, member)
    redis.call('EXPIRE', key, window_seconds + 1)
    return {1, current_count + 1, max_requests, 0}
else
    local oldest = redis.call('ZRANGE', key, 0, 0, 'WITHSCORES')
    local retry_after = 0
    if oldest and #oldest >= 2 then
        retry_after = oldest[2] + (window_seconds * 1000) - now_ms
    end
    return {0, current_count, max_requests, retry_after}
end
"#;

/// Sliding window limiter over a Redis sorted set.
#[derive(Clone)]
pub struct RateLimiter {
    redis: ConnectionManager,
    scope: RateLimitScope,
    max_requests: u32,
    window_seconds: u64,
}

impl RateLimiter {
    pub fn new(redis: ConnectionManager, scope: RateLimitScope, settings: &RateLimitSettings) -> Self {
        Self {
            redis,
            scope,
            max_requests: scope.limit(settings).max(1),
            window_seconds: settings.window_seconds.max(1),
        }
    }

    /// `Ok` when the request is allowed, `Err` when the limit is reached.
    ///
    /// Redis failures let the request through.
    pub async fn check(&self, identifier: &str) -> Result<RateLimitInfo, RateLimitInfo> {
        let key = keys::rate_limit(self.scope.as_str(), identifier);
        let now_ms = chrono::Utc::now().timestamp_millis();
        let window_ms = (self.window_seconds * 1000) as i64;
        let reset_at = (now_ms / 1000) + self.window_seconds as i64;

        let mut conn = self.redis.clone();
        let result: Vec<i64> = match redis::Script::new(SLIDING_WINDOW_SCRIPT)
            .key(&key)
            .arg(now_ms)
            .arg(now_ms - window_ms)
            .arg(self.max_requests as i64)
            .arg(self.window_seconds as i64)
            .invoke_async(&mut conn)
            .await
        {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(error = %e, scope = self.scope.as_str(), "Rate limiter Redis error");
                return Ok(RateLimitInfo {
                    limit: self.max_requests,
                    remaining: self.max_requests,
                    reset_at,
                    retry_after: 0,
                });
            }
        };

        let allowed = result.first().copied() == Some(1);
        let count = result.get(1).copied().unwrap_or(0).max(0) as u32;
        let retry_ms = result.get(3).copied().unwrap_or(0).max(0);

        let info = RateLimitInfo {
            limit: self.max_requests,
            remaining: self.max_requests.saturating_sub(count),
            reset_at,
            retry_after: if allowed {
                0
            } else {
                ((retry_ms as f64) / 1000.0).ceil() as u64
            },
        };

        if allowed {
            Ok(info)
        } else {
            Err(info)
        }
    }
}

/// Client IP, honouring `X-Forwarded-For` and `X-Real-IP` from a proxy.
fn client_ip(headers: &HeaderMap, peer: Option<IpAddr>) -> Option<IpAddr> {
    headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|ip| ip.trim().parse().ok())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|h| h.to_str().ok())
                .and_then(|ip| ip.trim().parse().ok())
        })
        .or(peer)
}

fn identifier(request: &Request, peer: Option<IpAddr>) -> String {
    if let Some(device) = request.extensions().get::<Device>() {
        return format!("device:{}", device.id);
    }
    match client_ip(request.headers(), peer) {
        Some(ip) => format!("ip:{}", ip),
        None => {
            tracing::warn!("Could not determine client identifier for rate limiting");
            "ip:unknown".to_string()
        }
    }
}

/// Rate limiting for authentication endpoints.
pub async fn rate_limit_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    rate_limit_inner(state, request, next, RateLimitScope::Auth).await
}

/// Rate limiting for the device API; keyed by device once authenticated.
pub async fn rate_limit_device(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    rate_limit_inner(state, request, next, RateLimitScope::Device).await
}

async fn rate_limit_inner(
    state: AppState,
    request: Request,
    next: Next,
    scope: RateLimitScope,
) -> Response {
    let Some(redis) = state.redis.clone() else {
        return next.run(request).await;
    };

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip());
    let identifier = identifier(&request, peer);
    let limiter = RateLimiter::new(redis, scope, &state.settings.rate_limit);

    match limiter.check(&identifier).await {
        Ok(info) => {
            let mut response = next.run(request).await;
            add_rate_limit_headers(response.headers_mut(), &info);
            response
        }
        Err(info) => {
            tracing::warn!(identifier = %identifier, scope = scope.as_str(), "Rate limit exceeded");
            rate_limited_response(info)
        }
    }
}

fn add_rate_limit_headers(headers: &mut HeaderMap, info: &RateLimitInfo) {
    headers.insert("X-RateLimit-Limit", HeaderValue::from(info.limit));
    headers.insert("X-RateLimit-Remaining", HeaderValue::from(info.remaining));
    headers.insert("X-RateLimit-Reset", HeaderValue::from(info.reset_at));
}

fn rate_limited_response(info: RateLimitInfo) -> Response {
    let info = RateLimitInfo { remaining: 0, ..info };
    let body = RateLimitExceededResponse {
        error: ErrorResponse {
            code: 10006,
            message: "Too many requests, please slow down".to_string(),
            errors: None,
        },
        rate_limit: info.clone(),
    };

    let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
    response
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from(info.retry_after));
    add_rate_limit_headers(response.headers_mut(), &info);
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> RateLimitSettings {
        RateLimitSettings {
            auth_requests_per_window: 10,
            device_requests_per_window: 600,
            window_seconds: 60,
        }
    }

    #[test]
    fn test_scopes_use_their_own_limits() {
        assert_eq!(RateLimitScope::Auth.limit(&settings()), 10);
        assert_eq!(RateLimitScope::Device.limit(&settings()), 600);
    }

    #[test]
    fn test_forwarded_for_takes_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        let peer: IpAddr = "127.0.0.1".parse().unwrap();
        assert_eq!(client_ip(&headers, Some(peer)), "203.0.113.7".parse().ok());
    }

    #[test]
    fn test_peer_address_is_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("not-an-ip"));
        let peer: IpAddr = "192.0.2.1".parse().unwrap();
        assert_eq!(client_ip(&headers, Some(peer)), Some(peer));
    }

    #[test]
    fn test_rate_limited_response_sets_retry_after() {
        let response = rate_limited_response(RateLimitInfo {
            limit: 10,
            remaining: 3,
            reset_at: 0,
            retry_after: 12,
        });
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "12");
        assert_eq!(response.headers()["X-RateLimit-Remaining"], "0");
    }
}
