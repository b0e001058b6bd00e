//! Rate limiting middleware.
//!
//! Two limits apply, both keyed by caller IP:
//! - a general per-minute quota on every API route (token bucket)
//! - a strict sliding-window ceiling on the upload route

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use std::{net::SocketAddr, num::NonZeroU32, sync::Arc, time::Duration};

use crate::rate_limit::{RateLimitConfig, RateLimitResult, SlidingWindowLimiter};
use crate::web::error::ApiError;

/// Message returned when the upload ceiling is hit.
pub const UPLOAD_LIMIT_MESSAGE: &str = "Too many upload requests, please try again later";

/// How often idle limiter entries are dropped.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

/// Per-IP limits shared by the middleware functions.
pub struct RateLimitState {
    api: DefaultKeyedRateLimiter<String>,
    uploads: SlidingWindowLimiter,
}

impl RateLimitState {
    /// Create limits from requests-per-minute values. Zero is treated as one.
    pub fn new(api_per_minute: u32, uploads_per_minute: u32) -> Self {
        let quota = Quota::per_minute(NonZeroU32::new(api_per_minute).unwrap_or(NonZeroU32::MIN));
        Self {
            api: RateLimiter::keyed(quota),
            uploads: SlidingWindowLimiter::new(RateLimitConfig::per_minute(
                uploads_per_minute.max(1),
            )),
        }
    }

    /// Check the general API quota.
    pub fn check_api(&self, ip: &str) -> bool {
        self.api.check_key(&ip.to_string()).is_ok()
    }

    /// Check and record an upload attempt.
    pub fn check_upload(&self, ip: &str) -> RateLimitResult {
        self.uploads.check_and_record(ip)
    }

    /// Drop state for callers that have been quiet.
    pub fn cleanup(&self) {
        self.api.retain_recent();
        self.uploads.cleanup();
    }

    /// Start a background task to periodically clean up old entries.
    pub fn start_cleanup_task(self: Arc<Self>) {
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(CLEANUP_INTERVAL).await;
                self.cleanup();
            }
        });
    }
}

/// Extract client IP from request.
///
/// First `X-Forwarded-For` hop, then `X-Real-IP`, then the peer address.
pub fn client_ip(req: &Request<Body>) -> String {
    let header = |name: &str| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    if let Some(ip) = header("X-Forwarded-For").and_then(|v| v.split(',').next()) {
        return ip.trim().to_string();
    }

    if let Some(ip) = header("X-Real-IP") {
        return ip.to_string();
    }

    if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }

    "unknown".to_string()
}

/// General API rate limit.
pub async fn api_rate_limit(state: Arc<RateLimitState>, req: Request<Body>, next: Next) -> Response {
    let ip = client_ip(&req);

    if !state.check_api(&ip) {
        tracing::warn!(ip = %ip, "API rate limit exceeded");
        return ApiError::too_many_requests("Too many requests, please try again later")
            .with_retry_after(Duration::from_secs(1))
            .into_response();
    }

    next.run(req).await
}

/// Upload route rate limit.
pub async fn upload_rate_limit(
    state: Arc<RateLimitState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let ip = client_ip(&req);

    if let RateLimitResult::Denied { retry_after } = state.check_upload(&ip) {
        tracing::warn!(ip = %ip, retry_after_secs = retry_after.as_secs(), "Upload rate limit exceeded");
        return ApiError::too_many_requests(UPLOAD_LIMIT_MESSAGE)
            .with_retry_after(retry_after)
            .into_response();
    }

    next.run(req).await
}
