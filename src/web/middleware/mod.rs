//! Middleware for Web API.

pub mod cors;
pub mod rate_limit;

pub use cors::create_cors_layer;
pub use rate_limit::{api_rate_limit, client_ip, upload_rate_limit, RateLimitState};
