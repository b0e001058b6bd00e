//! HTTP API for project media.
//!
//! Routes live under `/api/drive`; `/health` and the Swagger UI sit beside
//! them.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use handlers::AppState;
pub use middleware::RateLimitState;
pub use router::create_router;
pub use server::{build_app, WebServer};
