//! Web server for the media API.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;

use crate::config::Config;
use crate::drive::DriveProvider;
use crate::{Result, StudioError};

use super::handlers::AppState;
use super::middleware::RateLimitState;
use super::openapi::create_swagger_router;
use super::router::{create_health_router, create_router};

/// Build the complete application router: API, health check and, when
/// enabled, Swagger UI.
pub fn build_app(app_state: Arc<AppState>, rate_limit_state: Arc<RateLimitState>, config: &Config) -> Router {
    let mut router = create_router(app_state, rate_limit_state, &config.web.cors_origins)
        .merge(create_health_router());

    if config.web.swagger {
        router = router.merge(create_swagger_router());
    }
    router
}

/// Web server for the API.
pub struct WebServer {
    /// Server address.
    addr: SocketAddr,
    /// Application state.
    app_state: Arc<AppState>,
    /// Per-IP limits.
    rate_limit_state: Arc<RateLimitState>,
    /// Full configuration.
    config: Config,
}

impl WebServer {
    /// Create a new web server.
    pub fn new(config: &Config, provider: Arc<dyn DriveProvider>) -> Result<Self> {
        let addr = format!("{}:{}", config.server.host, config.server.port)
            .parse()
            .map_err(|e| StudioError::Config(format!("invalid server address: {e}")))?;

        let app_state = Arc::new(AppState::new(provider, config));
        let rate_limit_state = Arc::new(RateLimitState::new(
            config.web.api_rate_limit,
            config.uploads.rate_limit_per_minute,
        ));

        Ok(Self {
            addr,
            app_state,
            rate_limit_state,
            config: config.clone(),
        })
    }

    fn router(&self) -> Router {
        build_app(
            self.app_state.clone(),
            self.rate_limit_state.clone(),
            &self.config,
        )
    }

    /// Run the server until it fails.
    pub async fn run(self) -> std::result::Result<(), std::io::Error> {
        let router = self.router();
        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;

        self.rate_limit_state.clone().start_cleanup_task();
        tracing::info!("Web server listening on http://{}", local_addr);

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
    }

    /// Run the server in the background and return the actual bound address.
    ///
    /// This is useful for testing when binding to port 0.
    pub async fn run_with_addr(self) -> std::result::Result<SocketAddr, std::io::Error> {
        let router = self.router();
        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;

        self.rate_limit_state.clone().start_cleanup_task();
        tracing::info!("Web server listening on http://{}", local_addr);

        tokio::spawn(async move {
            if let Err(e) = axum::serve(
                listener,
                router.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            {
                tracing::error!("Web server error: {}", e);
            }
        });

        Ok(local_addr)
    }
}
