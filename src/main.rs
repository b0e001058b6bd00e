use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, info};

use studio_drive::config::DriveBackend;
use studio_drive::drive::StaticToken;
use studio_drive::web::WebServer;
use studio_drive::{Config, DriveProvider, GoogleDriveClient, MemoryDrive};

const DEFAULT_CONFIG_PATH: &str = "config.toml";

fn build_provider(config: &Config) -> studio_drive::Result<Arc<dyn DriveProvider>> {
    match config.drive.backend {
        DriveBackend::Google => {
            let tokens = Arc::new(StaticToken::new(config.drive.access_token.clone()));
            Ok(Arc::new(GoogleDriveClient::new(&config.drive, tokens)?))
        }
        DriveBackend::Memory => Ok(Arc::new(MemoryDrive::new(
            config.drive.root_folder_id.clone(),
        ))),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    // Load configuration
    let mut config = match Config::load_with_env(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {config_path}: {e}");
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    // Initialize logging
    if let Err(e) = studio_drive::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        studio_drive::logging::init_console_only(&config.logging.level);
    }

    if config.drive.backend == DriveBackend::Memory && config.drive.root_folder_id.is_empty() {
        config.drive.root_folder_id = "root".to_string();
    }

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return ExitCode::FAILURE;
    }

    info!("studio-drive - creator studio media service");
    info!(
        backend = ?config.drive.backend,
        root_folder = %config.drive.root_folder_id,
        "Server configured on {}:{}",
        config.server.host,
        config.server.port
    );

    let provider = match build_provider(&config) {
        Ok(provider) => provider,
        Err(e) => {
            error!("Failed to create drive client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let server = match WebServer::new(&config, provider) {
        Ok(server) => server,
        Err(e) => {
            error!("Failed to create web server: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = server.run().await {
        error!("Web server error: {}", e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
