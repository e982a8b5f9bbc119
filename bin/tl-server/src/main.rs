//! TechLab Server
//!
//! Products REST API behind bearer-token authentication.
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `TECHLAB_CONFIG` | - | Path to a TOML config file |
//! | `TECHLAB_HTTP_PORT` | `3000` | HTTP API port |
//! | `TECHLAB_STORAGE_BACKEND` | `mongodb` | `mongodb` or `memory` |
//! | `TECHLAB_MONGODB_URI` | `mongodb://localhost:27017` | MongoDB connection URI |
//! | `TECHLAB_MONGODB_DATABASE` | `techlab` | MongoDB database name |
//! | `TECHLAB_STORAGE_REQUIRED` | `false` | Exit when the store cannot be opened |
//! | `TECHLAB_JWT_SECRET` | - | HS256 signing secret |
//! | `TECHLAB_JWT_EXPIRES_IN` | `24h` | Token lifetime |
//! | `TECHLAB_ADMIN_EMAIL` / `TECHLAB_ADMIN_PASSWORD` | `admin@techlab.com` / `admin123` | Admin credentials |
//! | `TECHLAB_DEV_MODE` | `false` | Include internal detail in error responses |
//! | `RUST_LOG` | `info` | Log level |
//! | `LOG_FORMAT` | `text` | `json` for structured output |

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal};
use tracing::{error, info, warn};

use tl_config::{AppConfig, ConfigLoader, StorageBackend, StorageConfig};
use tl_platform::{
    build_router, AdminCredentials, AppServices, AuthService, DispatcherConfig, DocumentStore,
    ErrorPolicy, MemoryDocumentStore, MongoDocumentStore, ProductService, TokenService,
    UnavailableStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    tl_common::logging::init_logging("tl-server");

    let config = ConfigLoader::new()
        .load()
        .context("Failed to load configuration")?;
    let tokens = Arc::new(TokenService::from_config(&config.auth)?);
    warn_on_insecure_defaults(&config, &tokens);
    info!(ttl_secs = tokens.ttl().as_secs(), "Token service ready");
    let auth = Arc::new(AuthService::new(
        tokens.clone(),
        AdminCredentials::from_config(&config.auth),
    ));

    let store = open_store(&config.storage).await?;
    let products = Arc::new(ProductService::new(store, config.storage.collection.clone()));

    let services = AppServices {
        tokens,
        auth,
        products,
    };
    let dispatcher = DispatcherConfig {
        error_policy: ErrorPolicy::for_dev_mode(config.dev_mode),
        cors_origins: config.http.cors_origins.clone(),
    };
    let app = build_router(services, &dispatcher);

    let addr = config.http.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("TechLab API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("TechLab Server shutdown complete");
    Ok(())
}

/// Open the configured backend. When that fails and storage is not
/// required, every product call reports the failure instead.
async fn open_store(config: &StorageConfig) -> Result<Arc<dyn DocumentStore>> {
    match config.backend {
        StorageBackend::Memory => {
            warn!("Using in-memory storage; data is lost on restart");
            Ok(Arc::new(MemoryDocumentStore::new()))
        }
        StorageBackend::Mongodb => {
            info!(uri = %config.mongodb.uri, database = %config.mongodb.database, "Connecting to MongoDB");
            match MongoDocumentStore::connect(&config.mongodb).await {
                Ok(store) => Ok(Arc::new(store)),
                Err(e) if config.required => {
                    Err(e).context("Document store is required but could not be opened")
                }
                Err(e) => {
                    error!(error = %e, "Document store unavailable; product requests will fail");
                    Ok(Arc::new(UnavailableStore::new(e.to_string())))
                }
            }
        }
    }
}

fn warn_on_insecure_defaults(config: &AppConfig, tokens: &TokenService) {
    if !tokens.is_configured() {
        warn!("TECHLAB_JWT_SECRET is not set; login and protected routes will fail");
    }
    if config.auth.uses_default_password() {
        warn!(email = %config.auth.admin_email, "Admin account uses the default password");
    }
    if config.dev_mode {
        warn!("Development mode enabled; error responses include internal detail");
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
