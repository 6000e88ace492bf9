use crate::config::Config;
use crate::dispatcher::ToolDispatcher;
use crate::error::Error;
use crate::server::{self, AppState};
use crate::shutdown;
use crate::store::EventStore;
use std::sync::Arc;
use tokio::sync::{oneshot, RwLock};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Initialize logging with environment-based configuration
pub fn init_logging() -> miette::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=warn")),
        )
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| Error::Config(format!("Failed to set up logging: {}", e)))?;

    Ok(())
}

/// Load and initialize the application config
pub async fn load_config() -> miette::Result<Arc<RwLock<Config>>> {
    match Config::load() {
        Ok(config) => Ok(Arc::new(RwLock::new(config))),
        Err(e) => {
            error!("Failed to load configuration: {:?}", e);
            Err(e.into())
        }
    }
}

/// Initialize and start the tool server
pub async fn start_server(config: Arc<RwLock<Config>>) -> miette::Result<()> {
    let bind_address = {
        let config_read = config.read().await;
        config_read.bind_address.clone()
    };

    // The event store lives for the process lifetime and is shared with the
    // dispatcher; no persistence beyond that.
    let store = Arc::new(RwLock::new(EventStore::new()));
    let dispatcher = Arc::new(ToolDispatcher::new(Arc::clone(&store), Arc::clone(&config)));
    let app = server::router(AppState { dispatcher });

    // Create shutdown channel
    let (shutdown_send, shutdown_recv) = oneshot::channel();

    // Spawn signal handler task
    tokio::spawn(async move {
        shutdown::handle_signals(shutdown_send).await;
    });

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .map_err(Error::from)?;
    info!("Listening on {}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_recv.await;
            info!("Shutting down server");
        })
        .await
        .map_err(Error::from)?;

    Ok(())
}
