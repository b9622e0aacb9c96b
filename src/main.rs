use std::net::SocketAddr;
use std::sync::Arc;

use exam_backend::{
    config::{get_config, init_config, LogFormat, StorageBackend},
    database::pool::{create_pool, run_migrations},
    middleware::rate_limit::RateLimiter,
    routes,
    store::{MemoryStore, PgStore},
    AppState,
};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_config()?;
    let config = get_config();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }

    let app_state = match config.storage_backend {
        StorageBackend::Postgres => {
            let pool = create_pool(config).await?;
            run_migrations(&pool).await?;
            info!("Database connected, migrations applied");
            AppState::from_store(Arc::new(PgStore::new(pool)))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            AppState::from_store(Arc::new(MemoryStore::new()))
        }
    };

    let app = routes::create_router(app_state, RateLimiter::per_second(config.api_rps));

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
