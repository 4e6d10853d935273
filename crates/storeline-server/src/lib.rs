//! Storeline HTTP server.
//!
//! A JSON API over the commerce repositories: the storefront under `/api`
//! and the admin dashboard under `/admin/api`.
//!
//! # Example
//!
//! ```rust,ignore
//! use storeline_server::{config::StorelineConfig, serve, AppState};
//!
//! let config = StorelineConfig::default();
//! let state = AppState::connect(config).await?;
//! serve(state).await?;
//! ```

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod state;
pub mod telemetry;

pub use config::StorelineConfig;
pub use error::{ApiError, ApiResult};
pub use routes::router;
pub use state::AppState;

use anyhow::{Context, Result};
use tracing::info;

/// Bind the configured address and serve until Ctrl-C.
pub async fn serve(state: AppState) -> Result<()> {
    let bind = state.config.server.bind.clone();
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;
    let local = listener.local_addr().context("Failed to read local address")?;
    info!(addr = %local, "storeline listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("storeline stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown requested");
    }
}
