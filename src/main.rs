//src/main.rs

use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

mod common;
mod config;
mod db;
mod handlers;
mod middleware;
mod models;
mod resilience;
mod routes;
mod services;
#[cfg(test)]
mod test_utils;

use crate::config::{AppState, Config};
use crate::services::sync::OccupancySync;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("fermes_backend=info")),
        )
        .with_target(false)
        .compact()
        .init();

    let config = Config::from_env()?;
    let bind_address = config.bind_address.clone();
    let reconcile_interval = config.reconcile_interval;
    let superadmin = config.superadmin_email.clone().zip(config.superadmin_password.clone());

    // Configuration or connection failures stop the process here
    let app_state = AppState::new(config).await?;

    if let Some((email, password)) = superadmin {
        app_state
            .auth_service
            .ensure_superadmin(&email, &password)
            .await
            .map_err(|e| anyhow::anyhow!("superadmin bootstrap failed: {e}"))?;
    }

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let sync_handle = match reconcile_interval {
        Some(interval) => {
            let sync = OccupancySync::new(app_state.store.clone(), app_state.occupancy_service.clone(), interval);
            Some(tokio::spawn(sync.run(shutdown_tx.subscribe())))
        }
        None => {
            tracing::info!("Periodic occupancy sync disabled");
            None
        }
    };

    let app = routes::app_router(app_state);

    let listener = TcpListener::bind(&bind_address).await?;
    tracing::info!("🚀 Server listening on {}", listener.local_addr()?);

    let server_shutdown = shutdown_tx.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
            tracing::info!("Shutdown signal received");
            let _ = server_shutdown.send(());
        })
        .await?;

    if let Some(handle) = sync_handle {
        // The loop exits on the broadcast above
        let _ = handle.await;
    }

    tracing::info!("👋 Server stopped");
    Ok(())
}
