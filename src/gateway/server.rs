//! Router assembly and server lifecycle.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, put};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::config::GatewayConfig;
use crate::engine::ContainerEngine;
use crate::error::ServerError;
use crate::gateway::handlers::*;

/// State shared by every handler.
#[derive(Clone)]
pub struct GatewayState {
    pub engine: Arc<dyn ContainerEngine>,
}

impl GatewayState {
    pub fn new(engine: Arc<dyn ContainerEngine>) -> Self {
        Self { engine }
    }
}

/// Build the gateway router with all API routes and request tracing.
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/v1/create_container", put(create_container_handler))
        .route("/api/v1/get_container", get(get_container_handler))
        .route("/api/v1/stop_container", get(stop_container_handler))
        .route("/api/v1/create_service", put(create_service_handler))
        .route("/api/v1/get_service", get(get_service_handler))
        .route("/api/v1/remove_service", get(remove_service_handler))
        .route("/api/v1/scale_service", put(scale_service_handler))
        .route("/api/v1/get_service_tasks", get(get_service_tasks_handler))
        .route("/api/v1/volumes/create_volume", put(create_volume_handler))
        .route("/api/v1/volumes/get_volume", get(get_volume_handler))
        .route("/api/v1/volumes/remove_volume", get(remove_volume_handler))
        .route("/api/v1/volumes/list_volumes", get(list_volumes_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind the configured address and serve until Ctrl-C or SIGTERM.
pub async fn serve(config: &GatewayConfig, state: GatewayState) -> Result<(), ServerError> {
    let addr_str = config.listen_addr();
    let addr: SocketAddr = tokio::net::lookup_host(addr_str.as_str())
        .await
        .map_err(|e| ServerError::InvalidAddress {
            addr: addr_str.clone(),
            reason: e.to_string(),
        })?
        .next()
        .ok_or_else(|| ServerError::InvalidAddress {
            addr: addr_str.clone(),
            reason: "address resolved to nothing".to_string(),
        })?;

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::Bind {
            addr: addr_str.clone(),
            reason: e.to_string(),
        })?;

    tracing::info!("Gateway listening on {}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Gateway shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
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
    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubEngine;

    #[tokio::test]
    async fn test_serve_rejects_bad_address() {
        let config = GatewayConfig {
            host: "not an address".to_string(),
            port: 5000,
        };
        let state = GatewayState::new(Arc::new(StubEngine::new()));
        let err = serve(&config, state).await.unwrap_err();
        assert!(matches!(err, ServerError::InvalidAddress { .. }));
    }

    #[tokio::test]
    async fn test_serve_reports_bind_failure() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = taken.local_addr().unwrap().port();
        let config = GatewayConfig {
            host: "127.0.0.1".to_string(),
            port,
        };
        let state = GatewayState::new(Arc::new(StubEngine::new()));
        let err = serve(&config, state).await.unwrap_err();
        assert!(matches!(err, ServerError::Bind { .. }));
    }
}
