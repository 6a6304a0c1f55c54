//! Server instance management

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, extract::DefaultBodyLimit, http::HeaderValue};
use leafscan::Pipeline;
use shops::ShopLookup;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::handlers::{AppState, create_router};

/// Router with state and middleware applied
pub fn build_app(state: AppState) -> Router {
    let body_limit = state.config.body_limit_bytes;
    let cors = cors_layer(&state.config.cors_origins);

    create_router()
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    layer.allow_origin(parsed)
}

/// Leaf classifier HTTP server
///
/// Owns the shared pipeline and shop lookup, and runs Axum until a shutdown
/// signal arrives.
pub struct LeafServer {
    config: ServerConfig,
    state: AppState,
}

impl LeafServer {
    pub fn new(pipeline: Pipeline, shops: Arc<dyn ShopLookup>, config: ServerConfig) -> Result<Self, ServerError> {
        config.validate()?;
        let state = AppState::new(pipeline, shops, config.clone());
        Ok(Self { config, state })
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ServerError> {
        self.config.socket_addr()
    }

    #[must_use]
    pub fn server_url(&self) -> String {
        self.config.server_url()
    }

    #[must_use]
    pub fn router(&self) -> Router {
        build_app(self.state.clone())
    }

    /// Bind and serve until Ctrl+C or SIGTERM
    pub async fn run(self) -> Result<(), ServerError> {
        let addr = self.socket_addr()?;
        let app = self.router();

        let listener = tokio::net::TcpListener::bind(addr).await.map_err(|source| {
            error!("Failed to bind to {}: {}", addr, source);
            ServerError::Bind { addr, source }
        })?;

        info!("Server listening on: {}", self.server_url());

        axum::serve(listener, app)
            .with_graceful_shutdown(wait_for_shutdown())
            .await?;

        info!("Server stopped");
        Ok(())
    }
}

/// Resolve on Ctrl+C, or SIGTERM on unix
pub async fn wait_for_shutdown() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received shutdown signal"),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix;
        match unix::signal(unix::SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
                info!("Received TERM signal");
            }
            Err(e) => {
                error!("Failed to install TERM handler: {}", e);
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use leafscan::{ClassificationModel, ImageTensor, InputSize};
    use shops::{Coordinates, Shop};

    struct Uniform;

    impl ClassificationModel for Uniform {
        fn input_size(&self) -> InputSize {
            InputSize::new(16, 16)
        }

        fn num_classes(&self) -> usize {
            38
        }

        fn predict(&self, _input: &ImageTensor) -> leafscan::Result<Vec<f32>> {
            Ok(vec![1.0 / 38.0; 38])
        }
    }

    struct NoShops;

    #[async_trait]
    impl ShopLookup for NoShops {
        async fn find_shops(&self, _coords: Coordinates) -> shops::Result<Vec<Shop>> {
            Ok(Vec::new())
        }
    }

    fn pipeline() -> Pipeline {
        Pipeline::builder().model(Uniform).build().unwrap()
    }

    #[test]
    fn test_new_validates_config() {
        let config = ServerConfig { log_level: "loud".into(), ..Default::default() };
        assert!(matches!(
            LeafServer::new(pipeline(), Arc::new(NoShops), config),
            Err(ServerError::Config(_))
        ));
    }

    #[test]
    fn test_server_url() {
        let config = ServerConfig { host: "0.0.0.0".into(), port: 9000, ..Default::default() };
        let server = LeafServer::new(pipeline(), Arc::new(NoShops), config).unwrap();
        assert_eq!(server.server_url(), "http://0.0.0.0:9000");
        assert_eq!(server.socket_addr().unwrap().port(), 9000);
    }

    #[test]
    fn test_cors_accepts_wildcard_and_lists() {
        let _ = cors_layer(&["*".to_string()]);
        let _ = cors_layer(&["http://localhost:3000".to_string(), "not a header\n".to_string()]);
    }
}
