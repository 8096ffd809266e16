//! # REST API HTTP Server
//!
//! Axum router for the tours API, plus static files and the 404 fallback.

use std::net::SocketAddr;
use std::path::Path;

use axum::handler::HandlerWithoutStateExt;
use axum::middleware;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::handlers::{
    create_tour, delete_tour, get_tour, health, list_tours, monthly_plan, not_found, top_tours,
    tour_stats, update_tour,
};
use super::middleware::render_errors;
use crate::config::{AppConfig, Environment};
use crate::tours::TourService;

/// Path prefix of every API route
pub const API_PREFIX: &str = "/api/v1";

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub tours: TourService,
    pub environment: Environment,
}

impl AppState {
    pub fn new(tours: TourService, environment: Environment) -> Self {
        Self { tours, environment }
    }
}

/// HTTP server for the tours API
pub struct RestServer {
    config: AppConfig,
    router: Router,
}

impl RestServer {
    pub fn new(config: AppConfig, tours: TourService) -> Self {
        let state = AppState::new(tours, config.environment);
        let router = build_router(state, &config.public_dir, &config.cors_origins);
        Self { config, router }
    }

    /// Get the socket address
    pub fn socket_addr(&self) -> String {
        self.config.socket_addr()
    }

    /// Get the router (for testing)
    pub fn router(self) -> Router {
        self.router
    }

    /// Serves until Ctrl-C or SIGTERM.
    pub async fn start(self) -> Result<(), std::io::Error> {
        let addr: SocketAddr = self.socket_addr().parse().map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("invalid listen address {}: {}", self.socket_addr(), e),
            )
        })?;

        let listener = TcpListener::bind(addr).await?;
        info!(
            %addr,
            environment = %self.config.environment,
            public_dir = %self.config.public_dir.display(),
            "App running on port {}",
            addr.port()
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("server stopped");
        Ok(())
    }
}

/// Tour routes, relative to [`API_PREFIX`]
fn tour_routes() -> Router<AppState> {
    Router::new()
        .route("/tours", get(list_tours).post(create_tour))
        .route("/tours/top-5-cheap", get(top_tours))
        .route("/tours/tour-stats", get(tour_stats))
        .route("/tours/monthly-plan/{year}", get(monthly_plan))
        .route(
            "/tours/{id}",
            get(get_tour).patch(update_tour).delete(delete_tour),
        )
}

/// Builds the full application router.
pub fn build_router(state: AppState, public_dir: &Path, cors_origins: &[String]) -> Router {
    let static_files = ServeDir::new(public_dir)
        .call_fallback_on_method_not_allowed(true)
        .fallback(not_found.into_service());

    Router::new()
        .nest(API_PREFIX, tour_routes())
        .route("/health", get(health))
        .method_not_allowed_fallback(not_found)
        .fallback_service(static_files)
        .layer(middleware::from_fn_with_state(state.clone(), render_errors))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origins))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let parsed: Vec<_> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(parsed))
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
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
    info!("shutdown signal received");
}
