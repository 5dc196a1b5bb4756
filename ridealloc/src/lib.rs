//! # ridealloc: ride quota allocation service
//!
//! Companies ask for rides to destinations. An approval authority decides how many rides each
//! destination gets in total, and `ridealloc` splits each destination's approved quota between
//! the companies that asked for it.
//!
//! ## How a run works
//!
//! 1. A CSV of ride requests (`company_name,destination,number_of_rides_requested`) is parsed
//!    ([`records`]).
//! 2. Requests are totalled per destination and sent to the configured approval provider
//!    ([`approval`]), which answers with an approved total per destination.
//! 3. Each destination's approved quota is split in proportion to what each company asked for,
//!    in whole chunks of 100 rides, and the rounding leftover is handed out a chunk at a time in
//!    input order ([`allocation`]).
//! 4. The result is written back as CSV (`company_name,destination,number_of_rides_approved`).
//!
//! A run is all-or-nothing: any failure aborts it and no partial output is produced.
//!
//! ## Surfaces
//!
//! The service is exposed over HTTP (`POST /allocate_rides` with a multipart upload, see
//! [`api`]) and as a one-shot command (`ridealloc --input requests.csv --output approved.csv`).
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use ridealloc::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = ridealloc::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     ridealloc::telemetry::init_telemetry(config.enable_otel_export)?;
//!
//!     Application::new(config)?
//!         .serve(async {
//!             tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!         })
//!         .await
//! }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.

pub mod allocation;
pub mod api;
pub mod approval;
pub mod config;
pub mod errors;
mod openapi;
pub mod pipeline;
pub mod records;
pub mod telemetry;
pub mod types;

pub use config::Config;

use crate::{approval::ApprovalProvider, openapi::ApiDoc};
use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use bon::Builder;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{Level, debug, info};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

/// Room for multipart boundaries and part headers on top of the file itself.
const MULTIPART_OVERHEAD: u64 = 64 * 1024;

/// Application state shared across all request handlers.
///
/// ```ignore
/// let state = AppState::builder()
///     .config(config)
///     .approval(provider)
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
    pub approval: Arc<dyn ApprovalProvider>,
}

/// Build the HTTP router.
///
/// The upload route gets its own body limit so that oversized files are refused before they are
/// buffered. The handler enforces the exact `limits.max_file_size` on the file field itself.
pub fn build_router(state: &AppState) -> Router {
    let body_limit = usize::try_from(state.config.limits.max_file_size.saturating_add(MULTIPART_OVERHEAD)).unwrap_or(usize::MAX);

    Router::new()
        .route(
            "/allocate_rides",
            post(api::handlers::allocations::allocate_rides).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/healthz", get(|| async { "OK" }))
        .route("/api-docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
        .with_state(state.clone())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

pub struct Application {
    router: Router,
    config: Config,
}

impl Application {
    /// Create a new application instance with its approval provider initialized
    pub fn new(config: Config) -> anyhow::Result<Self> {
        debug!(
            host = %config.host,
            port = config.port,
            max_file_size = config.limits.max_file_size,
            "Starting ride allocation service"
        );

        let approval = approval::create_provider(&config.approval)?;
        let state = AppState::builder().config(config.clone()).approval(approval).build();
        let router = build_router(&state);

        Ok(Self { router, config })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "Ride allocation service listening on http://{}, docs at http://localhost:{}/docs",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router).with_graceful_shutdown(shutdown).await?;

        info!("HTTP server stopped");
        Ok(())
    }
}
