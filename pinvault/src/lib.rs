//! # pinvault: IPFS pinning proxy and upload page controller
//!
//! `pinvault` lets a user upload a file, forwards it to a third-party IPFS pinning service
//! (Pinata), and lists previously pinned files with public gateway URLs for preview.
//!
//! ## Architecture
//!
//! The application is built on [Axum](https://github.com/tokio-rs/axum) for the HTTP layer. It
//! keeps no state of its own: the pinning service is the system of record and every list request
//! re-fetches from it.
//!
//! ### Request Flow
//!
//! `GET /api/files` asks the pinning service for currently pinned entries and reshapes each into a
//! [`api::models::files::PinnedFile`] with a gateway URL. `POST /api/files` reads the multipart
//! `file` field and streams it, chunk by chunk, into a new multipart request to the pinning
//! service, answering with the assigned content hash and its gateway URL.
//!
//! Both operations check that the pinning credential and gateway hostname are configured before
//! doing anything else, and fail with a configuration error when they are not.
//!
//! ### Core Components
//!
//! - The **API layer** ([`api`]) holds the Axum handlers and wire models.
//! - The **pinning layer** ([`pinning`]) defines the [`pinning::PinningService`] trait and the
//!   reqwest-based Pinata client. It is built once at startup and handed to handlers through
//!   [`AppState`].
//! - The **page controller** ([`page`]) is the client side: explore/upload tab state, file
//!   selection with revocable previews, a cosmetic progress ticker, transient notifications, and
//!   the simulated mint step. It talks to the proxy through [`page::FilesApi`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use pinvault::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = pinvault::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     pinvault::telemetry::init_telemetry(config.enable_otel_export)?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.
pub mod api;
pub mod config;
pub mod errors;
mod openapi;
pub mod page;
pub mod pinning;
pub mod telemetry;

#[cfg(test)]
mod test;
#[cfg(test)]
pub mod test_utils;

use crate::{
    api::handlers::files,
    config::CorsOrigin,
    errors::Error,
    openapi::ApiDoc,
    pinning::{Gateway, PinningService},
};
use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    http::{self, HeaderValue},
    routing::get,
};
use bon::Builder;
pub use config::Config;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument, warn};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

/// Application state shared across all request handlers.
///
/// # Example
///
/// ```ignore
/// let state = AppState::builder()
///     .config(config)
///     .pinning(pinning::create_service(&config.pinata)?)
///     .maybe_gateway(config.pinata.gateway.as_deref().and_then(Gateway::new))
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
    pub pinning: Arc<dyn PinningService>,
    pub gateway: Option<Gateway>,
}

impl AppState {
    /// The configured public gateway, or a configuration error when none is set.
    pub fn gateway(&self) -> errors::Result<&Gateway> {
        self.gateway.as_ref().ok_or_else(|| Error::Configuration {
            setting: "pinata.gateway".to_string(),
        })
    }
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let mut origins = Vec::new();
    for origin in &config.cors.allowed_origins {
        let header_value = match origin {
            CorsOrigin::Wildcard => "*".parse::<HeaderValue>()?,
            // Url always serializes with a trailing slash, which browsers never send in Origin
            CorsOrigin::Url(url) => url.as_str().trim_end_matches('/').parse::<HeaderValue>()?,
        };
        origins.push(header_value);
    }

    let mut cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([http::Method::GET, http::Method::POST]);

    if let Some(max_age) = config.cors.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the main application router with all endpoints and middleware.
///
/// - `/api/files`: list (`GET`) and upload (`POST`); any other method answers 405. The default
///   request body limit is disabled on this route so uploads are bounded only by the pinning
///   service.
/// - `/healthz`: liveness check
/// - `/api-docs/openapi.json` and `/docs`: OpenAPI document and viewer
#[instrument(skip_all)]
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let cors = if state.config.cors.allowed_origins.is_empty() {
        None
    } else {
        Some(create_cors_layer(&state.config)?)
    };

    let files_route = get(files::list_files)
        .post(files::upload_file)
        .fallback(files::method_not_allowed)
        .layer(DefaultBodyLimit::disable());

    let mut router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .route("/api/files", files_route)
        .with_state(state)
        .route("/api-docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()));

    if let Some(cors) = cors {
        router = router.layer(cors);
    }

    // Add tracing layer
    let router = router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// Main application struct.
///
/// 1. **Create**: [`Application::new`] builds the pinning client, application state and router
/// 2. **Serve**: [`Application::serve`] binds to a TCP port and starts handling requests
/// 3. **Shutdown**: When the shutdown signal resolves, in-flight requests drain and telemetry is
///    flushed
pub struct Application {
    router: Router,
    config: Config,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting pinvault with configuration: {:#?}", config);

        if config.pinata.jwt.is_none() {
            warn!("PINATA_JWT is not set; list and upload requests will fail with a configuration error");
        }
        let gateway = config.pinata.gateway.as_deref().and_then(Gateway::new);
        if gateway.is_none() {
            warn!("GATEWAY_URL is not set; list and upload requests will fail with a configuration error");
        }

        let pinning = pinning::create_service(&config.pinata)?;

        let app_state = AppState::builder()
            .config(config.clone())
            .pinning(pinning)
            .maybe_gateway(gateway)
            .build();

        let router = build_router(app_state)?;

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
            "pinvault listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        // Run the server with graceful shutdown
        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        // Shutdown telemetry
        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}
