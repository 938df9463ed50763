//! # docgate: Upload Gateway for an External Document Viewer
//!
//! `docgate` is a small HTTP service that sits in front of a Collabora
//! Online style document viewer. Browsers upload files to it, it stores them
//! on local disk, and it hands back a URL that points the viewer at the
//! stored document. It also speaks the WOPI host protocol, so the viewer can
//! call back into docgate to read, save and lock documents during an editing
//! session.
//!
//! ## Request Flow
//!
//! A browser loads the embedded upload page at `/`, POSTs a multipart form
//! to `/upload`, and receives `{"url": "<viewer>?file_path=<abs-path>"}` in
//! response. Opening that URL loads the viewer, which then talks WOPI back
//! to this server under `/wopi/files/*`. Stored files are also served
//! directly as static content under `/uploads/`.
//!
//! ## Layout
//!
//! - [`api`]: route handlers and request/response models
//! - [`storage`]: the on-disk document store (sanitization, temp-file
//!   uploads, backups)
//! - [`wopi`]: the in-memory WOPI lock table
//! - [`viewer`]: viewer link construction
//! - [`config`], [`telemetry`], [`errors`]: the usual service plumbing

pub mod api;
pub mod config;
pub mod errors;
pub mod openapi;
pub mod static_assets;
pub mod storage;
pub mod telemetry;
pub mod viewer;
pub mod wopi;

pub use config::Config;
pub use errors::{Error, Result};

use crate::config::CorsOrigin;
use crate::openapi::ApiDoc;
use crate::storage::DocumentStore;
use crate::wopi::LockTable;
use axum::{
    Router,
    extract::{DefaultBodyLimit, Request},
    http::{HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use bon::Builder;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, info};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

/// Shared application state passed to all route handlers.
///
/// Contains the document store, the WOPI lock table, and the loaded
/// configuration. Cloning is cheap: the store holds a path and the lock
/// table is behind an `Arc`.
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
    pub store: DocumentStore,
    pub locks: Arc<LockTable>,
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let mut origins = Vec::new();
    for origin in &config.cors.allowed_origins {
        let header_value = match origin {
            CorsOrigin::Wildcard => "*".parse::<HeaderValue>()?,
            CorsOrigin::Url(url) => url.as_str().parse::<HeaderValue>()?,
        };
        origins.push(header_value);
    }

    let mut cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(config.cors.allow_credentials)
        .expose_headers(vec![axum::http::header::LOCATION]);

    if let Some(max_age) = config.cors.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Hide dot-prefixed entries from static serving. The uploads dir also holds
/// in-flight `.{uuid}.part` temp files and the `.backups/` directory; those
/// are internal, never documents, and must not be fetchable.
async fn reject_hidden_paths(request: Request, next: Next) -> Response {
    let hidden = request.uri().path().split('/').any(|segment| segment.starts_with('.'));
    if hidden {
        return StatusCode::NOT_FOUND.into_response();
    }
    next.run(request).await
}

/// Build the main application router with all endpoints and middleware.
///
/// Routes:
/// - `/` and unmatched paths: the embedded upload page
/// - `/upload`: multipart document upload
/// - `/documents/*`, `/open/*`: document management
/// - `/uploads/*`: static serving of stored documents
/// - `/wopi/files/*`: the WOPI host surface
/// - `/docs`: rendered OpenAPI documentation
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    // Uploads and WOPI saves share the configured size limit. usize is wide
    // enough on every platform we target.
    let upload_limit = state.config.storage.max_file_size as usize;

    let router = Router::new()
        .route("/", get(api::handlers::pages::index))
        .route("/healthz", get(|| async { "OK" }))
        .route(
            "/upload",
            post(api::handlers::documents::upload_document).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/documents", get(api::handlers::documents::list_documents))
        .route(
            "/documents/{name}",
            get(api::handlers::documents::get_document).delete(api::handlers::documents::delete_document),
        )
        .route("/documents/{name}/rename", post(api::handlers::documents::rename_document))
        .route("/open/{name}", get(api::handlers::documents::open_document))
        .route(
            "/wopi/files/{name}",
            get(api::handlers::wopi::check_file_info).post(api::handlers::wopi::lock_operations),
        )
        .route(
            "/wopi/files/{name}/contents",
            get(api::handlers::wopi::get_contents)
                .post(api::handlers::wopi::put_contents)
                .layer(DefaultBodyLimit::max(upload_limit)),
        )
        .nest(
            "/uploads",
            Router::new()
                .fallback_service(ServeDir::new(state.store.dir()))
                .layer(middleware::from_fn(reject_hidden_paths)),
        )
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
        .fallback(get(api::handlers::pages::serve_embedded_asset))
        .with_state(state.clone());

    let cors_layer = create_cors_layer(&state.config)?;

    let router = router.layer(cors_layer).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// The assembled application: a router plus the resources behind it.
///
/// Lifecycle:
/// 1. [`Application::new`] opens the document store and builds the router
/// 2. [`Application::serve`] binds a TCP port and handles requests until the
///    shutdown future resolves
pub struct Application {
    router: Router,
    config: Config,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        tracing::debug!("Starting docgate with configuration: {:#?}", config);

        let store = DocumentStore::open(&config.storage.uploads_dir).await?;
        info!("Document store ready at {}", store.dir().display());

        let state = AppState::builder()
            .config(config.clone())
            .store(store)
            .locks(Arc::new(LockTable::new()))
            .build();

        let router = build_router(state)?;

        Ok(Self { router, config })
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "docgate listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}

#[cfg(test)]
pub mod test_utils {
    //! Helpers shared by handler tests: a test server backed by a fresh
    //! temporary uploads directory, and a multipart form builder.

    use super::*;
    use axum_test::TestServer;
    use axum_test::multipart::{MultipartForm, Part};
    use tempfile::TempDir;

    /// Build a [`TestServer`] over a fresh store. The upload limit is 1MB so
    /// oversize tests stay cheap. The [`TempDir`] must be kept alive by the
    /// caller for the duration of the test.
    pub async fn test_server() -> (TempDir, TestServer, AppState) {
        let dir = TempDir::new().expect("create temp dir");

        let mut config = Config::default();
        config.storage.uploads_dir = dir.path().to_path_buf();
        config.storage.max_file_size = 1024 * 1024;

        let store = DocumentStore::open(&config.storage.uploads_dir).await.expect("open store");
        let state = AppState::builder()
            .config(config)
            .store(store)
            .locks(Arc::new(LockTable::new()))
            .build();

        let router = build_router(state.clone()).expect("build router");
        let server = TestServer::new(router).expect("create test server");
        (dir, server, state)
    }

    /// A multipart form with a single `file` field, the way the upload page
    /// submits it.
    pub fn upload_form(name: &str, content: &[u8]) -> MultipartForm {
        MultipartForm::new().add_part(
            "file",
            Part::bytes(content.to_vec())
                .file_name(name)
                .mime_type("application/octet-stream"),
        )
    }
}
