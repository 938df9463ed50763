//! HTTP handlers for the embedded upload page and its assets.

use axum::{
    body::Body,
    http::{Response, StatusCode, Uri},
    response::IntoResponse,
};
use tracing::instrument;

use crate::static_assets;

/// Serve the upload page
#[utoipa::path(
    get,
    path = "/",
    tag = "pages",
    summary = "Upload page",
    responses(
        (status = 200, description = "The HTML upload form", content_type = "text/html")
    )
)]
#[instrument]
pub async fn index() -> impl IntoResponse {
    serve_embedded_asset(Uri::from_static("/index.html")).await
}

/// Serve embedded static assets; 404 for anything not compiled in
#[instrument]
pub async fn serve_embedded_asset(uri: Uri) -> Response<Body> {
    let mut path = uri.path().trim_start_matches('/');
    if path.is_empty() {
        path = "index.html";
    }

    if let Some(content) = static_assets::Assets::get(path) {
        let mime = mime_guess::from_path(path).first_or_octet_stream();

        return Response::builder()
            .header(axum::http::header::CONTENT_TYPE, mime.as_ref())
            .header(axum::http::header::CACHE_CONTROL, "no-cache")
            .body(Body::from(content.data.into_owned()))
            .expect("static asset response");
    }

    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .body(Body::empty())
        .expect("empty response")
}
