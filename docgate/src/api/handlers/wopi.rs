//! WOPI host endpoints.
//!
//! The viewer talks WOPI back to this server to read and save document
//! content: CheckFileInfo for metadata, GetFile/PutFile for bytes, and lock
//! operations multiplexed over POST with the `X-WOPI-Override` header.

use crate::AppState;
use crate::api::models::wopi::CheckFileInfo;
use crate::errors::{Error, Result};
use crate::storage::sanitize_filename;
use axum::{
    Json,
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use tokio_util::io::ReaderStream;

const WOPI_OVERRIDE: &str = "X-WOPI-Override";
const WOPI_LOCK: &str = "X-WOPI-Lock";

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

#[utoipa::path(
    get,
    path = "/wopi/files/{name}",
    tag = "wopi",
    summary = "CheckFileInfo",
    responses(
        (status = 200, description = "Document metadata in WOPI form", body = CheckFileInfo),
        (status = 404, description = "Document not found")
    ),
    params(("name" = String, Path, description = "Document name"))
)]
pub async fn check_file_info(State(state): State<AppState>, Path(name): Path<String>) -> Result<Json<CheckFileInfo>> {
    let name = sanitize_filename(&name)?;
    let doc = state.store.metadata(&name).await?;
    tracing::debug!(document = %name, "CheckFileInfo");
    Ok(Json(CheckFileInfo::from_document(&doc)))
}

#[utoipa::path(
    get,
    path = "/wopi/files/{name}/contents",
    tag = "wopi",
    summary = "GetFile",
    responses(
        (status = 200, description = "Raw document bytes"),
        (status = 404, description = "Document not found")
    ),
    params(("name" = String, Path, description = "Document name"))
)]
pub async fn get_contents(State(state): State<AppState>, Path(name): Path<String>) -> Result<Response> {
    let name = sanitize_filename(&name)?;
    // Resolve metadata first so a missing file is a clean 404
    let doc = state.store.metadata(&name).await?;

    let file = tokio::fs::File::open(state.store.path_for(&name)).await?;
    let stream = ReaderStream::new(file);

    tracing::debug!(document = %name, bytes = doc.size_bytes, "GetFile");

    Ok((
        [
            (header::CONTENT_TYPE, doc.mime_type),
            (header::CONTENT_LENGTH, doc.size_bytes.to_string()),
        ],
        Body::from_stream(stream),
    )
        .into_response())
}

#[utoipa::path(
    post,
    path = "/wopi/files/{name}/contents",
    tag = "wopi",
    summary = "PutFile",
    description = "Replace the document's content with the request body. The previous content is \
                   backed up first. Honors WOPI locks via the X-WOPI-Lock header.",
    request_body(content = Vec<u8>, content_type = "application/octet-stream"),
    responses(
        (status = 200, description = "Document saved"),
        (status = 404, description = "Document not found"),
        (status = 409, description = "Lock mismatch; X-WOPI-Lock carries the current lock")
    ),
    params(("name" = String, Path, description = "Document name"))
)]
pub async fn put_contents(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Result<StatusCode> {
    let name = sanitize_filename(&name)?;
    if !state.store.exists(&name).await {
        return Err(Error::NotFound {
            resource: "Document".to_string(),
            id: name,
        });
    }

    state.locks.check_write(&name, header_str(&headers, WOPI_LOCK))?;
    state.store.save_contents(&name, &body).await?;

    tracing::info!(document = %name, bytes = body.len(), "PutFile saved");
    Ok(StatusCode::OK)
}

/// Lock operations, multiplexed over POST by the `X-WOPI-Override` header
#[utoipa::path(
    post,
    path = "/wopi/files/{name}",
    tag = "wopi",
    summary = "Lock operations",
    description = "LOCK, UNLOCK, REFRESH_LOCK and GET_LOCK, selected by the X-WOPI-Override header.",
    responses(
        (status = 200, description = "Operation succeeded"),
        (status = 400, description = "Missing or unknown X-WOPI-Override operation"),
        (status = 404, description = "Document not found"),
        (status = 409, description = "Lock mismatch; X-WOPI-Lock carries the current lock")
    ),
    params(("name" = String, Path, description = "Document name"))
)]
pub async fn lock_operations(State(state): State<AppState>, Path(name): Path<String>, headers: HeaderMap) -> Result<Response> {
    let name = sanitize_filename(&name)?;
    if !state.store.exists(&name).await {
        return Err(Error::NotFound {
            resource: "Document".to_string(),
            id: name,
        });
    }

    let operation = header_str(&headers, WOPI_OVERRIDE).ok_or_else(|| Error::BadRequest {
        message: format!("Missing {WOPI_OVERRIDE} header"),
    })?;
    let lock_value = header_str(&headers, WOPI_LOCK);

    tracing::debug!(document = %name, operation = %operation, "WOPI lock operation");

    match operation {
        "LOCK" => {
            let value = lock_value.ok_or_else(|| Error::BadRequest {
                message: format!("LOCK requires an {WOPI_LOCK} header"),
            })?;
            state.locks.lock(&name, value)?;
            Ok(StatusCode::OK.into_response())
        }
        "REFRESH_LOCK" => {
            let value = lock_value.ok_or_else(|| Error::BadRequest {
                message: format!("REFRESH_LOCK requires an {WOPI_LOCK} header"),
            })?;
            state.locks.refresh(&name, value)?;
            Ok(StatusCode::OK.into_response())
        }
        "UNLOCK" => {
            let value = lock_value.ok_or_else(|| Error::BadRequest {
                message: format!("UNLOCK requires an {WOPI_LOCK} header"),
            })?;
            state.locks.unlock(&name, value)?;
            Ok(StatusCode::OK.into_response())
        }
        "GET_LOCK" => {
            let current = state.locks.current(&name).unwrap_or_default();
            Ok(([(WOPI_LOCK, current)], StatusCode::OK).into_response())
        }
        other => Err(Error::BadRequest {
            message: format!("Unsupported WOPI operation '{other}'"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use crate::test_utils::{test_server, upload_form};
    use axum::http::StatusCode;
    use serde_json::Value;

    #[tokio::test]
    async fn check_file_info_reports_metadata() {
        let (_dir, server, _state) = test_server().await;
        server.post("/upload").multipart(upload_form("notes.odt", b"12345")).await.assert_status_ok();

        let response = server.get("/wopi/files/notes.odt").await;
        response.assert_status_ok();

        let info: Value = response.json();
        assert_eq!(info["BaseFileName"].as_str(), Some("notes.odt"));
        assert_eq!(info["Size"].as_u64(), Some(5));
        assert_eq!(info["UserCanWrite"].as_bool(), Some(true));
        assert_eq!(info["SupportsLocks"].as_bool(), Some(true));
        assert_eq!(info["FileExtension"].as_str(), Some(".odt"));
    }

    #[tokio::test]
    async fn pdf_is_read_only() {
        let (_dir, server, _state) = test_server().await;
        server.post("/upload").multipart(upload_form("fixed.pdf", b"%PDF")).await.assert_status_ok();

        let info: Value = server.get("/wopi/files/fixed.pdf").await.json();
        assert_eq!(info["UserCanWrite"].as_bool(), Some(false));
        assert_eq!(info["ReadOnly"].as_bool(), Some(true));
        assert_eq!(info["SupportsUpdate"].as_bool(), Some(false));
    }

    #[tokio::test]
    async fn check_file_info_missing_document() {
        let (_dir, server, _state) = test_server().await;
        server.get("/wopi/files/ghost.odt").await.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn get_contents_streams_bytes() {
        let (_dir, server, _state) = test_server().await;
        server.post("/upload").multipart(upload_form("data.txt", b"stream me")).await.assert_status_ok();

        let response = server.get("/wopi/files/data.txt/contents").await;
        response.assert_status_ok();
        assert_eq!(response.as_bytes().as_ref(), b"stream me");
    }

    #[tokio::test]
    async fn put_contents_replaces_and_backs_up() {
        let (_dir, server, state) = test_server().await;
        server.post("/upload").multipart(upload_form("doc.odt", b"v1")).await.assert_status_ok();

        let response = server.post("/wopi/files/doc.odt/contents").bytes(b"v2".to_vec().into()).await;
        response.assert_status_ok();

        assert_eq!(server.get("/uploads/doc.odt").await.as_bytes().as_ref(), b"v2");

        // The previous version was backed up outside the document namespace
        let backups = std::fs::read_dir(state.store.dir().join(".backups")).expect("backup dir");
        assert_eq!(backups.count(), 1);
    }

    #[tokio::test]
    async fn put_contents_on_missing_document_is_not_found() {
        let (_dir, server, _state) = test_server().await;
        server
            .post("/wopi/files/ghost.odt/contents")
            .bytes(b"data".to_vec().into())
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn lock_cycle_and_conflict() {
        let (_dir, server, _state) = test_server().await;
        server.post("/upload").multipart(upload_form("doc.odt", b"x")).await.assert_status_ok();

        // Acquire
        server
            .post("/wopi/files/doc.odt")
            .add_header("X-WOPI-Override", "LOCK")
            .add_header("X-WOPI-Lock", "session-1")
            .await
            .assert_status_ok();

        // Conflicting acquire reports the holder
        let conflict = server
            .post("/wopi/files/doc.odt")
            .add_header("X-WOPI-Override", "LOCK")
            .add_header("X-WOPI-Lock", "session-2")
            .await;
        conflict.assert_status(StatusCode::CONFLICT);
        assert_eq!(
            conflict.headers().get("X-WOPI-Lock").map(|v| v.to_str().unwrap()),
            Some("session-1")
        );

        // Writes under the wrong lock are refused
        server
            .post("/wopi/files/doc.odt/contents")
            .add_header("X-WOPI-Lock", "session-2")
            .bytes(b"nope".to_vec().into())
            .await
            .assert_status(StatusCode::CONFLICT);

        // The holder can save and unlock
        server
            .post("/wopi/files/doc.odt/contents")
            .add_header("X-WOPI-Lock", "session-1")
            .bytes(b"saved".to_vec().into())
            .await
            .assert_status_ok();
        server
            .post("/wopi/files/doc.odt")
            .add_header("X-WOPI-Override", "UNLOCK")
            .add_header("X-WOPI-Lock", "session-1")
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    async fn refresh_without_lock_is_a_conflict() {
        let (_dir, server, _state) = test_server().await;
        server.post("/upload").multipart(upload_form("doc.odt", b"x")).await.assert_status_ok();

        let response = server
            .post("/wopi/files/doc.odt")
            .add_header("X-WOPI-Override", "REFRESH_LOCK")
            .add_header("X-WOPI-Lock", "session-1")
            .await;
        response.assert_status(StatusCode::CONFLICT);
        assert_eq!(response.headers().get("X-WOPI-Lock").map(|v| v.to_str().unwrap()), Some(""));

        // A held lock refreshes fine
        server
            .post("/wopi/files/doc.odt")
            .add_header("X-WOPI-Override", "LOCK")
            .add_header("X-WOPI-Lock", "session-1")
            .await
            .assert_status_ok();
        server
            .post("/wopi/files/doc.odt")
            .add_header("X-WOPI-Override", "REFRESH_LOCK")
            .add_header("X-WOPI-Lock", "session-1")
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    async fn get_lock_reports_current_value() {
        let (_dir, server, _state) = test_server().await;
        server.post("/upload").multipart(upload_form("doc.odt", b"x")).await.assert_status_ok();

        let unlocked = server.post("/wopi/files/doc.odt").add_header("X-WOPI-Override", "GET_LOCK").await;
        unlocked.assert_status_ok();
        assert_eq!(unlocked.headers().get("X-WOPI-Lock").map(|v| v.to_str().unwrap()), Some(""));

        server
            .post("/wopi/files/doc.odt")
            .add_header("X-WOPI-Override", "LOCK")
            .add_header("X-WOPI-Lock", "session-1")
            .await
            .assert_status_ok();

        let locked = server.post("/wopi/files/doc.odt").add_header("X-WOPI-Override", "GET_LOCK").await;
        assert_eq!(
            locked.headers().get("X-WOPI-Lock").map(|v| v.to_str().unwrap()),
            Some("session-1")
        );
    }

    #[tokio::test]
    async fn unknown_override_is_rejected() {
        let (_dir, server, _state) = test_server().await;
        server.post("/upload").multipart(upload_form("doc.odt", b"x")).await.assert_status_ok();

        server
            .post("/wopi/files/doc.odt")
            .add_header("X-WOPI-Override", "EXPLODE")
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }
}
