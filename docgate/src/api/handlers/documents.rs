//! HTTP handlers for uploading and managing documents.

use crate::AppState;
use crate::api::models::documents::{
    DocumentDeleteResponse, DocumentListResponse, DocumentResponse, RenameRequest, UploadResponse,
};
use crate::errors::{Error, Result};
use crate::storage::sanitize_filename;
use crate::viewer::viewer_link;
use axum::{
    Json,
    extract::{Multipart, Path, State, multipart::MultipartError},
    http::StatusCode,
    response::Redirect,
};
use tokio::io::AsyncWriteExt;

fn multipart_error(e: MultipartError) -> Error {
    // DefaultBodyLimit failures surface through the multipart stream; keep the 413
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        Error::PayloadTooLarge {
            message: "Upload exceeds the configured size limit".to_string(),
        }
    } else {
        Error::BadRequest {
            message: format!("Failed to parse multipart data: {e}"),
        }
    }
}

#[utoipa::path(
    post,
    path = "/upload",
    tag = "documents",
    summary = "Upload document",
    description = "Upload a file as multipart/form-data with a single file field named 'file'. \
                   The response carries a viewer URL pointing at the stored document.",
    request_body(content_type = "multipart/form-data", description = "File upload"),
    responses(
        (status = 200, description = "Document stored", body = UploadResponse),
        (status = 400, description = "Missing 'file' field or unusable filename"),
        (status = 413, description = "Payload too large"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn upload_document(State(state): State<AppState>, mut multipart: Multipart) -> Result<Json<UploadResponse>> {
    let mut stored: Option<(String, std::path::PathBuf, u64)> = None;

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        let field_name = field.name().unwrap_or("").to_string();
        if field_name != "file" {
            // Ignore unknown fields (forward compatibility)
            continue;
        }

        let filename = sanitize_filename(field.file_name().unwrap_or(""))?;

        tracing::info!(filename = %filename, "Starting upload stream");

        // Stream the payload to a temp file in the uploads dir, then rename into
        // place so a partial body never lands under the document name
        let mut temp = state.store.create_temp().await?;
        let mut total_size = 0u64;

        loop {
            match field.chunk().await {
                Ok(Some(chunk)) => {
                    total_size += chunk.len() as u64;
                    if let Err(e) = temp.file.write_all(&chunk).await {
                        state.store.discard(temp).await;
                        return Err(e.into());
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    state.store.discard(temp).await;
                    return Err(multipart_error(e));
                }
            }
        }

        if let Err(e) = temp.file.flush().await {
            state.store.discard(temp).await;
            return Err(e.into());
        }

        let path = state.store.promote(temp, &filename).await?;
        stored = Some((filename, path, total_size));
        // Only the first file field is honored
        break;
    }

    let (filename, path, total_size) = stored.ok_or_else(|| Error::BadRequest {
        message: "Missing required field: 'file'".to_string(),
    })?;

    tracing::info!(filename = %filename, bytes = total_size, "Document stored");

    Ok(Json(UploadResponse {
        url: viewer_link(&state.config.viewer.url, &path),
    }))
}

#[utoipa::path(
    get,
    path = "/documents",
    tag = "documents",
    summary = "List documents",
    responses(
        (status = 200, description = "Stored documents, sorted by name", body = DocumentListResponse),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_documents(State(state): State<AppState>) -> Result<Json<DocumentListResponse>> {
    let documents = state.store.list().await?;
    let data = documents.iter().map(DocumentResponse::from_document).collect();
    Ok(Json(DocumentListResponse { data }))
}

#[utoipa::path(
    get,
    path = "/documents/{name}",
    tag = "documents",
    summary = "Retrieve document metadata",
    responses(
        (status = 200, description = "Document metadata", body = DocumentResponse),
        (status = 404, description = "Document not found")
    ),
    params(("name" = String, Path, description = "Document name"))
)]
pub async fn get_document(State(state): State<AppState>, Path(name): Path<String>) -> Result<Json<DocumentResponse>> {
    let name = sanitize_filename(&name)?;
    let doc = state.store.metadata(&name).await?;
    Ok(Json(DocumentResponse::from_document(&doc)))
}

#[utoipa::path(
    delete,
    path = "/documents/{name}",
    tag = "documents",
    summary = "Delete document",
    responses(
        (status = 200, description = "Document deleted", body = DocumentDeleteResponse),
        (status = 404, description = "Document not found")
    ),
    params(("name" = String, Path, description = "Document name"))
)]
pub async fn delete_document(State(state): State<AppState>, Path(name): Path<String>) -> Result<Json<DocumentDeleteResponse>> {
    let name = sanitize_filename(&name)?;
    state.store.delete(&name).await?;
    state.locks.forget(&name);

    tracing::info!(document = %name, "Document deleted");

    Ok(Json(DocumentDeleteResponse { name, deleted: true }))
}

#[utoipa::path(
    post,
    path = "/documents/{name}/rename",
    tag = "documents",
    summary = "Rename document",
    request_body = RenameRequest,
    responses(
        (status = 200, description = "Document renamed", body = DocumentResponse),
        (status = 400, description = "Unusable new name"),
        (status = 404, description = "Document not found")
    ),
    params(("name" = String, Path, description = "Current document name"))
)]
pub async fn rename_document(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<RenameRequest>,
) -> Result<Json<DocumentResponse>> {
    let name = sanitize_filename(&name)?;
    let new_name = sanitize_filename(&request.new_name)?;

    state.store.rename(&name, &new_name).await?;
    state.locks.forget(&name);

    tracing::info!(from = %name, to = %new_name, "Document renamed");

    let doc = state.store.metadata(&new_name).await?;
    Ok(Json(DocumentResponse::from_document(&doc)))
}

#[utoipa::path(
    get,
    path = "/open/{name}",
    tag = "documents",
    summary = "Open document in the viewer",
    responses(
        (status = 303, description = "Redirect to the viewer URL"),
        (status = 404, description = "Document not found")
    ),
    params(("name" = String, Path, description = "Document name"))
)]
pub async fn open_document(State(state): State<AppState>, Path(name): Path<String>) -> Result<Redirect> {
    let name = sanitize_filename(&name)?;
    if !state.store.exists(&name).await {
        return Err(Error::NotFound {
            resource: "Document".to_string(),
            id: name,
        });
    }

    let url = viewer_link(&state.config.viewer.url, &state.store.path_for(&name));
    tracing::debug!(document = %name, url = %url, "Redirecting to viewer");
    Ok(Redirect::to(&url))
}
