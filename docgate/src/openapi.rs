//! OpenAPI documentation configuration.
//!
//! Aggregates the annotated handlers and schemas into a single document,
//! rendered at `/docs`.

use utoipa::OpenApi;

use crate::api;
use crate::api::models::{documents, wopi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "docgate",
        description = "Upload gateway for an external document viewer: stores uploaded files \
                       and hands out viewer links, plus the WOPI host surface the viewer \
                       calls back into.",
    ),
    paths(
        api::handlers::documents::upload_document,
        api::handlers::documents::list_documents,
        api::handlers::documents::get_document,
        api::handlers::documents::delete_document,
        api::handlers::documents::rename_document,
        api::handlers::documents::open_document,
        api::handlers::wopi::check_file_info,
        api::handlers::wopi::get_contents,
        api::handlers::wopi::put_contents,
        api::handlers::wopi::lock_operations,
    ),
    components(schemas(
        documents::UploadResponse,
        documents::DocumentResponse,
        documents::DocumentListResponse,
        documents::DocumentDeleteResponse,
        documents::RenameRequest,
        wopi::CheckFileInfo,
    )),
    tags(
        (name = "documents", description = "Upload and manage stored documents"),
        (name = "wopi", description = "WOPI host endpoints used by the viewer"),
    )
)]
pub struct ApiDoc;
