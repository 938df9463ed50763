use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::storage::Document;

/// Response to a successful upload: where the viewer can open the document
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    /// Viewer URL with the document's absolute path as `file_path`
    pub url: String,
}

/// A stored document
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DocumentResponse {
    pub name: String,
    pub size_bytes: u64,
    /// Last modification, Unix timestamp
    pub modified_at: i64,
    pub mime_type: String,
}

impl DocumentResponse {
    pub fn from_document(doc: &Document) -> Self {
        Self {
            name: doc.name.clone(),
            size_bytes: doc.size_bytes,
            modified_at: doc.modified_at.timestamp(),
            mime_type: doc.mime_type.clone(),
        }
    }
}

/// Response for document listing
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DocumentListResponse {
    pub data: Vec<DocumentResponse>,
}

/// Response for document deletion
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DocumentDeleteResponse {
    pub name: String,
    pub deleted: bool,
}

/// Request body for renaming a document
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RenameRequest {
    /// New document name; sanitized the same way as upload filenames
    pub new_name: String,
}
