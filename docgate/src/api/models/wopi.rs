use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::storage::Document;

/// WOPI CheckFileInfo response.
///
/// Field names are dictated by the WOPI protocol (PascalCase). Only the
/// subset the viewer actually reads is included.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct CheckFileInfo {
    pub base_file_name: String,
    pub owner_id: String,
    pub user_id: String,
    pub user_friendly_name: String,
    pub size: u64,
    /// Modification time doubles as the version identifier
    pub version: String,
    pub last_modified_time: i64,
    pub file_extension: String,
    pub supports_update: bool,
    pub supports_locks: bool,
    pub user_can_write: bool,
    pub read_only: bool,
}

impl CheckFileInfo {
    /// Build file info for a stored document. PDFs are view-only: the viewer
    /// renders them but cannot save changes back.
    pub fn from_document(doc: &Document) -> Self {
        let extension = doc
            .name
            .rsplit_once('.')
            .map(|(_, ext)| format!(".{}", ext.to_lowercase()))
            .unwrap_or_default();
        let writable = extension != ".pdf";

        Self {
            base_file_name: doc.name.clone(),
            owner_id: "docgate".to_string(),
            user_id: "docgate".to_string(),
            user_friendly_name: "docgate".to_string(),
            size: doc.size_bytes,
            version: doc.modified_at.timestamp().to_string(),
            last_modified_time: doc.modified_at.timestamp(),
            file_extension: extension,
            supports_update: writable,
            supports_locks: true,
            user_can_write: writable,
            read_only: !writable,
        }
    }
}
