//! On-disk document storage.
//!
//! All documents live as plain files in a single uploads directory. Uploads are
//! streamed to a dot-prefixed temporary file in the same directory and renamed
//! into place once complete, so a partially received body never appears under a
//! document name. The rename replaces any existing file with the same name:
//! re-uploading a document overwrites it, and concurrent same-name uploads race
//! with last-write-wins semantics.
//!
//! Client-supplied filenames are untrusted and always pass through
//! [`sanitize_filename`] before being used as a storage key.

use crate::errors::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

/// Subdirectory of the uploads dir holding pre-save backups of replaced content.
const BACKUP_DIR: &str = ".backups";

/// Reduce a client-supplied filename to a safe storage key.
///
/// Takes the final path component (handling both `/` and `\` separators, so a
/// Windows browser sending `C:\docs\report.pdf` stores as `report.pdf`) and
/// rejects anything that could escape the uploads directory or collide with
/// internal dot-prefixed entries (temp files, backups).
pub fn sanitize_filename(raw: &str) -> Result<String> {
    let name = raw
        .rsplit(['/', '\\'])
        .find(|part| !part.is_empty())
        .unwrap_or("")
        .trim();

    if name.is_empty() || name == "." || name == ".." {
        return Err(Error::BadRequest {
            message: "Filename is empty or not usable as a document name".to_string(),
        });
    }
    if name.starts_with('.') {
        return Err(Error::BadRequest {
            message: "Filenames starting with '.' are reserved".to_string(),
        });
    }
    if name.chars().any(|c| c.is_control()) {
        return Err(Error::BadRequest {
            message: "Filename contains control characters".to_string(),
        });
    }

    Ok(name.to_string())
}

/// Metadata for a stored document, derived from the filesystem.
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    pub name: String,
    pub size_bytes: u64,
    pub modified_at: DateTime<Utc>,
    pub mime_type: String,
}

/// An in-flight upload: a temporary file that becomes a document on
/// [`DocumentStore::promote`], or gets cleaned up via [`DocumentStore::discard`].
#[derive(Debug)]
pub struct TempUpload {
    pub path: PathBuf,
    pub file: fs::File,
}

/// Handle to the uploads directory. Cheap to clone; shared across handlers.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    dir: PathBuf,
}

impl DocumentStore {
    /// Open (creating if necessary) the uploads directory.
    ///
    /// The directory path is canonicalized so that viewer URLs always carry an
    /// absolute `file_path`, regardless of the working directory the server was
    /// started from.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self> {
        fs::create_dir_all(dir.as_ref()).await?;
        let dir = fs::canonicalize(dir.as_ref()).await?;
        Ok(Self { dir })
    }

    /// Absolute path of the uploads directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Absolute on-disk path for a sanitized document name
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Create a temporary file for an incoming upload
    pub async fn create_temp(&self) -> Result<TempUpload> {
        let path = self.dir.join(format!(".{}.part", Uuid::new_v4()));
        let file = fs::File::create(&path).await?;
        Ok(TempUpload { path, file })
    }

    /// Move a completed temporary upload to its final name, replacing any
    /// existing document with that name. Returns the document's absolute path.
    pub async fn promote(&self, temp: TempUpload, name: &str) -> Result<PathBuf> {
        drop(temp.file); // flush and close before rename
        let target = self.path_for(name);
        if let Err(e) = fs::rename(&temp.path, &target).await {
            let _ = fs::remove_file(&temp.path).await;
            return Err(e.into());
        }
        Ok(target)
    }

    /// Remove an abandoned temporary upload
    pub async fn discard(&self, temp: TempUpload) {
        drop(temp.file);
        if let Err(e) = fs::remove_file(&temp.path).await {
            tracing::warn!("Failed to remove abandoned temp upload {}: {}", temp.path.display(), e);
        }
    }

    /// Metadata for a single document, or NotFound
    pub async fn metadata(&self, name: &str) -> Result<Document> {
        let path = self.path_for(name);
        let meta = match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => meta,
            Ok(_) => return Err(self.not_found(name)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(self.not_found(name)),
            Err(e) => return Err(e.into()),
        };

        let modified_at = meta.modified().map(DateTime::<Utc>::from).unwrap_or_else(|_| Utc::now());

        Ok(Document {
            name: name.to_string(),
            size_bytes: meta.len(),
            modified_at,
            mime_type: mime_for(name),
        })
    }

    /// List all stored documents, sorted by name.
    ///
    /// Dot-prefixed entries (in-flight temp files, the backup directory) and
    /// subdirectories are not documents and are skipped.
    pub async fn list(&self) -> Result<Vec<Document>> {
        let mut documents = Vec::new();
        let mut entries = fs::read_dir(&self.dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let Ok(name) = entry.file_name().into_string() else {
                tracing::warn!("Skipping non-UTF-8 entry in uploads dir");
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            let meta = entry.metadata().await?;
            if !meta.is_file() {
                continue;
            }
            let modified_at = meta.modified().map(DateTime::<Utc>::from).unwrap_or_else(|_| Utc::now());
            documents.push(Document {
                size_bytes: meta.len(),
                modified_at,
                mime_type: mime_for(&name),
                name,
            });
        }

        documents.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(documents)
    }

    /// Delete a document
    pub async fn delete(&self, name: &str) -> Result<()> {
        match fs::remove_file(self.path_for(name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(self.not_found(name)),
            Err(e) => Err(e.into()),
        }
    }

    /// Rename a document, replacing any existing document with the new name
    pub async fn rename(&self, old: &str, new: &str) -> Result<()> {
        if !self.exists(old).await {
            return Err(self.not_found(old));
        }
        fs::rename(self.path_for(old), self.path_for(new)).await?;
        Ok(())
    }

    /// Replace a document's content, keeping a timestamped backup of the
    /// previous bytes under `.backups/`. Used by the WOPI save path so a
    /// misbehaving viewer cannot destroy a document irrecoverably.
    pub async fn save_contents(&self, name: &str, content: &[u8]) -> Result<()> {
        let path = self.path_for(name);

        if self.exists(name).await {
            let backup_dir = self.dir.join(BACKUP_DIR);
            fs::create_dir_all(&backup_dir).await?;
            let backup_path = backup_dir.join(format!("{}.{}.bak", name, Utc::now().timestamp()));
            fs::copy(&path, &backup_path).await?;
            tracing::debug!("Backup written to {}", backup_path.display());
        }

        fs::write(&path, content).await?;
        Ok(())
    }

    /// Whether a document with this name exists
    pub async fn exists(&self, name: &str) -> bool {
        fs::metadata(self.path_for(name)).await.map(|m| m.is_file()).unwrap_or(false)
    }

    fn not_found(&self, name: &str) -> Error {
        Error::NotFound {
            resource: "Document".to_string(),
            id: name.to_string(),
        }
    }
}

/// Guess a document's MIME type from its extension
pub fn mime_for(name: &str) -> String {
    mime_guess::from_path(name).first_or_octet_stream().to_string()
}
