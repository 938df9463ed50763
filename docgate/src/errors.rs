use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    /// Invalid request data (bad multipart body, unusable filename, ...)
    #[error("{message}")]
    BadRequest { message: String },

    /// Requested resource not found
    #[error("{resource} '{id}' not found")]
    NotFound { resource: String, id: String },

    /// Upload exceeds the configured size limit
    #[error("{message}")]
    PayloadTooLarge { message: String },

    /// WOPI lock mismatch; `current` is the lock value held right now
    #[error("document is locked")]
    LockConflict { current: String },

    /// Filesystem operation error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Error::LockConflict { .. } => StatusCode::CONFLICT,
            Error::Io(_) | Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// User-safe error message, without leaking filesystem paths or internals
    pub fn user_message(&self) -> String {
        match self {
            Error::BadRequest { message } | Error::PayloadTooLarge { message } => message.clone(),
            Error::NotFound { resource, id } => format!("{resource} '{id}' not found"),
            Error::LockConflict { .. } => "Document is locked by another session".to_string(),
            Error::Io(_) | Error::Other(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Log full details here; the client only sees user_message()
        match &self {
            Error::Io(_) | Error::Other(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::LockConflict { .. } => {
                tracing::warn!("Lock conflict: {}", self);
            }
            Error::BadRequest { .. } | Error::NotFound { .. } | Error::PayloadTooLarge { .. } => {
                tracing::debug!("Client error: {}", self);
            }
        }

        let status = self.status_code();

        match &self {
            // WOPI clients read the current lock value from the X-WOPI-Lock header on 409
            Error::LockConflict { current } => {
                (status, [("X-WOPI-Lock", current.clone())], self.user_message()).into_response()
            }
            _ => (status, self.user_message()).into_response(),
        }
    }
}

/// Type alias for handler results
pub type Result<T> = std::result::Result<T, Error>;
