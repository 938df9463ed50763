//! API layer for HTTP request handling and data models.
//!
//! This module contains the HTTP surface, organized into:
//!
//! - **[`handlers`]**: Axum route handlers for all endpoints
//! - **[`models`]**: Request/response data structures
//!
//! # API Structure
//!
//! - **Pages** (`/`): the embedded upload page
//! - **Documents** (`/upload`, `/documents/*`, `/open/*`): upload and
//!   management of stored documents
//! - **WOPI** (`/wopi/files/*`): the host interface the viewer calls back
//!   into to read, save and lock documents
//!
//! All endpoints carry OpenAPI annotations via `utoipa`; the rendered
//! documentation is served at `/docs`.

pub mod handlers;
pub mod models;
