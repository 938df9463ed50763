//! Axum route handlers.

pub mod documents;
pub mod pages;
pub mod wopi;
