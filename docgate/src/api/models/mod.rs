//! Request/response data structures for API communication.

pub mod documents;
pub mod wopi;
