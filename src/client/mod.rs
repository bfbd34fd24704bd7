//! Typed HTTP client for the portal API

mod envelope;
mod error;
mod http;

pub use envelope::{unwrap_list, unwrap_record};
pub use error::ClientError;
pub use http::{ApiClient, DocumentUpload};
