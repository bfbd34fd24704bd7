//! API response types

pub mod response;

pub use response::{Created, DataResponse, ListMeta, ListResponse, MessageResponse};
