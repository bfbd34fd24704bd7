//! Service layer modules

pub mod uploads;

pub use uploads::UploadStore;
