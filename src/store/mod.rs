//! Client-side stores
//!
//! A [`ResourceStore`] keeps the local collection of one entity type, mutates it
//! through the [`ApiClient`](crate::client::ApiClient) and exposes
//! `loading`/`error` state. A [`StoreRegistry`] hands every consumer the same
//! collection per type; a [`Scope`] ties requests to a consumer's lifetime.

mod collection;
mod registry;
mod scope;

pub use collection::{Items, ResourceStore};
pub use registry::StoreRegistry;
pub use scope::{Scope, ScopeToken};
