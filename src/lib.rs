//! DigiUrban municipal portal
//!
//! The REST backend (`app`, `routes`, `db`, `auth`), the typed client and shared
//! client-side stores (`client`, `store`) and the schema patcher (`schema`) all
//! build on the entity definitions in [`domain`].

pub mod api;
pub mod app;
pub mod auth;
pub mod client;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod logging;
pub mod middleware;
pub mod routes;
pub mod schema;
pub mod services;
pub mod store;
