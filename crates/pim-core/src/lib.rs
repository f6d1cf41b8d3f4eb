//! pim-core: domain logic for the project information manager.
//!
//! This crate owns the project/block/template data model, SQLite storage,
//! access control, the service layer, and the JSON API boundary.

pub mod api;
pub mod auth;
pub mod config;
pub mod core;
pub mod model;
pub mod store;
pub mod validate;
pub mod version;
