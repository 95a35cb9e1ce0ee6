//! Pure domain logic for the patrimonio registry.
//!
//! Nothing in this crate touches the database. Repositories live in
//! `patrimonio_db`; the services that combine both live in
//! `patrimonio_lifecycle` and `patrimonio_sync`.

pub mod asset;
pub mod audit;
pub mod entity;
pub mod error;
pub mod notifications;
pub mod permissions;
pub mod recycle_bin;
pub mod retention;
pub mod roles;
pub mod security;
pub mod sync;
pub mod types;
