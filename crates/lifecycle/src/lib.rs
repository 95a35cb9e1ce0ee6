//! Soft-delete lifecycle engine, recycle-bin ledger and retention jobs.
//!
//! - [`records`]: create/update hooks for offices, catalog items, assets,
//!   movements and condition changes.
//! - [`soft_delete`]: soft delete, restore, hard delete and the asset cascade.
//! - [`ledger`]: permission-checked recycle-bin operations.
//! - [`retention`]: the cleanup, warning and final-warning jobs.

pub mod error;
pub mod ledger;
pub mod records;
pub mod retention;
pub mod soft_delete;

pub use error::LifecycleError;
