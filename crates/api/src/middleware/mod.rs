//! Authentication and authorization extractors.
//!
//! - [`auth::AuthUser`] -- Claims from a JWT Bearer token.
//! - [`auth::CurrentUser`] -- The token's user reloaded from the database,
//!   with its permission-layer [`Principal`](patrimonio_core::permissions::Principal).
//! - [`rbac::RequireActive`] -- Requires an active account.
//! - [`rbac::RequireEditor`] -- Requires the `EditRecords` capability.

pub mod auth;
pub mod rbac;
