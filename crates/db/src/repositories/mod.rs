//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async data-access
//! methods. Single-statement methods are generic over [`sqlx::PgExecutor`]
//! so they run against `&PgPool` or `&mut *tx` alike. Every read of a
//! soft-deletable table takes an explicit [`QueryMode`](patrimonio_core::entity::QueryMode).

pub mod asset_repo;
pub mod catalog_repo;
pub mod deletion_audit_repo;
pub mod movement_repo;
pub mod notification_repo;
pub mod office_repo;
pub mod recycle_bin_repo;
pub mod retention_config_repo;
pub mod security_code_repo;
pub mod soft_delete_repo;
pub mod status_history_repo;
pub mod sync_repo;
pub mod user_repo;

pub use asset_repo::AssetRepo;
pub use catalog_repo::CatalogItemRepo;
pub use deletion_audit_repo::DeletionAuditRepo;
pub use movement_repo::MovementRepo;
pub use notification_repo::NotificationRepo;
pub use office_repo::OfficeRepo;
pub use recycle_bin_repo::RecycleBinRepo;
pub use retention_config_repo::RetentionConfigRepo;
pub use security_code_repo::SecurityCodeAttemptRepo;
pub use soft_delete_repo::{DeletionTarget, SoftDeleteRepo};
pub use status_history_repo::StatusHistoryRepo;
pub use sync_repo::{OfflineChangeRepo, SyncConflictRepo, SyncSessionRepo};
pub use user_repo::UserRepo;
