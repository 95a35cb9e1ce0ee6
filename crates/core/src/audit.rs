//! Deletion audit action names.
//!
//! Must match `ck_deletion_audit_logs_action`.

pub const ACTION_SOFT_DELETE: &str = "soft_delete";
pub const ACTION_RESTORE: &str = "restore";
pub const ACTION_PERMANENT_DELETE: &str = "permanent_delete";
pub const ACTION_AUTO_DELETE: &str = "auto_delete";
pub const ACTION_BULK_RESTORE: &str = "bulk_restore";

pub const VALID_ACTIONS: &[&str] = &[
    ACTION_SOFT_DELETE,
    ACTION_RESTORE,
    ACTION_PERMANENT_DELETE,
    ACTION_AUTO_DELETE,
    ACTION_BULK_RESTORE,
];

pub fn validate_action(action: &str) -> Result<(), String> {
    if VALID_ACTIONS.contains(&action) {
        Ok(())
    } else {
        Err(format!(
            "Invalid audit action '{action}'. Must be one of: {}",
            VALID_ACTIONS.join(", ")
        ))
    }
}
