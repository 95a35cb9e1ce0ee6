pub mod asset;
pub mod catalog;
pub mod deletion_audit;
pub mod movement;
pub mod notification;
pub mod office;
pub mod recycle_bin;
pub mod retention_config;
pub mod security_code;
pub mod status_history;
pub mod sync;
pub mod user;
