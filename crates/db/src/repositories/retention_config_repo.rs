//! Repository for the `retention_configs` table.

use patrimonio_core::retention::RetentionPolicy;
use patrimonio_core::types::DbId;
use sqlx::PgExecutor;

use crate::models::retention_config::RetentionConfig;

const COLUMNS: &str = "module_name, retention_days, auto_delete_enabled, warning_days_before, \
    final_warning_days_before, updated_by, created_at, updated_at";

/// Provides access to per-module retention settings.
pub struct RetentionConfigRepo;

impl RetentionConfigRepo {
    pub async fn find<'e, E>(executor: E, module_name: &str) -> Result<Option<RetentionConfig>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!("SELECT {COLUMNS} FROM retention_configs WHERE module_name = $1");
        sqlx::query_as::<_, RetentionConfig>(&query)
            .bind(module_name)
            .fetch_optional(executor)
            .await
    }

    pub async fn list<'e, E>(executor: E) -> Result<Vec<RetentionConfig>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!("SELECT {COLUMNS} FROM retention_configs ORDER BY module_name");
        sqlx::query_as::<_, RetentionConfig>(&query)
            .fetch_all(executor)
            .await
    }

    /// The policy for `module_name`, falling back to [`RetentionPolicy::default`]
    /// when the module has no row.
    pub async fn policy_for<'e, E>(executor: E, module_name: &str) -> Result<RetentionPolicy, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        Ok(Self::find(executor, module_name)
            .await?
            .map(|c| c.policy())
            .unwrap_or_default())
    }

    /// Insert or replace a module's settings. The caller validates `policy`.
    pub async fn upsert<'e, E>(
        executor: E,
        module_name: &str,
        policy: &RetentionPolicy,
        updated_by: Option<DbId>,
    ) -> Result<RetentionConfig, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "INSERT INTO retention_configs
                (module_name, retention_days, auto_delete_enabled, warning_days_before,
                 final_warning_days_before, updated_by)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (module_name) DO UPDATE SET
                retention_days = EXCLUDED.retention_days,
                auto_delete_enabled = EXCLUDED.auto_delete_enabled,
                warning_days_before = EXCLUDED.warning_days_before,
                final_warning_days_before = EXCLUDED.final_warning_days_before,
                updated_by = EXCLUDED.updated_by
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, RetentionConfig>(&query)
            .bind(module_name)
            .bind(policy.retention_days)
            .bind(policy.auto_delete_enabled)
            .bind(policy.warning_days_before)
            .bind(policy.final_warning_days_before)
            .bind(updated_by)
            .fetch_one(executor)
            .await
    }
}
