//! Repository for the `security_code_attempts` table.

use patrimonio_core::types::{DbId, Timestamp};
use sqlx::PgExecutor;

use crate::models::security_code::SecurityCodeAttempt;

const COLUMNS: &str = "id, user_id, attempt_type, success, recycle_bin_entry_ids, created_at";

/// Records every check of the permanent-delete security code.
pub struct SecurityCodeAttemptRepo;

impl SecurityCodeAttemptRepo {
    pub async fn create<'e, E>(
        executor: E,
        user_id: DbId,
        attempt_type: &str,
        success: bool,
        entry_ids: &[DbId],
    ) -> Result<SecurityCodeAttempt, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "INSERT INTO security_code_attempts
                (user_id, attempt_type, success, recycle_bin_entry_ids)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SecurityCodeAttempt>(&query)
            .bind(user_id)
            .bind(attempt_type)
            .bind(success)
            .bind(entry_ids)
            .fetch_one(executor)
            .await
    }

    /// Failures since `since` that came after the user's last success.
    pub async fn count_recent_failures<'e, E>(
        executor: E,
        user_id: DbId,
        since: Timestamp,
    ) -> Result<i64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM security_code_attempts a
             WHERE a.user_id = $1 AND a.success = FALSE AND a.created_at >= $2
               AND a.created_at > COALESCE(
                   (SELECT MAX(s.created_at) FROM security_code_attempts s
                    WHERE s.user_id = $1 AND s.success = TRUE),
                   '-infinity'::timestamptz)",
        )
        .bind(user_id)
        .bind(since)
        .fetch_one(executor)
        .await?;
        Ok(row.0)
    }

    /// A user's attempts, newest first.
    pub async fn list_for_user<'e, E>(
        executor: E,
        user_id: DbId,
    ) -> Result<Vec<SecurityCodeAttempt>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "SELECT {COLUMNS} FROM security_code_attempts
             WHERE user_id = $1
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, SecurityCodeAttempt>(&query)
            .bind(user_id)
            .fetch_all(executor)
            .await
    }
}
