//! Repository for the `notifications` table.

use patrimonio_core::types::{DbId, Timestamp};
use sqlx::PgExecutor;

use crate::models::notification::{CreateNotification, Notification};

const COLUMNS: &str = "id, user_id, kind, title, message, priority, payload, is_read, read_at, \
    expires_at, created_at";

/// Provides persistence for in-app notifications.
pub struct NotificationRepo;

impl NotificationRepo {
    pub async fn create<'e, E>(
        executor: E,
        input: &CreateNotification,
    ) -> Result<Notification, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "INSERT INTO notifications
                (user_id, kind, title, message, priority, payload, expires_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(input.user_id)
            .bind(&input.kind)
            .bind(&input.title)
            .bind(&input.message)
            .bind(&input.priority)
            .bind(&input.payload)
            .bind(input.expires_at)
            .fetch_one(executor)
            .await
    }

    /// A user's notifications, newest first. Expired rows are skipped.
    pub async fn list_for_user<'e, E>(
        executor: E,
        user_id: DbId,
        unread_only: bool,
        limit: i64,
    ) -> Result<Vec<Notification>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "SELECT {COLUMNS} FROM notifications
             WHERE user_id = $1
               AND ($2 = FALSE OR is_read = FALSE)
               AND (expires_at IS NULL OR expires_at > NOW())
             ORDER BY created_at DESC, id DESC
             LIMIT $3"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(user_id)
            .bind(unread_only)
            .bind(limit)
            .fetch_all(executor)
            .await
    }

    /// Whether `user_id` received a `kind` notification at or after `since`.
    pub async fn exists_since<'e, E>(
        executor: E,
        user_id: DbId,
        kind: &str,
        since: Timestamp,
    ) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let row: (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM notifications \
             WHERE user_id = $1 AND kind = $2 AND created_at >= $3)",
        )
        .bind(user_id)
        .bind(kind)
        .bind(since)
        .fetch_one(executor)
        .await?;
        Ok(row.0)
    }

    /// Count a user's notifications of one kind.
    pub async fn count_for_user<'e, E>(executor: E, user_id: DbId, kind: &str) -> Result<i64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let row: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND kind = $2")
                .bind(user_id)
                .bind(kind)
                .fetch_one(executor)
                .await?;
        Ok(row.0)
    }

    /// Mark one of the user's notifications read. Returns `true` if it changed.
    pub async fn mark_read<'e, E>(executor: E, id: DbId, user_id: DbId) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE, read_at = NOW() \
             WHERE id = $1 AND user_id = $2 AND is_read = FALSE",
        )
        .bind(id)
        .bind(user_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
