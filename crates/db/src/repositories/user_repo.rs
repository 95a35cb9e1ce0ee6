//! Repository for the `users` table.

use patrimonio_core::types::DbId;
use sqlx::PgExecutor;

use crate::models::user::{CreateUser, User};

const COLUMNS: &str = "id, username, email, full_name, role, is_active, created_at, updated_at";

/// Provides lookups and minimal management for users.
///
/// Credentials live with the external auth provider; this table only carries
/// the role and active flag the permission layer needs.
pub struct UserRepo;

impl UserRepo {
    pub async fn create<'e, E>(executor: E, input: &CreateUser) -> Result<User, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "INSERT INTO users (username, email, full_name, role)
             VALUES ($1, $2, COALESCE($3, ''), $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(&input.username)
            .bind(&input.email)
            .bind(&input.full_name)
            .bind(&input.role)
            .fetch_one(executor)
            .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: DbId) -> Result<Option<User>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Activate or deactivate a user. Returns `true` if the row changed.
    pub async fn set_active<'e, E>(executor: E, id: DbId, active: bool) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("UPDATE users SET is_active = $2 WHERE id = $1 AND is_active <> $2")
            .bind(id)
            .bind(active)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
