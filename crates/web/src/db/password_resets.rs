//! Password reset token storage.
//!
//! Only the SHA-256 hex digest of a token is stored; the raw token exists
//! solely in the emailed link.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use crm_core::UserId;

use super::RepositoryError;

pub struct PasswordResetRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PasswordResetRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a new token hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        user_id: UserId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO crm.password_reset_token (user_id, token_hash, expires_at)
            VALUES ($1, $2, $3)
            ",
        )
        .bind(user_id)
        .bind(token_hash)
        .bind(expires_at)
        .execute(self.pool)
        .await
        .map_err(|e| RepositoryError::from_insert(e, "reset token"))?;
        Ok(())
    }

    /// Whether an unused, unexpired token exists for this user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn is_valid(&self, user_id: UserId, token_hash: &str) -> Result<bool, RepositoryError> {
        let valid = sqlx::query_scalar::<_, bool>(
            r"
            SELECT EXISTS(
                SELECT 1 FROM crm.password_reset_token
                WHERE user_id = $1 AND token_hash = $2
                  AND used_at IS NULL AND expires_at > NOW()
            )
            ",
        )
        .bind(user_id)
        .bind(token_hash)
        .fetch_one(self.pool)
        .await?;
        Ok(valid)
    }

    /// Mark a token used. Returns `false` if it was already used, expired,
    /// or never issued to this user.
    ///
    /// The check and the update are one statement, so two concurrent
    /// submissions cannot both succeed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn consume(
        conn: &mut PgConnection,
        user_id: UserId,
        token_hash: &str,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE crm.password_reset_token
            SET used_at = NOW()
            WHERE user_id = $1 AND token_hash = $2
              AND used_at IS NULL AND expires_at > NOW()
            ",
        )
        .bind(user_id)
        .bind(token_hash)
        .execute(conn)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Invalidate every outstanding token of a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn invalidate_all(
        conn: &mut PgConnection,
        user_id: UserId,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            UPDATE crm.password_reset_token
            SET used_at = NOW()
            WHERE user_id = $1 AND used_at IS NULL
            ",
        )
        .bind(user_id)
        .execute(conn)
        .await?;
        Ok(())
    }
}
