//! Identity repository.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, PgPool};

use crm_core::{Email, UserId, Username};

use super::RepositoryError;
use crate::models::User;

#[derive(FromRow)]
struct UserRow {
    id: UserId,
    username: String,
    email: Option<String>,
    is_active: bool,
    last_login: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let username = Username::parse(&row.username).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid username in database: {e}"))
        })?;
        let email = row
            .email
            .filter(|e| !e.is_empty())
            .map(|e| Email::parse(&e))
            .transpose()
            .map_err(|e| {
                RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
            })?;

        Ok(Self {
            id: row.id,
            username,
            email,
            is_active: row.is_active,
            last_login: row.last_login,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct LoginRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

const USER_COLUMNS: &str = "id, username, email, is_active, last_login, created_at";

/// Repository for identity database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let sql = format!(r#"SELECT {USER_COLUMNS} FROM crm."user" WHERE id = $1"#);
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    /// Get a user by handle.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<User>, RepositoryError> {
        let sql = format!(r#"SELECT {USER_COLUMNS} FROM crm."user" WHERE username = $1"#);
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(username.as_str())
            .fetch_optional(self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    /// Active users registered with this email (case-insensitive).
    ///
    /// Several identities may share one address; each gets its own reset link.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_active_by_email(&self, email: &Email) -> Result<Vec<User>, RepositoryError> {
        let sql = format!(
            r#"SELECT {USER_COLUMNS} FROM crm."user"
               WHERE lower(email) = lower($1) AND is_active
               ORDER BY id"#
        );
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(email.as_str())
            .fetch_all(self.pool)
            .await?
            .into_iter()
            .map(User::try_from)
            .collect()
    }

    /// Get an active user and its password hash for login.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_login_record(
        &self,
        username: &str,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let sql = format!(
            r#"SELECT {USER_COLUMNS}, password_hash FROM crm."user"
               WHERE username = $1 AND is_active"#
        );
        let Some(row) = sqlx::query_as::<_, LoginRow>(&sql)
            .bind(username)
            .fetch_optional(self.pool)
            .await?
        else {
            return Ok(None);
        };

        Ok(Some((User::try_from(row.user)?, row.password_hash)))
    }

    /// Group names of a user, ordered by group id.
    ///
    /// The order makes [`crm_core::Role::resolve`] deterministic.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn group_names(&self, id: UserId) -> Result<Vec<String>, RepositoryError> {
        let names = sqlx::query_scalar::<_, String>(
            r"
            SELECT g.name
            FROM crm.user_group ug
            JOIN crm.role_group g ON g.id = ug.group_id
            WHERE ug.user_id = $1
            ORDER BY g.id
            ",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        Ok(names)
    }

    /// Record a successful login.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn touch_last_login(&self, id: UserId) -> Result<(), RepositoryError> {
        sqlx::query(r#"UPDATE crm."user" SET last_login = NOW() WHERE id = $1"#)
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Insert a new identity on an open connection (usually a transaction).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the handle is taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn insert(
        conn: &mut PgConnection,
        username: &Username,
        email: Option<&Email>,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let sql = format!(
            r#"INSERT INTO crm."user" (username, email, password_hash)
               VALUES ($1, $2, $3)
               RETURNING {USER_COLUMNS}"#
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(username.as_str())
            .bind(email.map(Email::as_str))
            .bind(password_hash)
            .fetch_one(conn)
            .await
            .map_err(|e| RepositoryError::from_insert(e, "username"))?;

        User::try_from(row)
    }

    /// Replace a user's password hash on an open connection.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn set_password_hash(
        conn: &mut PgConnection,
        id: UserId,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(r#"UPDATE crm."user" SET password_hash = $1 WHERE id = $2"#)
            .bind(password_hash)
            .bind(id)
            .execute(conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
