//! Role group and membership repository.

use sqlx::{FromRow, PgConnection, PgPool};

use crm_core::{GroupId, UserId};

use super::RepositoryError;

/// A named role group.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct RoleGroup {
    pub id: GroupId,
    pub name: String,
}

/// Repository for role groups.
pub struct GroupRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> GroupRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All groups, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<RoleGroup>, RepositoryError> {
        let groups =
            sqlx::query_as::<_, RoleGroup>("SELECT id, name FROM crm.role_group ORDER BY id")
                .fetch_all(self.pool)
                .await?;
        Ok(groups)
    }

    /// Create the group if it does not exist and return it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn ensure(&self, name: &str) -> Result<RoleGroup, RepositoryError> {
        let group = sqlx::query_as::<_, RoleGroup>(
            r"
            INSERT INTO crm.role_group (name) VALUES ($1)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING id, name
            ",
        )
        .bind(name)
        .fetch_one(self.pool)
        .await?;
        Ok(group)
    }

    /// Look up a group by name on an open connection.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_name(
        conn: &mut PgConnection,
        name: &str,
    ) -> Result<Option<RoleGroup>, RepositoryError> {
        let group =
            sqlx::query_as::<_, RoleGroup>("SELECT id, name FROM crm.role_group WHERE name = $1")
                .bind(name)
                .fetch_optional(conn)
                .await?;
        Ok(group)
    }

    /// Add a membership.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the user is already a member.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn add_member(
        conn: &mut PgConnection,
        user_id: UserId,
        group_id: GroupId,
    ) -> Result<(), RepositoryError> {
        sqlx::query("INSERT INTO crm.user_group (user_id, group_id) VALUES ($1, $2)")
            .bind(user_id)
            .bind(group_id)
            .execute(conn)
            .await
            .map_err(|e| RepositoryError::from_insert(e, "group membership"))?;
        Ok(())
    }

    /// Drop every membership of a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn clear_memberships(
        conn: &mut PgConnection,
        user_id: UserId,
    ) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM crm.user_group WHERE user_id = $1")
            .bind(user_id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected())
    }
}
