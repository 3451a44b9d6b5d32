//! Role group commands.

use thiserror::Error;

use crm_core::{ADMIN_GROUP, CUSTOMER_GROUP};
use crm_web::db::{GroupRepository, RepositoryError};

#[derive(Debug, Error)]
pub enum GroupError {
    #[error("Missing environment variable: CRM_DATABASE_URL (or DATABASE_URL)")]
    MissingDatabaseUrl,

    #[error("Database connection error: {0}")]
    Connection(#[from] sqlx::Error),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Create the role groups the application relies on.
///
/// Safe to run repeatedly; existing groups are left as they are.
///
/// # Errors
///
/// Returns an error if the database is unreachable.
pub async fn ensure() -> Result<(), GroupError> {
    let pool = super::connect()
        .await?
        .ok_or(GroupError::MissingDatabaseUrl)?;
    let groups = GroupRepository::new(&pool);

    for name in [ADMIN_GROUP, CUSTOMER_GROUP] {
        let group = groups.ensure(name).await?;
        tracing::info!(group_id = %group.id, name = %group.name, "Role group present");
    }
    Ok(())
}

/// Log every role group.
///
/// # Errors
///
/// Returns an error if the database is unreachable.
pub async fn list() -> Result<(), GroupError> {
    let pool = super::connect()
        .await?
        .ok_or(GroupError::MissingDatabaseUrl)?;

    let groups = GroupRepository::new(&pool).list().await?;
    if groups.is_empty() {
        tracing::warn!("No role groups. Run `crm-cli group ensure`.");
    }
    for group in groups {
        tracing::info!("{}  {}", group.id, group.name);
    }
    Ok(())
}
