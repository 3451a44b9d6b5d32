//! User management commands.

use thiserror::Error;

use crm_core::{Role, Username};
use crm_web::db::{RepositoryError, UserRepository};
use crm_web::services::auth::{AuthError, AuthService};

#[derive(Debug, Error)]
pub enum UserError {
    #[error("Missing environment variable: CRM_DATABASE_URL (or DATABASE_URL)")]
    MissingDatabaseUrl,

    #[error("Database connection error: {0}")]
    Connection(#[from] sqlx::Error),

    #[error("User not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    InvalidUsername(#[from] crm_core::UsernameError),
}

/// Create a user with the given role.
///
/// # Errors
///
/// Returns an error for invalid input, a taken username, a missing role
/// group, or database failures.
pub async fn create(
    username: &str,
    email: &str,
    password: &str,
    role: Role,
) -> Result<(), UserError> {
    let pool = super::connect()
        .await?
        .ok_or(UserError::MissingDatabaseUrl)?;

    let user = AuthService::new(&pool)
        .create_user(username, email, password, role)
        .await?;

    tracing::info!(user_id = %user.id, username = %user.username, %role, "User created");
    Ok(())
}

/// Move a user into the group for `role`, dropping other memberships.
///
/// # Errors
///
/// Returns `UserError::NotFound` for an unknown username, or an error if the
/// role group is missing or the database is unreachable.
pub async fn set_role(username: &str, role: Role) -> Result<(), UserError> {
    let username = Username::parse(username)?;
    let pool = super::connect()
        .await?
        .ok_or(UserError::MissingDatabaseUrl)?;

    let user = UserRepository::new(&pool)
        .get_by_username(&username)
        .await?
        .ok_or_else(|| UserError::NotFound(username.to_string()))?;

    AuthService::new(&pool).assign_role(user.id, role).await?;

    tracing::info!(
        user_id = %user.id,
        %role,
        "Role updated; takes effect at the user's next login"
    );
    Ok(())
}
