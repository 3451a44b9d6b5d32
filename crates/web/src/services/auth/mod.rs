//! Authentication service.
//!
//! Registration (with customer provisioning), username/password login and
//! role assignment.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sqlx::PgPool;

use crm_core::{Email, Role, UserId, Username};

use crate::db::{GroupRepository, RepositoryError, UserRepository};
use crate::models::{CurrentUser, User};
use crate::services::provisioning::{PgProvisioningStore, ProvisioningError, provision_customer};

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Raw registration form values.
#[derive(Debug, Clone, Copy)]
pub struct Registration<'r> {
    pub username: &'r str,
    /// Blank means no email.
    pub email: &'r str,
    pub password: &'r str,
    pub password_confirm: &'r str,
}

/// Authentication service.
pub struct AuthService<'a> {
    pool: &'a PgPool,
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            pool,
            users: UserRepository::new(pool),
        }
    }

    /// Register a new customer.
    ///
    /// The identity insert and customer provisioning share one transaction:
    /// if provisioning fails nothing is saved.
    ///
    /// # Errors
    ///
    /// Returns a user-facing `AuthError` for invalid input or a taken handle,
    /// `AuthError::Provisioning` if the customer group is missing, and
    /// `AuthError::Repository` for database failures.
    pub async fn register(&self, form: Registration<'_>) -> Result<User, AuthError> {
        if form.password != form.password_confirm {
            return Err(AuthError::PasswordMismatch);
        }
        self.create_user(form.username, form.email, form.password, Role::Customer)
            .await
    }

    /// Create an identity with the given role.
    ///
    /// `Customer` runs the full provisioning step, `Admin` only joins the
    /// admin group, `Unknown` creates a group-less identity.
    ///
    /// # Errors
    ///
    /// Same as [`Self::register`], minus the confirmation check.
    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
        role: Role,
    ) -> Result<User, AuthError> {
        let username = Username::parse(username)?;
        let email = match email.trim() {
            "" => None,
            e => Some(Email::parse(e)?),
        };
        validate_password(password)?;
        let password_hash = hash_password(password)?;

        let mut tx = self.pool.begin().await?;

        let user = UserRepository::insert(&mut tx, &username, email.as_ref(), &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        match role {
            Role::Customer => {
                provision_customer(&mut PgProvisioningStore::new(&mut tx), &user).await?;
            }
            Role::Admin => {
                let group = GroupRepository::find_by_name(&mut tx, crm_core::ADMIN_GROUP)
                    .await?
                    .ok_or(ProvisioningError::MissingGroup(crm_core::ADMIN_GROUP))?;
                GroupRepository::add_member(&mut tx, user.id, group.id).await?;
            }
            Role::Unknown => {}
        }

        tx.commit().await?;

        tracing::info!(user_id = %user.id, username = %user.username, %role, "Created user");
        Ok(user)
    }

    /// Check a username/password pair and resolve the caller's role.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the handle is unknown,
    /// inactive, or the password is wrong.
    pub async fn login(&self, username: &str, password: &str) -> Result<CurrentUser, AuthError> {
        let (user, password_hash) = self
            .users
            .get_login_record(username.trim())
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        let groups = self.users.group_names(user.id).await?;
        let role = Role::resolve(&groups);
        if role == Role::Unknown {
            tracing::warn!(user_id = %user.id, ?groups, "User logged in without a recognised role group");
        }

        self.users.touch_last_login(user.id).await?;

        Ok(CurrentUser {
            id: user.id,
            username: user.username.into(),
            role,
        })
    }

    /// Replace a user's role group membership.
    ///
    /// Takes effect at the user's next login.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user doesn't exist and
    /// `AuthError::Provisioning` if the target group is missing.
    pub async fn assign_role(&self, user_id: UserId, role: Role) -> Result<(), AuthError> {
        if self.users.get_by_id(user_id).await?.is_none() {
            return Err(AuthError::UserNotFound);
        }

        let mut tx = self.pool.begin().await?;
        GroupRepository::clear_memberships(&mut tx, user_id).await?;
        if let Some(name) = role.group_name() {
            let group = GroupRepository::find_by_name(&mut tx, name)
                .await?
                .ok_or(ProvisioningError::MissingGroup(name))?;
            GroupRepository::add_member(&mut tx, user_id, group.id).await?;
        }
        tx.commit().await?;

        tracing::info!(user_id = %user_id, %role, "Assigned role");
        Ok(())
    }
}

/// Validate password meets requirements.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` describing the first failed rule.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    if password.chars().all(|c| c.is_ascii_digit()) {
        return Err(AuthError::WeakPassword(
            "password can't be entirely numeric".to_string(),
        ));
    }
    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong horse", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_verify_rejects_garbage_hash() {
        assert!(matches!(
            verify_password("whatever", "not-a-phc-string"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_password_rules() {
        assert!(validate_password("s3cret-pw").is_ok());
        assert!(matches!(
            validate_password("short"),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(matches!(
            validate_password("12345678901"),
            Err(AuthError::WeakPassword(_))
        ));
    }

    #[test]
    fn test_user_facing_errors() {
        assert!(AuthError::InvalidCredentials.is_user_facing());
        assert!(AuthError::PasswordMismatch.is_user_facing());
        assert!(!AuthError::PasswordHash.is_user_facing());
        assert!(
            !AuthError::Provisioning(ProvisioningError::MissingGroup("customer")).is_user_facing()
        );
    }
}
