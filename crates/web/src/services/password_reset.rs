//! Password reset by emailed link.
//!
//! A reset request issues one random token per active account with the
//! given email. Only the token's SHA-256 digest is stored. The link is valid
//! for [`TOKEN_TTL_HOURS`] and can be used once; a successful reset
//! invalidates every other outstanding token of that account.

use chrono::{Duration, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use thiserror::Error;
use tokio::task::JoinHandle;

use crm_core::{Email, EmailError, UserId};

use crate::db::{PasswordResetRepository, RepositoryError, UserRepository};
use crate::routes::password_reset_confirm_path;
use crate::services::auth::{AuthError, hash_password, validate_password};
use crate::services::email::EmailService;

/// How long a reset link stays valid.
pub const TOKEN_TTL_HOURS: i64 = 24;

#[derive(Debug, Error)]
pub enum PasswordResetError {
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Token unknown, expired or already used.
    #[error("the password reset link is invalid or has expired")]
    InvalidToken,

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl PasswordResetError {
    /// Whether the error belongs on the form rather than a 500 page.
    #[must_use]
    pub const fn is_user_facing(&self) -> bool {
        match self {
            Self::InvalidEmail(_) | Self::InvalidToken => true,
            Self::Auth(e) => e.is_user_facing(),
            Self::Repository(_) => false,
        }
    }
}

impl From<sqlx::Error> for PasswordResetError {
    fn from(err: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(err))
    }
}

/// A fresh random token: 32 bytes, hex encoded.
#[must_use]
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    hex::encode(bytes)
}

/// The stored form of a token.
#[must_use]
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Hand a reset mail to the SMTP relay without holding up the request.
fn send_in_background(
    mailer: &EmailService,
    user_id: UserId,
    to: String,
    username: String,
    reset_url: String,
) -> JoinHandle<()> {
    let mailer = mailer.clone();
    tokio::spawn(async move {
        if let Err(e) = mailer
            .send_password_reset(&to, &username, &reset_url)
            .await
        {
            tracing::error!(user_id = %user_id, error = %e, "Failed to send password reset email");
        }
    })
}

pub struct PasswordResetService<'a> {
    pool: &'a PgPool,
    mailer: Option<&'a EmailService>,
    base_url: &'a str,
}

impl<'a> PasswordResetService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, mailer: Option<&'a EmailService>, base_url: &'a str) -> Self {
        Self {
            pool,
            mailer,
            base_url,
        }
    }

    /// Issue and deliver reset links for every active account with this email.
    ///
    /// Unknown emails are not an error. Mail goes out on a spawned task and
    /// failures are only logged, so neither the response nor its timing
    /// reveals whether an account exists.
    ///
    /// # Errors
    ///
    /// Returns `PasswordResetError::InvalidEmail` for a malformed address and
    /// `PasswordResetError::Repository` if storing a token fails.
    pub async fn request(&self, email: &str) -> Result<(), PasswordResetError> {
        let email = Email::parse(email)?;
        let users = UserRepository::new(self.pool)
            .list_active_by_email(&email)
            .await?;
        let tokens = PasswordResetRepository::new(self.pool);

        for user in users {
            let token = generate_token();
            let expires_at = Utc::now() + Duration::hours(TOKEN_TTL_HOURS);
            tokens.create(user.id, &hash_token(&token), expires_at).await?;

            let reset_url = format!(
                "{}{}",
                self.base_url,
                password_reset_confirm_path(user.id, &token)
            );

            match self.mailer {
                Some(mailer) => {
                    send_in_background(
                        mailer,
                        user.id,
                        email.as_str().to_owned(),
                        user.username.as_str().to_owned(),
                        reset_url,
                    );
                }
                None => {
                    tracing::info!(
                        user_id = %user.id,
                        reset_url = %reset_url,
                        "SMTP not configured, password reset link logged instead"
                    );
                }
            }
        }

        Ok(())
    }

    /// Whether a link is still usable (for rendering the new-password form).
    ///
    /// # Errors
    ///
    /// Returns `PasswordResetError::Repository` if the lookup fails.
    pub async fn is_valid(&self, user_id: UserId, token: &str) -> Result<bool, PasswordResetError> {
        Ok(PasswordResetRepository::new(self.pool)
            .is_valid(user_id, &hash_token(token))
            .await?)
    }

    /// Consume the token and set the new password.
    ///
    /// # Errors
    ///
    /// Returns `PasswordResetError::InvalidToken` if the link is unusable,
    /// `PasswordResetError::Auth` if the new password is rejected.
    pub async fn complete(
        &self,
        user_id: UserId,
        token: &str,
        password: &str,
        password_confirm: &str,
    ) -> Result<(), PasswordResetError> {
        if password != password_confirm {
            return Err(AuthError::PasswordMismatch.into());
        }
        validate_password(password)?;
        let password_hash = hash_password(password)?;

        let mut tx = self.pool.begin().await?;
        if !PasswordResetRepository::consume(&mut tx, user_id, &hash_token(token)).await? {
            return Err(PasswordResetError::InvalidToken);
        }
        UserRepository::set_password_hash(&mut tx, user_id, &password_hash).await?;
        PasswordResetRepository::invalidate_all(&mut tx, user_id).await?;
        tx.commit().await?;

        tracing::info!(user_id = %user_id, "Password reset completed");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use secrecy::SecretString;

    use crate::config::EmailConfig;

    #[test]
    fn test_tokens_are_random_hex() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_hash_is_stable_and_differs_from_token() {
        let token = "0f".repeat(32);
        assert_eq!(hash_token(&token), hash_token(&token));
        assert_ne!(hash_token(&token), token);
        assert_eq!(
            hash_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_only_form_errors_are_user_facing() {
        assert!(PasswordResetError::InvalidToken.is_user_facing());
        assert!(PasswordResetError::Auth(AuthError::PasswordMismatch).is_user_facing());
        assert!(!PasswordResetError::Repository(RepositoryError::NotFound).is_user_facing());
    }

    #[tokio::test]
    async fn test_mail_is_sent_off_the_request_path() {
        // Nothing listens on port 1, so delivery fails inside the task.
        let mailer = EmailService::new(&EmailConfig {
            smtp_host: "127.0.0.1".to_string(),
            smtp_port: 1,
            smtp_username: "crm".to_string(),
            smtp_password: SecretString::from("secret"),
            from_address: "crm@localhost".to_string(),
        })
        .unwrap();

        let handle = send_in_background(
            &mailer,
            UserId::new(7),
            "dave@example.com".to_string(),
            "dave".to_string(),
            "http://localhost/password-reset/7/abc".to_string(),
        );

        let joined = tokio::time::timeout(std::time::Duration::from_secs(30), handle)
            .await
            .unwrap();
        assert!(joined.is_ok(), "a failed send must not panic the task");
    }
}
