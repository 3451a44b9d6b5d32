//! Registration, login and logout.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::Route;
use super::layout::NavView;
use crate::error::{AppError, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{Flashes, clear_current_user, push_flash, set_current_user};
use crate::models::{FlashLevel, FlashMessage};
use crate::services::auth::{AuthError, AuthService, Registration};
use crate::state::AppState;

/// Shown for any failed login, whatever the cause.
pub const LOGIN_FAILED_MESSAGE: &str = "Username or Password incorrect";

// =============================================================================
// Form Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub next: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub username: String,
    #[serde(default)]
    pub email: String,
    pub password1: String,
    pub password2: String,
}

#[derive(Debug, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub nav: NavView,
    pub flashes: Vec<FlashMessage>,
    pub error: Option<String>,
    pub username: String,
    pub next: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub nav: NavView,
    pub error: Option<String>,
    pub username: String,
    pub email: String,
}

/// Post-login target, if it is a path on this site.
///
/// Rejects absolute and scheme-relative URLs so `next` cannot be used as an
/// open redirect.
#[must_use]
pub fn safe_next(next: &str) -> Option<&str> {
    let next = next.trim();
    let local = next.starts_with('/')
        && !next.starts_with("//")
        && !next.contains('\\')
        && !next.chars().any(char::is_control);
    local.then_some(next)
}

// =============================================================================
// Login
// =============================================================================

pub async fn login_page(
    Flashes(flashes): Flashes,
    Query(query): Query<NextQuery>,
) -> impl IntoResponse {
    LoginTemplate {
        nav: NavView::default(),
        flashes,
        error: None,
        username: String::new(),
        next: query
            .next
            .as_deref()
            .and_then(safe_next)
            .unwrap_or_default()
            .to_owned(),
    }
}

/// Authenticate, store the user (with its resolved role) in the session and
/// continue to `next` or the dashboard.
#[instrument(skip_all, fields(username = %form.username))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let user = match AuthService::new(state.pool())
        .login(&form.username, &form.password)
        .await
    {
        Ok(user) => user,
        Err(AuthError::InvalidCredentials) => {
            tracing::info!("Login failed");
            return Ok(LoginTemplate {
                nav: NavView::default(),
                flashes: Vec::new(),
                error: Some(LOGIN_FAILED_MESSAGE.to_string()),
                username: form.username.trim().to_owned(),
                next: safe_next(&form.next).unwrap_or_default().to_owned(),
            }
            .into_response());
        }
        Err(e) => return Err(e.into()),
    };

    set_current_user(&session, &user).await?;
    set_sentry_user(&user.id, &user.username);
    tracing::info!(user_id = %user.id, role = %user.role, "Logged in");

    let target = safe_next(&form.next).unwrap_or(Route::Dashboard.path());
    Ok(Redirect::to(target).into_response())
}

pub async fn logout(session: Session) -> Result<Redirect, AppError> {
    clear_current_user(&session).await?;
    clear_sentry_user();
    Ok(Redirect::to(Route::Login.path()))
}

// =============================================================================
// Registration
// =============================================================================

pub async fn register_page() -> impl IntoResponse {
    RegisterTemplate {
        nav: NavView::default(),
        error: None,
        username: String::new(),
        email: String::new(),
    }
}

/// Create the account (provisioned as a customer) and send the caller to
/// the login page.
#[instrument(skip_all, fields(username = %form.username))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Result<Response, AppError> {
    let registration = Registration {
        username: &form.username,
        email: &form.email,
        password: &form.password1,
        password_confirm: &form.password2,
    };

    match AuthService::new(state.pool()).register(registration).await {
        Ok(user) => {
            push_flash(
                &session,
                FlashLevel::Success,
                format!("Account has been created for {}", user.username),
            )
            .await;
            Ok(Redirect::to(Route::Login.path()).into_response())
        }
        Err(e) if e.is_user_facing() => Ok(RegisterTemplate {
            nav: NavView::default(),
            error: Some(registration_error_message(&e)),
            username: form.username.trim().to_owned(),
            email: form.email.trim().to_owned(),
        }
        .into_response()),
        Err(e) => Err(e.into()),
    }
}

fn registration_error_message(err: &AuthError) -> String {
    match err {
        AuthError::UserAlreadyExists => "A user with that username already exists.".to_string(),
        AuthError::InvalidUsername(e) => format!("Enter a valid username: {e}."),
        AuthError::InvalidEmail(_) => "Enter a valid email address.".to_string(),
        AuthError::PasswordMismatch => "The two password fields didn't match.".to_string(),
        other => format!("{}.", capitalize(&other.to_string())),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    chars
        .next()
        .map(|first| first.to_uppercase().chain(chars).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_next_accepts_local_paths() {
        assert_eq!(safe_next("/customer/4/"), Some("/customer/4/"));
        assert_eq!(
            safe_next("/customer/4/?status=Pending"),
            Some("/customer/4/?status=Pending")
        );
    }

    #[test]
    fn test_safe_next_rejects_offsite_targets() {
        assert_eq!(safe_next(""), None);
        assert_eq!(safe_next("https://evil.example/"), None);
        assert_eq!(safe_next("//evil.example/"), None);
        assert_eq!(safe_next("/\\evil.example"), None);
        assert_eq!(safe_next("orders/"), None);
    }

    #[test]
    fn test_registration_error_messages() {
        assert_eq!(
            registration_error_message(&AuthError::UserAlreadyExists),
            "A user with that username already exists."
        );
        assert_eq!(
            registration_error_message(&AuthError::WeakPassword(
                "password must be at least 8 characters".to_string()
            )),
            "Password validation failed: password must be at least 8 characters."
        );
    }
}
