//! Identity context and authentication extractors.
//!
//! [`identity_middleware`] reads the logged-in user from the session once per
//! request and stores an [`IdentityContext`] in the request extensions. The
//! guard chain and the extractors below only ever look at that context.

use axum::{
    extract::{FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crm_core::Role;

use crate::models::{CurrentUser, session_keys};
use crate::routes::Route;

/// Authentication state of the current request.
///
/// Anonymous callers have no user and the role [`Role::Unknown`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityContext {
    user: Option<CurrentUser>,
}

impl IdentityContext {
    #[must_use]
    pub const fn anonymous() -> Self {
        Self { user: None }
    }

    #[must_use]
    pub const fn authenticated(user: CurrentUser) -> Self {
        Self { user: Some(user) }
    }

    #[must_use]
    pub const fn user(&self) -> Option<&CurrentUser> {
        self.user.as_ref()
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// The role resolved at login, or `Unknown` when anonymous.
    #[must_use]
    pub fn role(&self) -> Role {
        self.user.as_ref().map_or(Role::Unknown, |u| u.role)
    }
}

/// Load the [`IdentityContext`] from the session into request extensions.
///
/// Requests without a session layer, or with an unreadable session, are
/// treated as anonymous.
pub async fn identity_middleware(mut request: Request, next: Next) -> Response {
    let user = match request.extensions().get::<Session>() {
        Some(session) => session
            .get::<CurrentUser>(session_keys::CURRENT_USER)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Failed to read user from session");
                None
            }),
        None => None,
    };

    let identity = user.map_or_else(IdentityContext::anonymous, IdentityContext::authenticated);
    request.extensions_mut().insert(identity);

    next.run(request).await
}

/// Extractor for the current [`IdentityContext`]. Never rejects.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(Identity(identity): Identity) -> impl IntoResponse {
///     match identity.user() {
///         Some(u) => format!("Hello, {}!", u.username),
///         None => "Hello, guest!".to_string(),
///     }
/// }
/// ```
pub struct Identity(pub IdentityContext);

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(
            parts
                .extensions
                .get::<IdentityContext>()
                .cloned()
                .unwrap_or_default(),
        ))
    }
}

/// Extractor that requires a logged-in user.
///
/// Routes behind `LoginRequired` always have one; anywhere else an
/// anonymous caller is redirected to the login page.
pub struct RequireUser(pub CurrentUser);

/// Returned by [`RequireUser`] when nobody is logged in.
pub struct LoginRedirect;

impl IntoResponse for LoginRedirect {
    fn into_response(self) -> Response {
        Redirect::to(Route::Login.path()).into_response()
    }
}

impl<S> FromRequestParts<S> for RequireUser
where
    S: Send + Sync,
{
    type Rejection = LoginRedirect;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<IdentityContext>()
            .and_then(IdentityContext::user)
            .cloned()
            .map(Self)
            .ok_or(LoginRedirect)
    }
}

/// Store the logged-in user in the session.
///
/// The session id is cycled first so a pre-login id cannot be reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Remove all session data (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}
