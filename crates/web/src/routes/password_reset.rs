//! Password reset: request, sent, confirm, complete.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use crm_core::UserId;

use super::Route;
use super::layout::NavView;
use crate::error::AppError;
use crate::filters;
use crate::services::password_reset::{PasswordResetError, PasswordResetService};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ResetRequestForm {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct SetPasswordForm {
    pub new_password1: String,
    pub new_password2: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "auth/reset_password.html")]
pub struct ResetRequestTemplate {
    pub nav: NavView,
    pub email: String,
    pub error: Option<String>,
}

#[derive(Template, WebTemplate)]
#[template(path = "auth/reset_password_sent.html")]
pub struct ResetSentTemplate {
    pub nav: NavView,
}

#[derive(Template, WebTemplate)]
#[template(path = "auth/reset_password_confirm.html")]
pub struct ResetConfirmTemplate {
    pub nav: NavView,
    /// `false` renders the "link invalid" message instead of the form.
    pub valid_link: bool,
    pub error: Option<String>,
}

#[derive(Template, WebTemplate)]
#[template(path = "auth/reset_password_complete.html")]
pub struct ResetCompleteTemplate {
    pub nav: NavView,
}

fn service(state: &AppState) -> PasswordResetService<'_> {
    PasswordResetService::new(state.pool(), state.mailer(), &state.config().base_url)
}

pub async fn request_page() -> impl IntoResponse {
    ResetRequestTemplate {
        nav: NavView::default(),
        email: String::new(),
        error: None,
    }
}

/// Issue reset links. Always continues to the "sent" page for well-formed
/// addresses, whether or not an account matched.
#[instrument(skip_all)]
pub async fn request(
    State(state): State<AppState>,
    Form(form): Form<ResetRequestForm>,
) -> Result<Response, AppError> {
    match service(&state).request(&form.email).await {
        Ok(()) => Ok(Redirect::to(Route::ResetPasswordSent.path()).into_response()),
        Err(PasswordResetError::InvalidEmail(_)) => Ok(ResetRequestTemplate {
            nav: NavView::default(),
            email: form.email.trim().to_owned(),
            error: Some("Enter a valid email address.".to_string()),
        }
        .into_response()),
        Err(e) => Err(e.into()),
    }
}

pub async fn sent() -> impl IntoResponse {
    ResetSentTemplate {
        nav: NavView::default(),
    }
}

#[instrument(skip_all, fields(user_id = %uid))]
pub async fn confirm_page(
    State(state): State<AppState>,
    Path((uid, token)): Path<(UserId, String)>,
) -> Result<impl IntoResponse, AppError> {
    let valid_link = service(&state).is_valid(uid, &token).await?;
    Ok(ResetConfirmTemplate {
        nav: NavView::default(),
        valid_link,
        error: None,
    })
}

#[instrument(skip_all, fields(user_id = %uid))]
pub async fn confirm(
    State(state): State<AppState>,
    Path((uid, token)): Path<(UserId, String)>,
    Form(form): Form<SetPasswordForm>,
) -> Result<Response, AppError> {
    let result = service(&state)
        .complete(uid, &token, &form.new_password1, &form.new_password2)
        .await;

    match result {
        Ok(()) => Ok(Redirect::to(Route::ResetPasswordComplete.path()).into_response()),
        Err(PasswordResetError::InvalidToken) => Ok(ResetConfirmTemplate {
            nav: NavView::default(),
            valid_link: false,
            error: None,
        }
        .into_response()),
        Err(e) if e.is_user_facing() => Ok(ResetConfirmTemplate {
            nav: NavView::default(),
            valid_link: true,
            error: Some(e.to_string()),
        }
        .into_response()),
        Err(e) => Err(e.into()),
    }
}

pub async fn complete() -> impl IntoResponse {
    ResetCompleteTemplate {
        nav: NavView::default(),
    }
}
