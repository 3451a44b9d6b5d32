//! Customer-facing pages: own orders and account settings.

use std::path::Path;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Multipart, State},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::instrument;
use uuid::Uuid;

use crm_core::Email;

use super::Route;
use super::layout::NavView;
use super::orders::OrderView;
use crate::db::{CustomerRepository, OrderRepository};
use crate::error::AppError;
use crate::filters;
use crate::middleware::{Flashes, Identity, RequireUser, push_flash};
use crate::models::{CurrentUser, Customer, FlashLevel, FlashMessage, OrderSummary, ProfileUpdate};
use crate::state::AppState;

/// Picture extensions accepted on upload.
const ALLOWED_PICTURE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

/// URL prefix the media directory is served under.
pub const MEDIA_URL: &str = "/media";

async fn own_profile(state: &AppState, user: &CurrentUser) -> Result<Customer, AppError> {
    CustomerRepository::new(state.pool())
        .get_by_user(user.id)
        .await?
        .ok_or_else(|| {
            tracing::warn!(user_id = %user.id, "Customer has no profile");
            AppError::NotFound("customer profile".to_string())
        })
}

// =============================================================================
// User page
// =============================================================================

#[derive(Template, WebTemplate)]
#[template(path = "user.html")]
pub struct UserTemplate {
    pub nav: NavView,
    pub orders: Vec<OrderView>,
    pub summary: OrderSummary,
}

/// The caller's own orders with counts.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn home(
    Identity(identity): Identity,
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let customer = own_profile(&state, &user).await?;
    let orders = OrderRepository::new(state.pool())
        .list_for_customer(customer.id)
        .await?;

    Ok(UserTemplate {
        nav: NavView::from(&identity),
        summary: OrderSummary::from_orders(&orders),
        orders: orders.iter().map(OrderView::from).collect(),
    })
}

// =============================================================================
// Account settings
// =============================================================================

#[derive(Template, WebTemplate)]
#[template(path = "account.html")]
pub struct AccountTemplate {
    pub nav: NavView,
    pub flashes: Vec<FlashMessage>,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub picture_url: Option<String>,
    pub error: Option<String>,
}

impl AccountTemplate {
    fn new(nav: NavView, flashes: Vec<FlashMessage>, customer: &Customer) -> Self {
        Self {
            nav,
            flashes,
            name: customer.name.clone().unwrap_or_default(),
            phone: customer.phone.clone().unwrap_or_default(),
            email: customer
                .email
                .as_ref()
                .map(|e| e.as_str().to_owned())
                .unwrap_or_default(),
            picture_url: customer
                .profile_pic
                .as_ref()
                .map(|name| format!("{MEDIA_URL}/{name}")),
            error: None,
        }
    }
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn account_page(
    Identity(identity): Identity,
    RequireUser(user): RequireUser,
    Flashes(flashes): Flashes,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let customer = own_profile(&state, &user).await?;
    Ok(AccountTemplate::new(NavView::from(&identity), flashes, &customer))
}

/// Submitted account form, before validation.
#[derive(Debug, Default)]
struct AccountForm {
    name: String,
    phone: String,
    email: String,
    picture: Option<(String, Vec<u8>)>,
}

impl AccountForm {
    async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let bad_request = |e: axum::extract::multipart::MultipartError| {
            AppError::BadRequest(format!("invalid form data: {e}"))
        };

        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await.map_err(bad_request)? {
            let field_name = field.name().unwrap_or_default().to_owned();
            match field_name.as_str() {
                "name" => form.name = field.text().await.map_err(bad_request)?,
                "phone" => form.phone = field.text().await.map_err(bad_request)?,
                "email" => form.email = field.text().await.map_err(bad_request)?,
                "profile_pic" => {
                    let file_name = field.file_name().unwrap_or_default().to_owned();
                    let data = field.bytes().await.map_err(bad_request)?;
                    if !data.is_empty() {
                        form.picture = Some((file_name, data.to_vec()));
                    }
                }
                _ => {}
            }
        }
        Ok(form)
    }
}

/// Lowercased extension of an uploaded file, if it is an accepted picture type.
fn picture_extension(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .filter(|ext| ALLOWED_PICTURE_EXTENSIONS.contains(&ext.as_str()))
}

fn optional(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_owned())
}

/// Save name, phone, email and optionally a new profile picture.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn update_account(
    Identity(identity): Identity,
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    session: Session,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let customer = own_profile(&state, &user).await?;
    let form = AccountForm::read(multipart).await?;

    let rerender = |error: String| {
        let mut page = AccountTemplate::new(NavView::from(&identity), Vec::new(), &customer);
        page.name.clone_from(&form.name);
        page.phone.clone_from(&form.phone);
        page.email.clone_from(&form.email);
        page.error = Some(error);
        page.into_response()
    };

    let email = match optional(&form.email).map(|e| Email::parse(&e)).transpose() {
        Ok(email) => email,
        Err(e) => return Ok(rerender(format!("Enter a valid email address ({e})"))),
    };

    let profile_pic = match &form.picture {
        None => None,
        Some((file_name, data)) => {
            let Some(ext) = picture_extension(file_name) else {
                return Ok(rerender(format!(
                    "Upload a picture ({})",
                    ALLOWED_PICTURE_EXTENSIONS.join(", ")
                )));
            };
            let stored = format!("{}.{ext}", Uuid::new_v4());
            let media_dir = &state.config().media_dir;
            tokio::fs::create_dir_all(media_dir)
                .await
                .map_err(|e| AppError::Internal(format!("creating media dir: {e}")))?;
            tokio::fs::write(media_dir.join(&stored), data)
                .await
                .map_err(|e| AppError::Internal(format!("saving profile picture: {e}")))?;
            Some(stored)
        }
    };

    let replaced_picture = profile_pic.is_some();
    let update = ProfileUpdate {
        name: optional(&form.name),
        phone: optional(&form.phone),
        email,
        profile_pic,
    };
    CustomerRepository::new(state.pool())
        .update_profile(customer.id, &update)
        .await?;

    if let Some(old) = customer.profile_pic.as_deref().filter(|_| replaced_picture) {
        remove_picture(&state.config().media_dir, old).await;
    }

    tracing::info!(customer_id = %customer.id, "Profile updated");
    push_flash(&session, FlashLevel::Success, "Your profile has been updated").await;

    Ok(Redirect::to(Route::Account.path()).into_response())
}

/// Delete a picture that is no longer referenced. Failures are logged only;
/// names that are not a bare file name are left alone.
async fn remove_picture(media_dir: &Path, file_name: &str) {
    if Path::new(file_name).file_name().and_then(|n| n.to_str()) != Some(file_name) {
        tracing::warn!(file_name, "Refusing to delete picture outside the media dir");
        return;
    }
    if let Err(e) = tokio::fs::remove_file(media_dir.join(file_name)).await {
        tracing::warn!(file_name, error = %e, "Failed to delete replaced profile picture");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_picture_extension() {
        assert_eq!(picture_extension("me.PNG").as_deref(), Some("png"));
        assert_eq!(picture_extension("holiday.photo.jpeg").as_deref(), Some("jpeg"));
        assert_eq!(picture_extension("script.svg"), None);
        assert_eq!(picture_extension("noext"), None);
        assert_eq!(picture_extension(""), None);
    }

    #[test]
    fn test_optional_trims_blank_to_none() {
        assert_eq!(optional("  "), None);
        assert_eq!(optional(" 555-0100 ").as_deref(), Some("555-0100"));
    }

    #[tokio::test]
    async fn test_replaced_picture_is_deleted() {
        let dir = std::env::temp_dir().join(format!("crm-media-{}", Uuid::new_v4()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let old = dir.join("old.png");
        let kept = dir.join("new.png");
        tokio::fs::write(&old, b"old").await.unwrap();
        tokio::fs::write(&kept, b"new").await.unwrap();

        remove_picture(&dir, "old.png").await;
        assert!(!old.exists());
        assert!(kept.exists());

        // Already gone: logged, not fatal.
        remove_picture(&dir, "old.png").await;

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn test_picture_outside_media_dir_is_kept() {
        let root = std::env::temp_dir().join(format!("crm-media-{}", Uuid::new_v4()));
        let dir = root.join("media");
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let outside = root.join("secret.txt");
        tokio::fs::write(&outside, b"keep").await.unwrap();

        remove_picture(&dir, "../secret.txt").await;
        assert!(outside.exists());

        tokio::fs::remove_dir_all(&root).await.unwrap();
    }
}
