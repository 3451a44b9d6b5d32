//! Static pages.

use askama::Template;
use askama_web::WebTemplate;
use axum::response::IntoResponse;

use super::layout::NavView;
use crate::filters;
use crate::middleware::Identity;

#[derive(Template, WebTemplate)]
#[template(path = "pages/about.html")]
pub struct AboutTemplate {
    pub nav: NavView,
}

#[derive(Template, WebTemplate)]
#[template(path = "pages/contact.html")]
pub struct ContactTemplate {
    pub nav: NavView,
}

pub async fn about(Identity(identity): Identity) -> impl IntoResponse {
    AboutTemplate {
        nav: NavView::from(&identity),
    }
}

pub async fn contact(Identity(identity): Identity) -> impl IntoResponse {
    ContactTemplate {
        nav: NavView::from(&identity),
    }
}
