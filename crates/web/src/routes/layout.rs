//! Data every page layout needs.

use crate::middleware::IdentityContext;

/// Navigation bar state for `base.html`.
#[derive(Debug, Clone, Default)]
pub struct NavView {
    pub username: Option<String>,
    pub is_admin: bool,
    pub is_customer: bool,
}

impl From<&IdentityContext> for NavView {
    fn from(identity: &IdentityContext) -> Self {
        let role = identity.role();
        Self {
            username: identity.user().map(|u| u.username.clone()),
            is_admin: role == crm_core::Role::Admin,
            is_customer: role == crm_core::Role::Customer,
        }
    }
}
