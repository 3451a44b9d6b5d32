//! Customer profile domain types.

use chrono::{DateTime, Utc};

use crm_core::{CustomerId, Email, UserId};

/// A customer profile.
///
/// Profiles created at registration are linked to an identity; `user_id`
/// is `None` only for customers entered directly into the database.
#[derive(Debug, Clone)]
pub struct Customer {
    pub id: CustomerId,
    pub user_id: Option<UserId>,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<Email>,
    pub profile_pic: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Customer {
    /// Name to show in listings.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("(unnamed)")
    }
}

/// Fields a customer may change from the account settings page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<Email>,
    /// New stored picture file name; `None` keeps the current picture.
    pub profile_pic: Option<String>,
}
