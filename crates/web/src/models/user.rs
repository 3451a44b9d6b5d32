//! Identity domain type.

use chrono::{DateTime, Utc};

use crm_core::{Email, UserId, Username};

/// A registered identity.
///
/// The password hash is deliberately not part of this type; it is only read
/// by the repository method used for login.
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub username: Username,
    pub email: Option<Email>,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
