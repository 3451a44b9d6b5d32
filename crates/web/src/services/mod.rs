//! Business logic services.
//!
//! - `auth` - Registration, login and role assignment
//! - `provisioning` - Customer group and profile for new identities
//! - `password_reset` - Reset tokens and the emailed link
//! - `email` - SMTP delivery

pub mod auth;
pub mod email;
pub mod password_reset;
pub mod provisioning;
