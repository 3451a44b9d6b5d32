//! Core types for the CRM.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod price;
pub mod role;
pub mod status;
pub mod username;

pub use email::{Email, EmailError};
pub use id::*;
pub use price::Price;
pub use role::{ADMIN_GROUP, CUSTOMER_GROUP, Role};
pub use status::*;
pub use username::{Username, UsernameError};
