//! Domain models for the CRM.
//!
//! These are validated domain types, separate from the database row types in
//! [`crate::db`] and from the view types handed to templates.

pub mod customer;
pub mod order;
pub mod product;
pub mod session;
pub mod user;

pub use customer::{Customer, ProfileUpdate};
pub use order::{NewOrder, Order, OrderFilter, OrderFilterQuery, OrderSummary, OrderUpdate};
pub use product::{Product, Tag};
pub use session::{CurrentUser, FlashLevel, FlashMessage, keys as session_keys};
pub use user::User;
