//! CRM Core - Shared types library.
//!
//! This crate provides the domain types used across the CRM components:
//! - `web` - The customer/staff web application
//! - `cli` - Command-line tools for migrations and user management
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP. With the `postgres` feature the ID and email newtypes gain
//! `sqlx` encode/decode support.
//!
//! # Modules
//!
//! - [`types`] - Type-safe IDs, roles, order statuses, prices, usernames and emails

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
