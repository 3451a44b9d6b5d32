//! Product catalogue domain types.

use chrono::{DateTime, Utc};

use crm_core::{Price, ProductCategory, ProductId, TagId};

/// A label attached to products and orders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
}

/// A product that can be ordered.
#[derive(Debug, Clone)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    pub category: ProductCategory,
    pub description: Option<String>,
    pub tags: Vec<Tag>,
    pub created_at: DateTime<Utc>,
}
