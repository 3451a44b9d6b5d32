//! Product catalogue repository.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};

use crm_core::{Price, ProductCategory, ProductId, TagId};

use super::RepositoryError;
use crate::models::{Product, Tag};

#[derive(FromRow)]
struct ProductRow {
    id: ProductId,
    name: String,
    price: Decimal,
    category: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
}

impl ProductRow {
    fn into_product(self, tags: Vec<Tag>) -> Result<Product, RepositoryError> {
        let price = Price::new(self.price).ok_or_else(|| {
            RepositoryError::DataCorruption(format!("negative price on product {}", self.id))
        })?;
        let category = self
            .category
            .parse::<ProductCategory>()
            .map_err(RepositoryError::DataCorruption)?;

        Ok(Product {
            id: self.id,
            name: self.name,
            price,
            category,
            description: self.description,
            tags,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct TagLinkRow {
    owner_id: i32,
    id: TagId,
    name: String,
}

/// Group `(owner, tag)` link rows by owner id.
fn group_tags(rows: Vec<TagLinkRow>) -> HashMap<i32, Vec<Tag>> {
    let mut by_owner: HashMap<i32, Vec<Tag>> = HashMap::new();
    for row in rows {
        by_owner.entry(row.owner_id).or_default().push(Tag {
            id: row.id,
            name: row.name,
        });
    }
    by_owner
}

/// Load tags for many owners through a link table in one query.
///
/// `link_table` and `owner_column` are compile-time constants, never user input.
pub(super) async fn load_tags(
    pool: &PgPool,
    link_table: &str,
    owner_column: &str,
    owner_ids: &[i32],
) -> Result<HashMap<i32, Vec<Tag>>, RepositoryError> {
    if owner_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let sql = format!(
        "SELECT l.{owner_column} AS owner_id, t.id, t.name
         FROM {link_table} l
         JOIN crm.tag t ON t.id = l.tag_id
         WHERE l.{owner_column} = ANY($1)
         ORDER BY t.name"
    );
    let rows = sqlx::query_as::<_, TagLinkRow>(&sql)
        .bind(owner_ids)
        .fetch_all(pool)
        .await?;

    Ok(group_tags(rows))
}

const PRODUCT_COLUMNS: &str = "id, name, price, category, description, created_at";

/// Repository for products.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All products with their tags, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored category or price is invalid.
    pub async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM crm.product ORDER BY name, id");
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .fetch_all(self.pool)
            .await?;

        let ids: Vec<i32> = rows.iter().map(|r| r.id.as_i32()).collect();
        let mut tags = load_tags(self.pool, "crm.product_tag", "product_id", &ids).await?;

        rows.into_iter()
            .map(|row| {
                let product_tags = tags.remove(&row.id.as_i32()).unwrap_or_default();
                row.into_product(product_tags)
            })
            .collect()
    }

    /// Whether a product exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn exists(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM crm.product WHERE id = $1)")
                .bind(id)
                .fetch_one(self.pool)
                .await?;
        Ok(exists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_tags_by_owner() {
        let rows = vec![
            TagLinkRow {
                owner_id: 1,
                id: TagId::new(10),
                name: "Kitchen".to_string(),
            },
            TagLinkRow {
                owner_id: 2,
                id: TagId::new(11),
                name: "Sports".to_string(),
            },
            TagLinkRow {
                owner_id: 1,
                id: TagId::new(11),
                name: "Sports".to_string(),
            },
        ];

        let grouped = group_tags(rows);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[&1].len(), 2);
        assert_eq!(grouped[&2][0].name, "Sports");
    }
}
