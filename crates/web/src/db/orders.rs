//! Order repository.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use crm_core::{CustomerId, OrderId, OrderStatus, ProductId};

use super::RepositoryError;
use super::products::load_tags;
use crate::models::{NewOrder, Order, OrderUpdate};

#[derive(FromRow)]
struct OrderRow {
    id: OrderId,
    customer_id: CustomerId,
    customer_name: Option<String>,
    product_id: ProductId,
    product_name: String,
    status: String,
    note: Option<String>,
    created_at: DateTime<Utc>,
}

const ORDER_SELECT: &str = r#"
    SELECT o.id, o.customer_id, c.name AS customer_name,
           o.product_id, p.name AS product_name,
           o.status, o.note, o.created_at
    FROM crm."order" o
    JOIN crm.customer c ON c.id = o.customer_id
    JOIN crm.product p ON p.id = o.product_id
"#;

/// Repository for orders.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(&self) -> Result<Vec<Order>, RepositoryError> {
        let sql = format!("{ORDER_SELECT} ORDER BY o.created_at DESC, o.id DESC");
        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .fetch_all(self.pool)
            .await?;
        self.hydrate(rows).await
    }

    /// Orders of one customer, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_for_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<Order>, RepositoryError> {
        let sql = format!(
            "{ORDER_SELECT} WHERE o.customer_id = $1 ORDER BY o.created_at DESC, o.id DESC"
        );
        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(customer_id)
            .fetch_all(self.pool)
            .await?;
        self.hydrate(rows).await
    }

    /// Get one order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let sql = format!("{ORDER_SELECT} WHERE o.id = $1");
        let Some(row) = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
        else {
            return Ok(None);
        };
        Ok(self.hydrate(vec![row]).await?.pop())
    }

    /// Insert several orders atomically.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if an insert fails; nothing is saved then.
    pub async fn create_many(&self, orders: &[NewOrder]) -> Result<Vec<OrderId>, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let mut ids = Vec::with_capacity(orders.len());

        for order in orders {
            let id = sqlx::query_scalar::<_, OrderId>(
                r#"
                INSERT INTO crm."order" (customer_id, product_id, status, note)
                VALUES ($1, $2, $3, $4)
                RETURNING id
                "#,
            )
            .bind(order.customer_id)
            .bind(order.product_id)
            .bind(order.status.as_str())
            .bind(order.note.as_deref())
            .fetch_one(&mut *tx)
            .await?;
            ids.push(id);
        }

        tx.commit().await?;
        Ok(ids)
    }

    /// Save the editable fields of an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update(&self, id: OrderId, update: &OrderUpdate) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"UPDATE crm."order" SET product_id = $2, status = $3, note = $4 WHERE id = $1"#,
        )
        .bind(id)
        .bind(update.product_id)
        .bind(update.status.as_str())
        .bind(update.note.as_deref())
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Delete an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn delete(&self, id: OrderId) -> Result<(), RepositoryError> {
        let result = sqlx::query(r#"DELETE FROM crm."order" WHERE id = $1"#)
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn hydrate(&self, rows: Vec<OrderRow>) -> Result<Vec<Order>, RepositoryError> {
        let ids: Vec<i32> = rows.iter().map(|r| r.id.as_i32()).collect();
        let mut tags = load_tags(self.pool, "crm.order_tag", "order_id", &ids).await?;

        rows.into_iter()
            .map(|row| {
                let status = row
                    .status
                    .parse::<OrderStatus>()
                    .map_err(RepositoryError::DataCorruption)?;
                Ok(Order {
                    id: row.id,
                    customer_id: row.customer_id,
                    customer_name: row.customer_name,
                    product_id: row.product_id,
                    product_name: row.product_name,
                    status,
                    note: row.note,
                    tags: tags.remove(&row.id.as_i32()).unwrap_or_default(),
                    created_at: row.created_at,
                })
            })
            .collect()
    }
}
