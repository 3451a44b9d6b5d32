//! Order domain types and the customer-page order filter.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

use crm_core::{CustomerId, OrderId, OrderStatus, ProductId};

use super::Tag;

/// An order, joined with the names needed to display it.
#[derive(Debug, Clone)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub customer_name: Option<String>,
    pub product_id: ProductId,
    pub product_name: String,
    pub status: OrderStatus,
    pub note: Option<String>,
    pub tags: Vec<Tag>,
    pub created_at: DateTime<Utc>,
}

/// Fields for a new order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub customer_id: CustomerId,
    pub product_id: ProductId,
    pub status: OrderStatus,
    pub note: Option<String>,
}

/// Editable fields of an existing order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderUpdate {
    pub product_id: ProductId,
    pub status: OrderStatus,
    pub note: Option<String>,
}

/// Total, delivered and pending counts for a list of orders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrderSummary {
    pub total: usize,
    pub delivered: usize,
    pub pending: usize,
}

impl OrderSummary {
    #[must_use]
    pub fn from_orders(orders: &[Order]) -> Self {
        let count = |status| orders.iter().filter(|o| o.status == status).count();
        Self {
            total: orders.len(),
            delivered: count(OrderStatus::Delivered),
            pending: count(OrderStatus::Pending),
        }
    }
}

/// Raw filter query string as submitted by the filter form.
///
/// Browsers submit every field, so unset inputs arrive as empty strings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderFilterQuery {
    pub product: Option<String>,
    pub status: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub note: Option<String>,
}

/// Order filter for the customer detail page.
///
/// Every criterion is optional; set criteria are combined with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderFilter {
    pub product: Option<ProductId>,
    pub status: Option<OrderStatus>,
    /// Inclusive, compared against the order's creation date.
    pub start_date: Option<NaiveDate>,
    /// Inclusive, compared against the order's creation date.
    pub end_date: Option<NaiveDate>,
    /// Case-insensitive substring of the note.
    pub note: Option<String>,
}

impl OrderFilter {
    /// Build a filter from the submitted query.
    ///
    /// Blank fields are ignored. A field that does not parse is also
    /// ignored rather than rejected, so a hand-edited URL still renders
    /// the page.
    #[must_use]
    pub fn from_query(query: &OrderFilterQuery) -> Self {
        fn field(value: Option<&String>) -> Option<&str> {
            value.map(|v| v.trim()).filter(|v| !v.is_empty())
        }

        Self {
            product: field(query.product.as_ref()).and_then(|v| v.parse().ok()),
            status: field(query.status.as_ref()).and_then(|v| v.parse().ok()),
            start_date: field(query.start_date.as_ref()).and_then(|v| v.parse().ok()),
            end_date: field(query.end_date.as_ref()).and_then(|v| v.parse().ok()),
            note: field(query.note.as_ref()).map(str::to_owned),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Whether an order satisfies every set criterion.
    #[must_use]
    pub fn matches(&self, order: &Order) -> bool {
        let created = order.created_at.date_naive();
        self.product.is_none_or(|p| p == order.product_id)
            && self.status.is_none_or(|s| s == order.status)
            && self.start_date.is_none_or(|d| created >= d)
            && self.end_date.is_none_or(|d| created <= d)
            && self.note.as_deref().is_none_or(|needle| {
                order
                    .note
                    .as_deref()
                    .is_some_and(|note| note.to_lowercase().contains(&needle.to_lowercase()))
            })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn order(status: OrderStatus, note: Option<&str>, day: u32) -> Order {
        Order {
            id: OrderId::new(1),
            customer_id: CustomerId::new(1),
            customer_name: Some("alice".to_string()),
            product_id: ProductId::new(7),
            product_name: "Ball".to_string(),
            status,
            note: note.map(str::to_owned),
            tags: Vec::new(),
            created_at: Utc.with_ymd_and_hms(2024, 3, day, 18, 30, 0).unwrap(),
        }
    }

    #[test]
    fn test_blank_query_is_empty_filter() {
        let query = OrderFilterQuery {
            product: Some(String::new()),
            status: Some(String::new()),
            start_date: Some("  ".to_string()),
            end_date: None,
            note: Some(String::new()),
        };
        assert!(OrderFilter::from_query(&query).is_empty());
    }

    #[test]
    fn test_query_parses_fields() {
        let query = OrderFilterQuery {
            product: Some("7".to_string()),
            status: Some("Out for delivery".to_string()),
            start_date: Some("2024-03-01".to_string()),
            end_date: Some("2024-03-31".to_string()),
            note: Some("fragile".to_string()),
        };
        let filter = OrderFilter::from_query(&query);
        assert_eq!(filter.product, Some(ProductId::new(7)));
        assert_eq!(filter.status, Some(OrderStatus::OutForDelivery));
        assert_eq!(filter.start_date, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(filter.note.as_deref(), Some("fragile"));
    }

    #[test]
    fn test_unparseable_fields_are_ignored() {
        let query = OrderFilterQuery {
            product: Some("abc".to_string()),
            status: Some("Lost".to_string()),
            start_date: Some("yesterday".to_string()),
            ..Default::default()
        };
        assert!(OrderFilter::from_query(&query).is_empty());
    }

    #[test]
    fn test_date_bounds_are_inclusive() {
        let o = order(OrderStatus::Pending, None, 15);
        let day = NaiveDate::from_ymd_opt(2024, 3, 15);
        let filter = OrderFilter {
            start_date: day,
            end_date: day,
            ..Default::default()
        };
        assert!(filter.matches(&o));

        let after = OrderFilter {
            start_date: NaiveDate::from_ymd_opt(2024, 3, 16),
            ..Default::default()
        };
        assert!(!after.matches(&o));
    }

    #[test]
    fn test_note_is_case_insensitive_contains() {
        let filter = OrderFilter {
            note: Some("FRAGILE".to_string()),
            ..Default::default()
        };
        assert!(filter.matches(&order(OrderStatus::Pending, Some("very fragile box"), 1)));
        assert!(!filter.matches(&order(OrderStatus::Pending, Some("sturdy"), 1)));
        assert!(!filter.matches(&order(OrderStatus::Pending, None, 1)));
    }

    #[test]
    fn test_summary_counts() {
        let orders = vec![
            order(OrderStatus::Pending, None, 1),
            order(OrderStatus::Delivered, None, 2),
            order(OrderStatus::Delivered, None, 3),
            order(OrderStatus::OutForDelivery, None, 4),
        ];
        assert_eq!(
            OrderSummary::from_orders(&orders),
            OrderSummary {
                total: 4,
                delivered: 2,
                pending: 1
            }
        );
    }
}
