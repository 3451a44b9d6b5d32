//! Customer list and customer detail with the order filter.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use tracing::instrument;

use crm_core::{CustomerId, OrderStatus};

use super::layout::NavView;
use super::orders::{OrderView, ProductOption};
use super::{create_order_path, customer_path};
use crate::db::{CustomerRepository, OrderRepository, ProductRepository};
use crate::error::AppError;
use crate::filters;
use crate::middleware::Identity;
use crate::models::{Customer, OrderFilter, OrderFilterQuery};
use crate::state::AppState;

/// Customer row for tables and the detail header.
#[derive(Debug, Clone)]
pub struct CustomerView {
    pub id: CustomerId,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub href: String,
    pub create_order_href: String,
}

impl From<&Customer> for CustomerView {
    fn from(customer: &Customer) -> Self {
        Self {
            id: customer.id,
            name: customer.display_name().to_owned(),
            phone: customer.phone.clone().unwrap_or_default(),
            email: customer
                .email
                .as_ref()
                .map(|e| e.as_str().to_owned())
                .unwrap_or_default(),
            created_at: customer.created_at,
            href: customer_path(customer.id),
            create_order_href: create_order_path(customer.id),
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "customers/index.html")]
pub struct CustomersTemplate {
    pub nav: NavView,
    pub customers: Vec<CustomerView>,
}

#[instrument(skip_all)]
pub async fn index(
    Identity(identity): Identity,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let customers = CustomerRepository::new(state.pool()).list().await?;

    Ok(CustomersTemplate {
        nav: NavView::from(&identity),
        customers: customers.iter().map(CustomerView::from).collect(),
    })
}

/// Current filter values, echoed back into the filter form.
#[derive(Debug, Clone, Default)]
pub struct FilterView {
    pub product: String,
    pub status: String,
    pub start_date: String,
    pub end_date: String,
    pub note: String,
    pub active: bool,
}

impl From<&OrderFilter> for FilterView {
    fn from(filter: &OrderFilter) -> Self {
        Self {
            product: filter.product.map(|p| p.to_string()).unwrap_or_default(),
            status: filter
                .status
                .map(|s| s.as_str().to_owned())
                .unwrap_or_default(),
            start_date: filter.start_date.map(|d| d.to_string()).unwrap_or_default(),
            end_date: filter.end_date.map(|d| d.to_string()).unwrap_or_default(),
            note: filter.note.clone().unwrap_or_default(),
            active: !filter.is_empty(),
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "customers/show.html")]
pub struct CustomerTemplate {
    pub nav: NavView,
    pub customer: CustomerView,
    /// All orders of the customer, before filtering.
    pub order_count: usize,
    pub orders: Vec<OrderView>,
    pub filter: FilterView,
    pub products: Vec<ProductOption>,
    pub statuses: [OrderStatus; 3],
}

/// One customer with its orders, narrowed by the filter in the query string.
#[instrument(skip(identity, state))]
pub async fn show(
    Identity(identity): Identity,
    State(state): State<AppState>,
    Path(customer_id): Path<CustomerId>,
    Query(query): Query<OrderFilterQuery>,
) -> Result<impl IntoResponse, AppError> {
    let customer = CustomerRepository::new(state.pool())
        .get(customer_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("customer {customer_id}")))?;

    let orders = OrderRepository::new(state.pool())
        .list_for_customer(customer.id)
        .await?;
    let products = ProductRepository::new(state.pool()).list().await?;
    let filter = OrderFilter::from_query(&query);

    Ok(CustomerTemplate {
        nav: NavView::from(&identity),
        customer: CustomerView::from(&customer),
        order_count: orders.len(),
        orders: orders
            .iter()
            .filter(|o| filter.matches(o))
            .map(OrderView::from)
            .collect(),
        filter: FilterView::from(&filter),
        products: products.iter().map(ProductOption::from).collect(),
        statuses: OrderStatus::ALL,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crm_core::{Email, ProductId};

    use super::*;

    #[test]
    fn test_customer_view_links() {
        let customer = Customer {
            id: CustomerId::new(3),
            user_id: None,
            name: None,
            phone: Some("555-0100".to_string()),
            email: Some(Email::parse("eve@example.com").unwrap()),
            profile_pic: None,
            created_at: Utc::now(),
        };
        let view = CustomerView::from(&customer);
        assert_eq!(view.name, "(unnamed)");
        assert_eq!(view.href, "/customer/3/");
        assert_eq!(view.create_order_href, "/create_order/3/");
        assert_eq!(view.email, "eve@example.com");
    }

    #[test]
    fn test_filter_view_echoes_values() {
        let filter = OrderFilter::from_query(&OrderFilterQuery {
            product: Some("2".to_string()),
            status: Some("Pending".to_string()),
            start_date: Some("2024-01-01".to_string()),
            end_date: Some(String::new()),
            note: Some("rush".to_string()),
        });
        let view = FilterView::from(&filter);
        assert_eq!(filter.product, Some(ProductId::new(2)));
        assert_eq!(view.product, "2");
        assert_eq!(view.status, "Pending");
        assert_eq!(view.start_date, "2024-01-01");
        assert_eq!(view.end_date, "");
        assert!(view.active);

        assert!(!FilterView::from(&OrderFilter::default()).active);
    }
}
