//! Order pages: list, create, update, delete.

use std::collections::HashMap;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::instrument;

use crm_core::{CustomerId, OrderId, OrderStatus, ProductId};

use super::layout::NavView;
use super::{Route, customer_path, delete_order_path, update_order_path};
use crate::db::{CustomerRepository, OrderRepository, ProductRepository, RepositoryError};
use crate::error::{AppError, add_breadcrumb};
use crate::filters;
use crate::middleware::Identity;
use crate::models::{Customer, NewOrder, Order, OrderUpdate, Product};
use crate::state::AppState;

/// Empty rows on the create-order form.
pub const ORDER_FORM_ROWS: usize = 2;

/// Order row for tables.
#[derive(Debug, Clone)]
pub struct OrderView {
    pub id: OrderId,
    pub customer_name: String,
    pub customer_href: String,
    pub product_name: String,
    pub status: OrderStatus,
    pub note: String,
    pub tags: String,
    pub created_at: DateTime<Utc>,
    pub update_href: String,
    pub delete_href: String,
}

impl From<&Order> for OrderView {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id,
            customer_name: order.customer_name.clone().unwrap_or_default(),
            customer_href: customer_path(order.customer_id),
            product_name: order.product_name.clone(),
            status: order.status,
            note: order.note.clone().unwrap_or_default(),
            tags: order
                .tags
                .iter()
                .map(|t| t.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            created_at: order.created_at,
            update_href: update_order_path(order.id),
            delete_href: delete_order_path(order.id),
        }
    }
}

/// Product choice in a `<select>`.
#[derive(Debug, Clone)]
pub struct ProductOption {
    pub id: ProductId,
    pub name: String,
}

impl From<&Product> for ProductOption {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
        }
    }
}

// =============================================================================
// List
// =============================================================================

#[derive(Template, WebTemplate)]
#[template(path = "orders/index.html")]
pub struct OrdersTemplate {
    pub nav: NavView,
    pub orders: Vec<OrderView>,
}

#[instrument(skip_all)]
pub async fn index(
    Identity(identity): Identity,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let orders = OrderRepository::new(state.pool()).list().await?;

    Ok(OrdersTemplate {
        nav: NavView::from(&identity),
        orders: orders.iter().map(OrderView::from).collect(),
    })
}

// =============================================================================
// Create
// =============================================================================

/// One row of the create-order form as submitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderRowInput {
    pub product: String,
    pub status: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "orders/create.html")]
pub struct CreateOrderTemplate {
    pub nav: NavView,
    pub customer_name: String,
    pub action: String,
    pub rows: Vec<OrderRowInput>,
    pub products: Vec<ProductOption>,
    pub statuses: [OrderStatus; 3],
    pub error: Option<String>,
}

impl CreateOrderTemplate {
    fn new(
        nav: NavView,
        customer: &Customer,
        products: &[Product],
        rows: Vec<OrderRowInput>,
        error: Option<String>,
    ) -> Self {
        Self {
            nav,
            customer_name: customer.display_name().to_owned(),
            action: super::create_order_path(customer.id),
            rows,
            products: products.iter().map(ProductOption::from).collect(),
            statuses: OrderStatus::ALL,
            error,
        }
    }
}

/// Read `product_{i}` / `status_{i}` pairs for every form row.
fn rows_from_fields(fields: &HashMap<String, String>) -> Vec<OrderRowInput> {
    (0..ORDER_FORM_ROWS)
        .map(|i| OrderRowInput {
            product: fields
                .get(&format!("product_{i}"))
                .map(|v| v.trim().to_owned())
                .unwrap_or_default(),
            status: fields
                .get(&format!("status_{i}"))
                .map(|v| v.trim().to_owned())
                .unwrap_or_default(),
        })
        .collect()
}

/// Turn filled rows into new orders. Rows without a product are skipped.
///
/// A blank status defaults to `Pending`.
fn parse_rows(customer_id: CustomerId, rows: &[OrderRowInput]) -> Result<Vec<NewOrder>, String> {
    rows.iter()
        .enumerate()
        .filter(|(_, row)| !row.product.is_empty())
        .map(|(i, row)| {
            let product_id = row
                .product
                .parse::<ProductId>()
                .map_err(|_| format!("Row {}: select a valid product", i + 1))?;
            let status = if row.status.is_empty() {
                OrderStatus::default()
            } else {
                row.status
                    .parse::<OrderStatus>()
                    .map_err(|_| format!("Row {}: select a valid status", i + 1))?
            };
            Ok(NewOrder {
                customer_id,
                product_id,
                status,
                note: None,
            })
        })
        .collect()
}

async fn load_customer(state: &AppState, id: CustomerId) -> Result<Customer, AppError> {
    CustomerRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("customer {id}")))
}

#[instrument(skip(identity, state))]
pub async fn create_page(
    Identity(identity): Identity,
    State(state): State<AppState>,
    Path(customer_id): Path<CustomerId>,
) -> Result<impl IntoResponse, AppError> {
    let customer = load_customer(&state, customer_id).await?;
    let products = ProductRepository::new(state.pool()).list().await?;

    Ok(CreateOrderTemplate::new(
        NavView::from(&identity),
        &customer,
        &products,
        vec![OrderRowInput::default(); ORDER_FORM_ROWS],
        None,
    ))
}

/// Create one order per filled row, then go to the dashboard.
#[instrument(skip(identity, state, fields))]
pub async fn create(
    Identity(identity): Identity,
    State(state): State<AppState>,
    Path(customer_id): Path<CustomerId>,
    Form(fields): Form<HashMap<String, String>>,
) -> Result<Response, AppError> {
    let customer = load_customer(&state, customer_id).await?;
    let rows = rows_from_fields(&fields);

    let products = ProductRepository::new(state.pool());
    let mut result = parse_rows(customer.id, &rows);
    let mut missing = None;
    for order in result.as_deref().unwrap_or_default() {
        if !products.exists(order.product_id).await? {
            missing = Some(order.product_id);
            break;
        }
    }
    if let Some(product_id) = missing {
        result = Err(format!("Product {product_id} does not exist"));
    }

    let orders = match result {
        Ok(orders) => orders,
        Err(error) => {
            let products = products.list().await?;
            return Ok(CreateOrderTemplate::new(
                NavView::from(&identity),
                &customer,
                &products,
                rows,
                Some(error),
            )
            .into_response());
        }
    };

    let ids = OrderRepository::new(state.pool()).create_many(&orders).await?;
    let customer_id = customer.id.to_string();
    add_breadcrumb(
        "order",
        "Created orders",
        Some(&[("customer_id", customer_id.as_str())]),
    );
    tracing::info!(customer_id = %customer.id, count = ids.len(), "Orders created");

    Ok(Redirect::to(Route::Dashboard.path()).into_response())
}

// =============================================================================
// Update
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct UpdateOrderForm {
    pub product: String,
    pub status: String,
    #[serde(default)]
    pub note: String,
}

impl UpdateOrderForm {
    fn parse(&self) -> Result<OrderUpdate, String> {
        let product_id = self
            .product
            .trim()
            .parse::<ProductId>()
            .map_err(|_| "Select a valid product".to_string())?;
        let status = self
            .status
            .trim()
            .parse::<OrderStatus>()
            .map_err(|_| "Select a valid status".to_string())?;
        let note = self.note.trim();
        Ok(OrderUpdate {
            product_id,
            status,
            note: (!note.is_empty()).then(|| note.to_owned()),
        })
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "orders/update.html")]
pub struct UpdateOrderTemplate {
    pub nav: NavView,
    pub order: OrderView,
    pub selected_product: ProductId,
    pub selected_status: OrderStatus,
    pub note: String,
    pub products: Vec<ProductOption>,
    pub statuses: [OrderStatus; 3],
    pub error: Option<String>,
}

async fn load_order(state: &AppState, id: OrderId) -> Result<Order, AppError> {
    OrderRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {id}")))
}

#[instrument(skip(identity, state))]
pub async fn update_page(
    Identity(identity): Identity,
    State(state): State<AppState>,
    Path(order_id): Path<OrderId>,
) -> Result<impl IntoResponse, AppError> {
    let order = load_order(&state, order_id).await?;
    let products = ProductRepository::new(state.pool()).list().await?;

    Ok(UpdateOrderTemplate {
        nav: NavView::from(&identity),
        selected_product: order.product_id,
        selected_status: order.status,
        note: order.note.clone().unwrap_or_default(),
        order: OrderView::from(&order),
        products: products.iter().map(ProductOption::from).collect(),
        statuses: OrderStatus::ALL,
        error: None,
    })
}

#[instrument(skip(identity, state, form))]
pub async fn update(
    Identity(identity): Identity,
    State(state): State<AppState>,
    Path(order_id): Path<OrderId>,
    Form(form): Form<UpdateOrderForm>,
) -> Result<Response, AppError> {
    let order = load_order(&state, order_id).await?;
    let products = ProductRepository::new(state.pool());

    let update = match form.parse() {
        Ok(update) => update,
        Err(error) => {
            let products = products.list().await?;
            return Ok(UpdateOrderTemplate {
                nav: NavView::from(&identity),
                selected_product: order.product_id,
                selected_status: order.status,
                note: form.note.clone(),
                order: OrderView::from(&order),
                products: products.iter().map(ProductOption::from).collect(),
                statuses: OrderStatus::ALL,
                error: Some(error),
            }
            .into_response());
        }
    };
    if !products.exists(update.product_id).await? {
        return Err(AppError::BadRequest(format!(
            "product {} does not exist",
            update.product_id
        )));
    }

    OrderRepository::new(state.pool())
        .update(order.id, &update)
        .await?;
    let id = order.id.to_string();
    add_breadcrumb("order", "Updated order", Some(&[("order_id", id.as_str())]));

    Ok(Redirect::to(Route::Dashboard.path()).into_response())
}

// =============================================================================
// Delete
// =============================================================================

#[derive(Template, WebTemplate)]
#[template(path = "orders/delete.html")]
pub struct DeleteOrderTemplate {
    pub nav: NavView,
    pub order: OrderView,
}

#[instrument(skip(identity, state))]
pub async fn delete_page(
    Identity(identity): Identity,
    State(state): State<AppState>,
    Path(order_id): Path<OrderId>,
) -> Result<impl IntoResponse, AppError> {
    let order = load_order(&state, order_id).await?;

    Ok(DeleteOrderTemplate {
        nav: NavView::from(&identity),
        order: OrderView::from(&order),
    })
}

#[instrument(skip(state))]
pub async fn delete(
    State(state): State<AppState>,
    Path(order_id): Path<OrderId>,
) -> Result<Redirect, AppError> {
    match OrderRepository::new(state.pool()).delete(order_id).await {
        Ok(()) => {}
        Err(RepositoryError::NotFound) => {
            return Err(AppError::NotFound(format!("order {order_id}")));
        }
        Err(e) => return Err(e.into()),
    }
    let id = order_id.to_string();
    add_breadcrumb("order", "Deleted order", Some(&[("order_id", id.as_str())]));

    Ok(Redirect::to(Route::Dashboard.path()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_blank_rows_are_skipped() {
        let rows = rows_from_fields(&fields(&[
            ("product_0", "3"),
            ("status_0", "Delivered"),
            ("product_1", ""),
            ("status_1", "Pending"),
        ]));
        assert_eq!(rows.len(), ORDER_FORM_ROWS);

        let orders = parse_rows(CustomerId::new(7), &rows).unwrap();
        assert_eq!(
            orders,
            vec![NewOrder {
                customer_id: CustomerId::new(7),
                product_id: ProductId::new(3),
                status: OrderStatus::Delivered,
                note: None,
            }]
        );
    }

    #[test]
    fn test_two_filled_rows_make_two_orders() {
        let rows = rows_from_fields(&fields(&[
            ("product_0", "1"),
            ("status_0", "Pending"),
            ("product_1", "2"),
            ("status_1", "Out for delivery"),
        ]));
        let orders = parse_rows(CustomerId::new(1), &rows).unwrap();
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[1].status, OrderStatus::OutForDelivery);
    }

    #[test]
    fn test_blank_status_defaults_to_pending() {
        let rows = rows_from_fields(&fields(&[("product_0", "4")]));
        let orders = parse_rows(CustomerId::new(1), &rows).unwrap();
        assert_eq!(orders[0].status, OrderStatus::Pending);
    }

    #[test]
    fn test_bad_row_reports_its_number() {
        let rows = rows_from_fields(&fields(&[("product_0", "1"), ("product_1", "x")]));
        let err = parse_rows(CustomerId::new(1), &rows).unwrap_err();
        assert_eq!(err, "Row 2: select a valid product");
    }

    #[test]
    fn test_update_form_parse() {
        let form = UpdateOrderForm {
            product: "5".to_string(),
            status: "Delivered".to_string(),
            note: "  left at door ".to_string(),
        };
        let update = form.parse().unwrap();
        assert_eq!(update.product_id, ProductId::new(5));
        assert_eq!(update.status, OrderStatus::Delivered);
        assert_eq!(update.note.as_deref(), Some("left at door"));

        let blank_note = UpdateOrderForm {
            note: "   ".to_string(),
            ..form
        };
        assert_eq!(blank_note.parse().unwrap().note, None);

        let bad = UpdateOrderForm {
            product: "5".to_string(),
            status: "Shipped".to_string(),
            note: String::new(),
        };
        assert_eq!(bad.parse().unwrap_err(), "Select a valid status");
    }
}
