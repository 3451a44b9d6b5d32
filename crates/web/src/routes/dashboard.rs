//! Staff dashboard.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tracing::instrument;

use super::customers::CustomerView;
use super::layout::NavView;
use super::orders::OrderView;
use crate::db::{CustomerRepository, OrderRepository};
use crate::error::AppError;
use crate::filters;
use crate::middleware::Identity;
use crate::models::OrderSummary;
use crate::state::AppState;

/// Number of orders shown in the dashboard's "last orders" table.
const RECENT_ORDERS: usize = 5;

#[derive(Template, WebTemplate)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub nav: NavView,
    pub recent_orders: Vec<OrderView>,
    pub customers: Vec<CustomerView>,
    pub summary: OrderSummary,
}

/// Order counts, the latest orders and every customer.
#[instrument(skip_all)]
pub async fn home(
    Identity(identity): Identity,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let orders = OrderRepository::new(state.pool()).list().await?;
    let customers = CustomerRepository::new(state.pool()).list().await?;

    Ok(DashboardTemplate {
        nav: NavView::from(&identity),
        summary: OrderSummary::from_orders(&orders),
        recent_orders: orders.iter().take(RECENT_ORDERS).map(OrderView::from).collect(),
        customers: customers.iter().map(CustomerView::from).collect(),
    })
}
