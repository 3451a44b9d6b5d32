//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! Path                              Guards
//! GET       /                       LoginRequired, AdminOnly
//! GET       /about/                 -
//! GET       /contact/               -
//! GET       /products/              LoginRequired
//! GET       /orders/                LoginRequired, AllowedRoles{admin}
//! GET       /all_customers/         LoginRequired, AllowedRoles{admin}
//! GET       /customer/{id}/         LoginRequired, AllowedRoles{admin}
//! GET|POST  /create_order/{id}/     LoginRequired, AllowedRoles{admin}
//! GET|POST  /update_order/{id}/     LoginRequired, AllowedRoles{admin}
//! GET|POST  /delete_order/{id}/     LoginRequired, AllowedRoles{admin}
//! GET       /user/                  LoginRequired, AllowedRoles{customer}
//! GET|POST  /account/               LoginRequired, AllowedRoles{customer}
//! GET|POST  /register/              UnauthenticatedOnly (POST rate limited)
//! GET|POST  /login/                 UnauthenticatedOnly (POST rate limited)
//! GET       /logout/                -
//!
//! # Password reset
//! GET|POST  /reset_password/              UnauthenticatedOnly (POST rate limited)
//! GET       /reset_password_sent/         UnauthenticatedOnly
//! GET|POST  /reset/{uid}/{token}/         UnauthenticatedOnly (POST rate limited)
//! GET       /reset_password_complete/     UnauthenticatedOnly
//! ```

pub mod auth;
pub mod customers;
pub mod dashboard;
pub mod health;
pub mod layout;
pub mod orders;
pub mod pages;
pub mod password_reset;
pub mod products;
pub mod user;

use axum::{
    Router, middleware,
    routing::{MethodRouter, get, post},
};

use crm_core::{CustomerId, OrderId, Role, UserId};

use crate::middleware::guard::{self, Guard, GuardChain};
use crate::middleware::auth_rate_limiter;
use crate::state::AppState;

/// Named routes without path parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Dashboard,
    About,
    Contact,
    Products,
    Orders,
    AllCustomers,
    User,
    Account,
    Register,
    Login,
    Logout,
    ResetPassword,
    ResetPasswordSent,
    ResetPasswordComplete,
}

impl Route {
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Dashboard => "/",
            Self::About => "/about/",
            Self::Contact => "/contact/",
            Self::Products => "/products/",
            Self::Orders => "/orders/",
            Self::AllCustomers => "/all_customers/",
            Self::User => "/user/",
            Self::Account => "/account/",
            Self::Register => "/register/",
            Self::Login => "/login/",
            Self::Logout => "/logout/",
            Self::ResetPassword => "/reset_password/",
            Self::ResetPasswordSent => "/reset_password_sent/",
            Self::ResetPasswordComplete => "/reset_password_complete/",
        }
    }
}

#[must_use]
pub fn customer_path(id: CustomerId) -> String {
    format!("/customer/{id}/")
}

#[must_use]
pub fn create_order_path(customer_id: CustomerId) -> String {
    format!("/create_order/{customer_id}/")
}

#[must_use]
pub fn update_order_path(id: OrderId) -> String {
    format!("/update_order/{id}/")
}

#[must_use]
pub fn delete_order_path(id: OrderId) -> String {
    format!("/delete_order/{id}/")
}

/// Path of the emailed password reset link.
#[must_use]
pub fn password_reset_confirm_path(uid: UserId, token: &str) -> String {
    format!("/reset/{uid}/{}/", urlencoding::encode(token))
}

fn guest_only() -> GuardChain {
    GuardChain::from([Guard::UnauthenticatedOnly])
}

fn login_required() -> GuardChain {
    GuardChain::from([Guard::LoginRequired])
}

fn admin_dashboard() -> GuardChain {
    GuardChain::from([Guard::LoginRequired, Guard::AdminOnly])
}

fn roles(allowed: &[Role]) -> GuardChain {
    GuardChain::from([Guard::LoginRequired, Guard::AllowedRoles(allowed.to_vec())])
}

/// Put a route behind a guard chain.
fn guarded(route: MethodRouter<AppState>, chain: GuardChain) -> MethodRouter<AppState> {
    route.route_layer(middleware::from_fn_with_state(chain, guard::enforce))
}

/// GET page with a rate-limited POST handler.
fn form<G, GT, P, PT>(page: G, submit: P) -> MethodRouter<AppState>
where
    G: axum::handler::Handler<GT, AppState>,
    P: axum::handler::Handler<PT, AppState>,
    GT: 'static,
    PT: 'static,
{
    get(page).merge(post(submit).layer(auth_rate_limiter()))
}

/// Create all routes.
pub fn routes() -> Router<AppState> {
    let admin = || roles(&[Role::Admin]);
    let customer = || roles(&[Role::Customer]);

    Router::new()
        .route("/", guarded(get(dashboard::home), admin_dashboard()))
        .route("/about/", get(pages::about))
        .route("/contact/", get(pages::contact))
        .route("/products/", guarded(get(products::index), login_required()))
        // Staff
        .route("/orders/", guarded(get(orders::index), admin()))
        .route("/all_customers/", guarded(get(customers::index), admin()))
        .route("/customer/{id}/", guarded(get(customers::show), admin()))
        .route(
            "/create_order/{id}/",
            guarded(get(orders::create_page).post(orders::create), admin()),
        )
        .route(
            "/update_order/{id}/",
            guarded(get(orders::update_page).post(orders::update), admin()),
        )
        .route(
            "/delete_order/{id}/",
            guarded(get(orders::delete_page).post(orders::delete), admin()),
        )
        // Customers
        .route("/user/", guarded(get(user::home), customer()))
        .route(
            "/account/",
            guarded(get(user::account_page).post(user::update_account), customer()),
        )
        // Auth
        .route(
            "/register/",
            guarded(form(auth::register_page, auth::register), guest_only()),
        )
        .route(
            "/login/",
            guarded(form(auth::login_page, auth::login), guest_only()),
        )
        .route("/logout/", get(auth::logout))
        // Password reset
        .route(
            "/reset_password/",
            guarded(
                form(password_reset::request_page, password_reset::request),
                guest_only(),
            ),
        )
        .route(
            "/reset_password_sent/",
            guarded(get(password_reset::sent), guest_only()),
        )
        .route(
            "/reset/{uid}/{token}/",
            guarded(
                form(password_reset::confirm_page, password_reset::confirm),
                guest_only(),
            ),
        )
        .route(
            "/reset_password_complete/",
            guarded(get(password_reset::complete), guest_only()),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameterised_paths() {
        assert_eq!(customer_path(CustomerId::new(4)), "/customer/4/");
        assert_eq!(create_order_path(CustomerId::new(4)), "/create_order/4/");
        assert_eq!(update_order_path(OrderId::new(9)), "/update_order/9/");
        assert_eq!(delete_order_path(OrderId::new(9)), "/delete_order/9/");
        assert_eq!(
            password_reset_confirm_path(UserId::new(2), "ab12"),
            "/reset/2/ab12/"
        );
    }

    #[test]
    fn test_named_paths_are_slash_terminated() {
        for route in [
            Route::Dashboard,
            Route::About,
            Route::Contact,
            Route::Products,
            Route::Orders,
            Route::AllCustomers,
            Route::User,
            Route::Account,
            Route::Register,
            Route::Login,
            Route::Logout,
            Route::ResetPassword,
            Route::ResetPasswordSent,
            Route::ResetPasswordComplete,
        ] {
            assert!(route.path().starts_with('/'));
            assert!(route.path().ends_with('/'));
        }
    }

    #[test]
    fn test_dashboard_chain() {
        assert_eq!(
            admin_dashboard().guards(),
            &[Guard::LoginRequired, Guard::AdminOnly]
        );
        assert_eq!(
            roles(&[Role::Customer]).guards(),
            &[Guard::LoginRequired, Guard::AllowedRoles(vec![Role::Customer])]
        );
    }
}
