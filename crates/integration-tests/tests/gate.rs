//! Authorization gate tests through the full router.
//!
//! None of these need a database: every request is decided by the guard
//! chain, or reaches a handler that renders without touching the pool.
//! Requests that pass the chain into a database-backed handler come back
//! as a 500 from the unreachable pool, which still proves the handler ran.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;

use crm_core::Role;
use crm_integration_tests::{TestApp, TestResponse};
use crm_web::middleware::DENIED_MESSAGE;

fn assert_redirect(response: &TestResponse, to: &str) {
    assert_eq!(response.status, StatusCode::SEE_OTHER, "body: {}", response.body);
    assert_eq!(response.location.as_deref(), Some(to));
}

fn assert_denied(response: &TestResponse) {
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, DENIED_MESSAGE);
}

/// The request got past the guard chain.
fn assert_reached_handler(response: &TestResponse) {
    assert!(response.location.is_none(), "redirected to {:?}", response.location);
    assert_ne!(response.body, DENIED_MESSAGE);
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_customer_on_dashboard_goes_to_user_page() {
    let app = TestApp::without_database();
    let alice = app.login_as(1, "alice", Role::Customer).await;

    let response = app.get("/", Some(&alice)).await;

    assert_redirect(&response, "/user/");
    assert!(!response.body.contains("Last 5 orders"));
}

#[tokio::test]
async fn test_admin_on_dashboard_reaches_handler() {
    let app = TestApp::without_database();
    let bob = app.login_as(2, "bob", Role::Admin).await;

    let response = app.get("/", Some(&bob)).await;

    assert_reached_handler(&response);
}

#[tokio::test]
async fn test_groupless_user_is_denied_admin_pages() {
    let app = TestApp::without_database();
    let carol = app.login_as(3, "carol", Role::Unknown).await;

    for path in ["/orders/", "/all_customers/", "/customer/1/", "/create_order/1/"] {
        assert_denied(&app.get(path, Some(&carol)).await);
    }
}

#[tokio::test]
async fn test_authenticated_user_on_login_page_goes_to_dashboard() {
    let app = TestApp::without_database();
    let eve = app.login_as(5, "eve", Role::Customer).await;

    let response = app.get("/login/", Some(&eve)).await;

    assert_redirect(&response, "/");
    assert!(!response.body.contains("name=\"password\""));
}

// ============================================================================
// Guard A: unauthenticated only
// ============================================================================

#[tokio::test]
async fn test_guest_pages_render_for_anonymous_callers() {
    let app = TestApp::without_database();

    let login = app.get("/login/", None).await;
    assert_eq!(login.status, StatusCode::OK);
    assert!(login.body.contains("name=\"username\""));
    assert!(login.body.contains("name=\"password\""));

    let register = app.get("/register/", None).await;
    assert_eq!(register.status, StatusCode::OK);
    assert!(register.body.contains("name=\"password2\""));

    let reset = app.get("/reset_password/", None).await;
    assert_eq!(reset.status, StatusCode::OK);
    assert!(reset.body.contains("name=\"email\""));
}

#[tokio::test]
async fn test_guest_pages_redirect_any_logged_in_role() {
    let app = TestApp::without_database();

    for (id, role) in [(1, Role::Admin), (2, Role::Customer), (3, Role::Unknown)] {
        let cookie = app.login_as(id, "someone", role).await;
        for path in ["/login/", "/register/", "/reset_password/", "/reset_password_sent/"] {
            assert_redirect(&app.get(path, Some(&cookie)).await, "/");
        }
    }
}

#[tokio::test]
async fn test_guest_form_submission_redirects_logged_in_user() {
    let app = TestApp::without_database();
    let eve = app.login_as(5, "eve", Role::Customer).await;

    let response = app
        .post_form("/login/", Some(&eve), &[("username", "eve"), ("password", "x")])
        .await;

    assert_redirect(&response, "/");
}

#[tokio::test]
async fn test_login_page_keeps_local_next() {
    let app = TestApp::without_database();

    let response = app.get("/login/?next=%2Forders%2F", None).await;
    assert!(response.body.contains("name=\"next\""));
    assert!(response.body.contains("orders"));

    let offsite = app.get("/login/?next=https%3A%2F%2Fevil.example%2F", None).await;
    assert!(!offsite.body.contains("evil.example"));
}

// ============================================================================
// Login required
// ============================================================================

#[tokio::test]
async fn test_anonymous_caller_is_sent_to_login_with_next() {
    let app = TestApp::without_database();

    assert_redirect(&app.get("/", None).await, "/login/?next=%2F");
    assert_redirect(&app.get("/orders/", None).await, "/login/?next=%2Forders%2F");
    assert_redirect(&app.get("/products/", None).await, "/login/?next=%2Fproducts%2F");
    assert_redirect(&app.get("/account/", None).await, "/login/?next=%2Faccount%2F");
}

#[tokio::test]
async fn test_next_keeps_query_string() {
    let app = TestApp::without_database();

    let response = app.get("/customer/4/?status=Pending", None).await;

    assert_redirect(
        &response,
        "/login/?next=%2Fcustomer%2F4%2F%3Fstatus%3DPending",
    );
}

#[tokio::test]
async fn test_login_required_admits_every_role() {
    let app = TestApp::without_database();

    for (id, role) in [(1, Role::Admin), (2, Role::Customer), (3, Role::Unknown)] {
        let cookie = app.login_as(id, "someone", role).await;
        assert_reached_handler(&app.get("/products/", Some(&cookie)).await);
    }
}

// ============================================================================
// Guard B: allowed roles
// ============================================================================

#[tokio::test]
async fn test_customer_is_denied_staff_pages() {
    let app = TestApp::without_database();
    let alice = app.login_as(1, "alice", Role::Customer).await;

    for path in [
        "/orders/",
        "/all_customers/",
        "/customer/1/",
        "/create_order/1/",
        "/update_order/1/",
        "/delete_order/1/",
    ] {
        assert_denied(&app.get(path, Some(&alice)).await);
    }
    assert_denied(&app.post_form("/delete_order/1/", Some(&alice), &[]).await);
}

#[tokio::test]
async fn test_admin_is_denied_customer_pages() {
    let app = TestApp::without_database();
    let bob = app.login_as(2, "bob", Role::Admin).await;

    assert_denied(&app.get("/user/", Some(&bob)).await);
    assert_denied(&app.get("/account/", Some(&bob)).await);
}

#[tokio::test]
async fn test_allowed_role_reaches_handler() {
    let app = TestApp::without_database();
    let bob = app.login_as(2, "bob", Role::Admin).await;
    let alice = app.login_as(1, "alice", Role::Customer).await;

    assert_reached_handler(&app.get("/orders/", Some(&bob)).await);
    assert_reached_handler(&app.get("/user/", Some(&alice)).await);
}

// ============================================================================
// Guard C: admin only
// ============================================================================

#[tokio::test]
async fn test_dashboard_denies_unrecognised_role() {
    let app = TestApp::without_database();
    let carol = app.login_as(3, "carol", Role::Unknown).await;

    assert_denied(&app.get("/", Some(&carol)).await);
}

// ============================================================================
// Open pages, logout, ambient middleware
// ============================================================================

#[tokio::test]
async fn test_open_pages_render_for_everyone() {
    let app = TestApp::without_database();
    let alice = app.login_as(1, "alice", Role::Customer).await;

    for cookie in [None, Some(alice.as_str())] {
        for path in ["/about/", "/contact/"] {
            let response = app.get(path, cookie).await;
            assert_eq!(response.status, StatusCode::OK);
        }
    }

    let about = app.get("/about/", Some(&alice)).await;
    assert!(about.body.contains("Hello, alice"));
}

#[tokio::test]
async fn test_nav_matches_role() {
    let app = TestApp::without_database();
    let alice = app.login_as(1, "alice", Role::Customer).await;
    let bob = app.login_as(2, "bob", Role::Admin).await;

    let customer_page = app.get("/about/", Some(&alice)).await;
    assert!(customer_page.body.contains("href=\"/account/\""));
    assert!(!customer_page.body.contains("href=\"/orders/\""));

    let admin_page = app.get("/about/", Some(&bob)).await;
    assert!(admin_page.body.contains("href=\"/orders/\""));
    assert!(!admin_page.body.contains("href=\"/account/\""));
}

#[tokio::test]
async fn test_logout_ends_session() {
    let app = TestApp::without_database();
    let alice = app.login_as(1, "alice", Role::Customer).await;

    assert_redirect(&app.get("/logout/", Some(&alice)).await, "/login/");

    let login = app.get("/login/", Some(&alice)).await;
    assert_eq!(login.status, StatusCode::OK);
    assert!(login.body.contains("name=\"password\""));
}

#[tokio::test]
async fn test_register_password_mismatch_rerenders_form() {
    let app = TestApp::without_database();

    let response = app
        .post_form(
            "/register/",
            None,
            &[
                ("username", "dave"),
                ("email", "dave%40example.com"),
                ("password1", "correct-horse"),
                ("password2", "battery-staple"),
            ],
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("The two password fields didn"));
    assert!(response.body.contains("value=\"dave\""));
}

#[tokio::test]
async fn test_auth_form_posts_are_rate_limited() {
    let app = TestApp::without_database();
    let fields = [
        ("username", "dave"),
        ("password1", "correct-horse"),
        ("password2", "battery-staple"),
    ];

    let mut statuses = Vec::new();
    for _ in 0..8 {
        statuses.push(app.post_form("/register/", None, &fields).await.status);
    }

    assert_eq!(statuses[0], StatusCode::OK);
    assert!(statuses.contains(&StatusCode::TOO_MANY_REQUESTS));
}

#[tokio::test]
async fn test_security_headers_and_request_id() {
    let app = TestApp::without_database();

    let response = app.get("/health", None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, "ok");
    assert_eq!(
        response.headers.get("x-frame-options").unwrap(),
        "DENY"
    );
    assert_eq!(
        response.headers.get("x-content-type-options").unwrap(),
        "nosniff"
    );
    assert!(response.headers.contains_key("x-request-id"));
}

#[tokio::test]
async fn test_readiness_reports_unreachable_database() {
    let app = TestApp::without_database();

    let response = app.get("/health/ready", None).await;

    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
}
