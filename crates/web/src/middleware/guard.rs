//! Route authorization guards.
//!
//! Every protected route declares an ordered [`GuardChain`]. Before the page
//! handler runs, the chain is interpreted against the request's
//! [`IdentityContext`]: each [`Guard`] either lets the request continue or
//! rejects it with a redirect or the denial page, and the first rejection
//! ends evaluation. The handler runs only if every guard continues.
//!
//! The interpreter ([`GuardChain::evaluate`], [`GuardChain::run`]) is plain
//! synchronous code. [`enforce`] adapts it to an axum `route_layer`:
//!
//! ```rust,ignore
//! Router::new().route(
//!     "/orders/",
//!     get(orders::index).route_layer(middleware::from_fn_with_state(
//!         GuardChain::new([Guard::LoginRequired, Guard::AllowedRoles(vec![Role::Admin])]),
//!         guard::enforce,
//!     )),
//! )
//! ```

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crm_core::Role;

use super::auth::IdentityContext;
use crate::routes::Route;

/// Body of the denial page.
pub const DENIED_MESSAGE: &str = "Not authorized to view this page.";

/// A single access check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guard {
    /// Only anonymous callers continue; logged-in callers go to the dashboard.
    UnauthenticatedOnly,
    /// Anonymous callers go to the login page, remembering where they were headed.
    LoginRequired,
    /// Callers whose role is in the set continue; everyone else is denied.
    /// An empty set admits nobody.
    AllowedRoles(Vec<Role>),
    /// Admins continue, customers go to their own page, anyone else is denied.
    AdminOnly,
}

/// What the guard chain sees of a request.
#[derive(Debug, Clone, Copy)]
pub struct AccessRequest<'a> {
    pub identity: &'a IdentityContext,
    /// Path and query of the request, used as the post-login `next` target.
    pub path: &'a str,
}

/// Terminal outcome of a failed guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// 303 to a named route, optionally with a `next` query parameter.
    Redirect { to: Route, next: Option<String> },
    /// The fixed plain-text denial message, with status 200.
    Denied,
}

impl Rejection {
    const fn redirect(to: Route) -> Self {
        Self::Redirect { to, next: None }
    }

    /// The `Location` of a redirect rejection.
    #[must_use]
    pub fn location(&self) -> Option<String> {
        match self {
            Self::Redirect { to, next: None } => Some(to.path().to_owned()),
            Self::Redirect {
                to,
                next: Some(next),
            } => Some(format!("{}?next={}", to.path(), urlencoding::encode(next))),
            Self::Denied => None,
        }
    }
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        match self.location() {
            Some(location) => Redirect::to(&location).into_response(),
            None => DENIED_MESSAGE.into_response(),
        }
    }
}

impl Guard {
    /// Evaluate this guard alone.
    ///
    /// # Errors
    ///
    /// Returns the guard's [`Rejection`] when the request may not continue.
    pub fn check(&self, request: &AccessRequest<'_>) -> Result<(), Rejection> {
        let identity = request.identity;
        match self {
            Self::UnauthenticatedOnly => {
                if identity.is_authenticated() {
                    return Err(Rejection::redirect(Route::Dashboard));
                }
                Ok(())
            }
            Self::LoginRequired => {
                if identity.is_authenticated() {
                    return Ok(());
                }
                Err(Rejection::Redirect {
                    to: Route::Login,
                    next: Some(request.path.to_owned()),
                })
            }
            Self::AllowedRoles(allowed) => {
                if allowed.contains(&identity.role()) {
                    return Ok(());
                }
                tracing::debug!(
                    path = request.path,
                    role = %identity.role(),
                    "Role not allowed"
                );
                Err(Rejection::Denied)
            }
            Self::AdminOnly => match identity.role() {
                Role::Admin => Ok(()),
                Role::Customer => Err(Rejection::redirect(Route::User)),
                Role::Unknown => {
                    tracing::warn!(
                        path = request.path,
                        user = identity.user().map(|u| u.username.as_str()),
                        "Admin-only page requested without a recognised role"
                    );
                    Err(Rejection::Denied)
                }
            },
        }
    }
}

/// An ordered list of guards, outermost first. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct GuardChain(Arc<[Guard]>);

impl GuardChain {
    pub fn new(guards: impl IntoIterator<Item = Guard>) -> Self {
        Self(guards.into_iter().collect())
    }

    #[must_use]
    pub fn guards(&self) -> &[Guard] {
        &self.0
    }

    /// Run the guards in order, stopping at the first rejection.
    ///
    /// # Errors
    ///
    /// Returns the first failing guard's [`Rejection`].
    pub fn evaluate(&self, request: &AccessRequest<'_>) -> Result<(), Rejection> {
        self.0.iter().try_for_each(|guard| guard.check(request))
    }

    /// Evaluate the chain and call `handler` only if every guard continues.
    ///
    /// # Errors
    ///
    /// Returns the first failing guard's [`Rejection`]; `handler` is not called then.
    pub fn run<T>(
        &self,
        request: &AccessRequest<'_>,
        handler: impl FnOnce() -> T,
    ) -> Result<T, Rejection> {
        self.evaluate(request).map(|()| handler())
    }
}

impl<const N: usize> From<[Guard; N]> for GuardChain {
    fn from(guards: [Guard; N]) -> Self {
        Self::new(guards)
    }
}

/// Route-layer middleware applying a [`GuardChain`].
///
/// Requests that reach this layer without an [`IdentityContext`] are
/// evaluated as anonymous.
pub async fn enforce(State(chain): State<GuardChain>, request: Request, next: Next) -> Response {
    let identity = request
        .extensions()
        .get::<IdentityContext>()
        .cloned()
        .unwrap_or_default();
    let path = request
        .uri()
        .path_and_query()
        .map_or_else(|| request.uri().path().to_owned(), |pq| pq.as_str().to_owned());

    let access = AccessRequest {
        identity: &identity,
        path: &path,
    };

    match chain.run(&access, || next.run(request)) {
        Ok(response) => response.await,
        Err(rejection) => rejection.into_response(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::Cell;

    use axum::http::{StatusCode, header};
    use crm_core::UserId;

    use super::*;
    use crate::models::CurrentUser;

    const ALL_ROLES: [Role; 3] = [Role::Admin, Role::Customer, Role::Unknown];

    fn identity(username: &str, role: Role) -> IdentityContext {
        IdentityContext::authenticated(CurrentUser {
            id: UserId::new(1),
            username: username.to_string(),
            role,
        })
    }

    fn access<'a>(identity: &'a IdentityContext, path: &'a str) -> AccessRequest<'a> {
        AccessRequest { identity, path }
    }

    /// Every subset of the three roles.
    fn role_sets() -> Vec<Vec<Role>> {
        (0..8_u8)
            .map(|mask| {
                ALL_ROLES
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| mask & (1 << i) != 0)
                    .map(|(_, role)| *role)
                    .collect()
            })
            .collect()
    }

    fn calls_handler(chain: &GuardChain, identity: &IdentityContext) -> (bool, Option<Rejection>) {
        let called = Cell::new(false);
        let result = chain.run(&access(identity, "/page/"), || called.set(true));
        (called.get(), result.err())
    }

    #[test]
    fn test_unauthenticated_only_redirects_logged_in_callers() {
        let chain = GuardChain::from([Guard::UnauthenticatedOnly]);
        for role in ALL_ROLES {
            let (called, rejection) = calls_handler(&chain, &identity("eve", role));
            assert!(!called);
            assert_eq!(
                rejection,
                Some(Rejection::Redirect {
                    to: Route::Dashboard,
                    next: None
                })
            );
        }
    }

    #[test]
    fn test_unauthenticated_only_passes_handler_result_through() {
        let chain = GuardChain::from([Guard::UnauthenticatedOnly]);
        let anon = IdentityContext::anonymous();
        let input = String::from("register form");

        let output = chain.run(&access(&anon, "/register/"), || input.clone());
        assert_eq!(output, Ok(input));
    }

    #[test]
    fn test_login_required_remembers_path() {
        let chain = GuardChain::from([Guard::LoginRequired]);
        let anon = IdentityContext::anonymous();

        let rejection = chain
            .evaluate(&access(&anon, "/customer/4/?status=Pending"))
            .unwrap_err();
        assert_eq!(
            rejection.location().as_deref(),
            Some("/login/?next=%2Fcustomer%2F4%2F%3Fstatus%3DPending")
        );

        assert!(chain.evaluate(&access(&identity("carol", Role::Unknown), "/")).is_ok());
    }

    #[test]
    fn test_allowed_roles_admits_exactly_members() {
        for allowed in role_sets() {
            let chain = GuardChain::from([Guard::AllowedRoles(allowed.clone())]);
            for role in ALL_ROLES {
                let (called, rejection) = calls_handler(&chain, &identity("x", role));
                assert_eq!(called, allowed.contains(&role), "{allowed:?} / {role}");
                if !called {
                    assert_eq!(rejection, Some(Rejection::Denied));
                }
            }
        }
    }

    #[test]
    fn test_allowed_roles_empty_set_admits_nobody() {
        let chain = GuardChain::from([Guard::AllowedRoles(Vec::new())]);
        let (called, rejection) = calls_handler(&chain, &identity("bob", Role::Admin));
        assert!(!called);
        assert_eq!(rejection, Some(Rejection::Denied));
    }

    #[test]
    fn test_allowed_roles_denies_anonymous() {
        let chain = GuardChain::from([Guard::AllowedRoles(vec![Role::Admin, Role::Customer])]);
        let (called, rejection) = calls_handler(&chain, &IdentityContext::anonymous());
        assert!(!called);
        assert_eq!(rejection, Some(Rejection::Denied));
    }

    #[test]
    fn test_admin_only_dispatch() {
        let chain = GuardChain::from([Guard::AdminOnly]);

        let (called, rejection) = calls_handler(&chain, &identity("bob", Role::Admin));
        assert!(called);
        assert_eq!(rejection, None);

        let (called, rejection) = calls_handler(&chain, &identity("alice", Role::Customer));
        assert!(!called);
        assert_eq!(
            rejection,
            Some(Rejection::Redirect {
                to: Route::User,
                next: None
            })
        );
    }

    #[test]
    fn test_admin_only_denies_unrecognised_role() {
        let chain = GuardChain::from([Guard::AdminOnly]);
        for ctx in [identity("carol", Role::Unknown), IdentityContext::anonymous()] {
            let (called, rejection) = calls_handler(&chain, &ctx);
            assert!(!called);
            assert_eq!(rejection, Some(Rejection::Denied));
        }
    }

    #[test]
    fn test_chain_stops_at_first_rejection() {
        // LoginRequired rejects first, so AdminOnly's denial is never produced.
        let chain = GuardChain::from([Guard::LoginRequired, Guard::AdminOnly]);
        let rejection = chain
            .evaluate(&access(&IdentityContext::anonymous(), "/"))
            .unwrap_err();
        assert_eq!(
            rejection,
            Rejection::Redirect {
                to: Route::Login,
                next: Some("/".to_string())
            }
        );

        let chain = GuardChain::from([
            Guard::AllowedRoles(Vec::new()),
            Guard::UnauthenticatedOnly,
        ]);
        let rejection = chain
            .evaluate(&access(&identity("bob", Role::Admin), "/"))
            .unwrap_err();
        assert_eq!(rejection, Rejection::Denied);
    }

    #[test]
    fn test_empty_chain_always_continues() {
        let chain = GuardChain::default();
        let (called, _) = calls_handler(&chain, &IdentityContext::anonymous());
        assert!(called);
    }

    #[test]
    fn test_scenario_customer_requests_dashboard() {
        let chain = GuardChain::from([Guard::LoginRequired, Guard::AdminOnly]);
        let (called, rejection) = calls_handler(&chain, &identity("alice", Role::Customer));
        assert!(!called);
        assert_eq!(rejection.unwrap().location().as_deref(), Some("/user/"));
    }

    #[test]
    fn test_scenario_admin_requests_dashboard() {
        let chain = GuardChain::from([Guard::LoginRequired, Guard::AdminOnly]);
        let bob = identity("bob", Role::Admin);
        let rendered = chain.run(&access(&bob, "/"), || "dashboard");
        assert_eq!(rendered, Ok("dashboard"));
    }

    #[test]
    fn test_scenario_groupless_user_on_admin_page() {
        let chain = GuardChain::from([Guard::LoginRequired, Guard::AllowedRoles(vec![Role::Admin])]);
        let (called, rejection) = calls_handler(&chain, &identity("carol", Role::Unknown));
        assert!(!called);
        assert_eq!(rejection, Some(Rejection::Denied));
    }

    #[test]
    fn test_scenario_logged_in_user_requests_login() {
        let chain = GuardChain::from([Guard::UnauthenticatedOnly]);
        let (called, rejection) = calls_handler(&chain, &identity("eve", Role::Customer));
        assert!(!called);
        assert_eq!(rejection.unwrap().location().as_deref(), Some("/"));
    }

    #[tokio::test]
    async fn test_denied_response_is_fixed_text() {
        let response = Rejection::Denied.into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], DENIED_MESSAGE.as_bytes());
    }

    #[test]
    fn test_redirect_response_is_see_other() {
        let response = Rejection::Redirect {
            to: Route::User,
            next: None,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/user/");
    }
}
