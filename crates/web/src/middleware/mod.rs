//! HTTP middleware stack.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request span)
//! 3. Request ID (add unique ID to each request)
//! 4. Security headers
//! 5. Session layer (tower-sessions with `PostgreSQL` store)
//! 6. Identity (load [`IdentityContext`] from the session)
//! 7. Per-route: rate limiting on auth forms, then the route's [`GuardChain`]

pub mod auth;
pub mod flash;
pub mod guard;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{
    Identity, IdentityContext, RequireUser, clear_current_user, identity_middleware,
    set_current_user,
};
pub use flash::{Flashes, push_flash};
pub use guard::{AccessRequest, DENIED_MESSAGE, Guard, GuardChain, Rejection, enforce};
pub use rate_limit::auth_rate_limiter;
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
pub use session::{SESSION_COOKIE_NAME, create_session_layer, session_layer_with_store};
