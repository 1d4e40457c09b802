//! HTTP middleware stack for the API.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, transaction per route)
//! 2. `TraceLayer` (request span with method, uri, status, latency)
//! 3. Request ID (add unique ID to each request)
//! 4. CORS
//! 5. Session layer (OAuth handshake state only)
//! 6. Rate limiting on `/api/auth` (governor)
//!
//! Authentication is not a layer: handlers opt in with the [`RequireAuth`] or
//! [`OptionalAuth`] extractors.

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod session;

pub use auth::{OptionalAuth, RequireAuth, cleared_token_cookie, token_cookie};
pub use rate_limit::auth_rate_limiter;
pub use request_id::request_id_middleware;
pub use session::{OAUTH_STATE_KEY, create_session_layer};
