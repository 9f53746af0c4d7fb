//! HTTP middleware for the API.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (new hub per request, HTTP context)
//! 2. `TraceLayer` (request tracing)
//! 3. CORS (any origin, allows the `X-User-ID` header)
//! 4. User identity (`X-User-ID` resolved to a user)

pub mod auth;

pub use auth::{CurrentUser, RequireAdmin, USER_ID_HEADER, identity_middleware};
