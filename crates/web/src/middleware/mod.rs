//! HTTP middleware and extractors.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Session layer (tower-sessions with the in-memory store)
//!
//! Access checks are extractors rather than layers: handlers name the access
//! they need in their signature.

pub mod auth;

pub use auth::{AccessRejection, CurrentAccess, RequireAdminGeneral};
