//! HTTP API layer for unipoll.
//!
//! - **Endpoints**: auth, surveys, comments, reports, users
//! - **Extractors**: authenticated-user extraction from request extensions
//! - **Middleware**: bearer-token authentication
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

pub use endpoints::router;
pub use middleware::{AppState, auth_middleware};
