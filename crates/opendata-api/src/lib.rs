//! Open Data API — HTTP service.
//!
//! Exposes the authentication endpoints, the cached data-file endpoints
//! and the health endpoints over axum, and wires the event dispatcher
//! into the request path: route handlers publish authentication events,
//! a background pump dispatches them.

pub mod cache;
pub mod config;
pub mod error;
pub mod extract;
pub mod quota;
pub mod routes;
pub mod state;
