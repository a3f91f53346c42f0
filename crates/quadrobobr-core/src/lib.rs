//! Core library for the Quadrobobr admin console.
//!
//! Holds the session (bearer token plus admin profile), the REST client that
//! obtains and uses it, and the route guard that keeps protected views behind
//! a sign-in.

pub mod api;
pub mod auth;
pub mod config;
pub mod routes;

pub use api::{ApiClient, ApiError, AuthError, AuthorizedClient};
pub use auth::{Identity, SessionManager, SessionState};
pub use config::Config;
pub use routes::{Authenticated, Navigation, Route, RouteGuard, Section};
