//! REST API client module for the Quadrobobr backend.
//!
//! This module provides the `ApiClient` used to sign in and the
//! `AuthorizedClient` through which every protected endpoint is called.
//!
//! The API uses bearer token authentication obtained from
//! `POST /api/auth/login`.

pub mod client;
pub mod error;

pub use client::{ApiClient, AuthorizedClient, LoginGrant};
pub use error::{ApiError, AuthError, INVALID_CREDENTIALS_MESSAGE};
