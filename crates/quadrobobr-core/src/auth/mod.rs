//! Authentication module for the admin session.
//!
//! This module provides:
//! - `SessionManager`: owner of the bearer token and admin profile
//! - `SessionStore`: persisted key-value storage with file, keychain and
//!   in-memory backends
//!
//! The token and profile are written together on login and cleared together
//! on logout. There is no client-side expiry; the server decides.

pub mod credentials;
pub mod session;
pub mod store;

pub use credentials::KeyringStore;
pub use session::{Identity, SessionManager, SessionState, IDENTITY_KEY, TOKEN_KEY};
pub use store::{FileStore, MemoryStore, SessionStore};
