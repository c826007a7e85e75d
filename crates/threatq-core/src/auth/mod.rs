//! Authentication module for caching ThreatQ bearer tokens.
//!
//! This module provides:
//! - `SessionManager`: In-memory token cache keyed by credential pair
//! - `CredentialPair`: The (username, password) cache key
//!
//! Sessions live only for the lifetime of the process. Tokens are never
//! expired locally; a 401 from the server is the only staleness signal.

pub mod session;

pub use session::{CredentialPair, SessionEntry, SessionManager};
