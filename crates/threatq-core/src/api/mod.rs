//! REST API module for ThreatQ.
//!
//! This module provides:
//! - `AuthenticatedRequestExecutor`: token acquisition, bearer auth and
//!   the bounded retry-on-401 loop
//! - `ThreatQClient`: typed wrappers for the indicator endpoints
//! - `query`: construction of advanced-search filter bodies
//!
//! Tokens come from the password-grant `/api/token` endpoint and are cached
//! per credential pair in a shared `SessionManager`.

pub mod client;
pub mod error;
pub mod executor;
pub mod query;

pub use client::ThreatQClient;
pub use error::ApiError;
pub use executor::{ApiResponse, AuthenticatedRequestExecutor, Credentials, RequestSpec};
