//! ThreatQ lookup integration core.
//!
//! Looks up IPs, hashes, domains, emails and URLs against a ThreatQ server
//! and relays edits (tags, comments, attributes, watchlist, score, status)
//! made in the overlay back to the API.
//!
//! The pieces, bottom-up:
//! - `auth::SessionManager`: per-credential bearer token cache
//! - `api::AuthenticatedRequestExecutor`: login, bearer auth, bounded retry on 401
//! - `lookup::group_entities`: batching and filtering of entities
//! - `Integration`: the host-facing lookup / details / message / validate calls

pub mod actions;
pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod integration;
pub mod lookup;
pub mod models;
pub mod options;

pub use api::{ApiError, AuthenticatedRequestExecutor, Credentials, RequestSpec};
pub use auth::SessionManager;
pub use config::IntegrationConfig;
pub use error::{ErrorPayload, IntegrationError};
pub use integration::Integration;
pub use models::{Entity, EntityType, Id, LookupResult};
pub use options::{IntegrationOptions, ValidationError};
