//! Data models for ThreatQ lookups.
//!
//! This module contains the data structures exchanged with the host and
//! the ThreatQ API:
//!
//! - `Entity`, `EntityType`: Values to look up, with their kind resolved once
//! - `Indicator` and friends: ThreatQ API response types
//! - `LookupResult`: Matched entities in the shape the host renders

pub mod entity;
pub mod indicator;
pub mod lookup;

pub use entity::{Entity, EntityType, HostEntity};
pub use indicator::{
    AttributePage, CommentPage, DataEnvelope, DetailView, Id, Indicator, IndicatorAttribute,
    IndicatorDetails, IndicatorStatus,
};
pub use lookup::{LookupData, LookupDetails, LookupResult, UserOptionsView};
