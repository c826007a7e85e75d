//! Entity lookup support.
//!
//! This module provides:
//! - `group_entities`: Batching of host entities into search-sized groups
//! - `build_lookup_result`: Status filtering and summary shaping of hits

pub mod grouping;
pub mod results;

pub use grouping::{group_entities, EntityGroups, MAX_ENTITIES_PER_LOOKUP};
pub use results::{build_lookup_result, user_options_view};
