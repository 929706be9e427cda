//! Utility functions for identifiers and timestamps.

mod ids;
pub mod timestamps;

pub use ids::generate_id;
pub use timestamps::{format_system_time, format_timestamp, iso_timestamp, Timestamp};
