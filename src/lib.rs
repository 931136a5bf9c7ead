//! Voting Locator - filtering and proximity ranking for voting locations
//!
//! This library turns the full set of voting-location records plus the
//! user's criteria (borough, location type, event dates, zip code or
//! address) into an ordered, bounded list ready for display.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{
    decode, distance, group_by_day, FilterOutcome, LocationFilterEngine, ProximityStatus,
};
pub use crate::models::{Coordinate, FilterCriteria, VotingRecord};
