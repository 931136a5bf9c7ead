// Core algorithm exports
pub mod distance;
pub mod engine;
pub mod filters;
pub mod geocode_cache;
pub mod hours;
pub mod presenter;

pub use distance::{distance, DistanceError};
pub use engine::{FilterError, FilterOutcome, LocationFilterEngine, ProximityStatus, RequestToken};
pub use filters::{matches_borough, matches_category, matches_date_range, zip_distance};
pub use geocode_cache::{decode, try_decode, DecodeError};
pub use hours::{group_by_day, DayHours, DayHoursGroup, HoursLabel, HoursToken};
pub use presenter::{build_cards, count_label, LocationCard, MarkerDiff};
