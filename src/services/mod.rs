// Service exports
pub mod airtable;
pub mod geocoding;
pub mod record_cache;

pub use airtable::{AirtableClient, AirtableError, FetchLimits, RecordSource};
pub use geocoding::{GeocodeError, Geocoder, GoogleGeocoder};
pub use record_cache::RecordCache;
