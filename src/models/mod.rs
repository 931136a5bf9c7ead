// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    Category, CategorySelector, Coordinate, DateRange, EngineOptions, FilterCriteria, RecordFields,
    VotingRecord, COMMUNITY_EVENT,
};
pub use requests::{FilterLocationsRequest, GeocodeQuery};
pub use responses::{ErrorResponse, FilterLocationsResponse, HealthResponse};
