use serde::{Deserialize, Serialize};

use crate::core::engine::ProximityStatus;
use crate::core::presenter::{LocationCard, MarkerDiff};

/// Response for the filter endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterLocationsResponse {
    pub request_token: Option<u64>,
    pub count: usize,
    pub count_label: String,
    pub locations: Vec<LocationCard>,
    pub markers: MarkerDiff,
    pub proximity: ProximityStatus,
    /// User-facing notice, e.g. an empty result or an unresolvable address
    pub warning: Option<String>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
