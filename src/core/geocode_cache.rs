use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use serde_json::Value;
use thiserror::Error;

use crate::models::Coordinate;

/// Standard alphabet, padding optional
const CACHE_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Reasons a geocode cache string could not be turned into a coordinate
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("geocode cache is empty")]
    Empty,

    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("latitude or longitude missing in geocode cache: {0}")]
    MissingCoordinates(Value),
}

fn is_base64_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '=')
}

/// Decode a geocode cache string, reporting why it failed
///
/// Upstream formatting prefixes the payload with status glyphs, so any
/// leading run of characters outside the base64 alphabet is skipped.
pub fn try_decode(cache: &str) -> Result<Coordinate, DecodeError> {
    let cleaned = cache.trim().trim_start_matches(|c: char| !is_base64_char(c));
    if cleaned.is_empty() {
        return Err(DecodeError::Empty);
    }

    let bytes = CACHE_ENGINE.decode(cleaned)?;
    let parsed: Value = serde_json::from_slice(&bytes)?;

    let location = parsed.get("o");
    let lat = location.and_then(|o| o.get("lat")).and_then(Value::as_f64);
    let lng = location.and_then(|o| o.get("lng")).and_then(Value::as_f64);

    match (lat, lng) {
        (Some(lat), Some(lng)) => Ok(Coordinate::new(lat, lng)),
        _ => Err(DecodeError::MissingCoordinates(parsed)),
    }
}

/// Decode a record's geocode cache, absorbing failures
///
/// Never fails: anything that cannot be decoded is logged and yields `None`.
pub fn decode(cache: Option<&str>) -> Option<Coordinate> {
    let Some(cache) = cache else {
        tracing::debug!("No geocode cache present");
        return None;
    };

    match try_decode(cache) {
        Ok(coordinate) => Some(coordinate),
        Err(DecodeError::Empty) => {
            tracing::debug!("Empty geocode cache");
            None
        }
        Err(e @ DecodeError::MissingCoordinates(_)) => {
            tracing::warn!("{}", e);
            None
        }
        Err(e) => {
            tracing::error!("Error decoding geocode cache: {}", e);
            None
        }
    }
}
