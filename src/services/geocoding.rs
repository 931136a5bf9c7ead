use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::models::Coordinate;

/// Errors that can occur when resolving an address
#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("Geocoding API key is not configured")]
    NotConfigured,

    #[error("No address provided")]
    MissingAddress,

    #[error("Address not found: {0}")]
    NotFound(String),

    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Geocoding API error: {0}")]
    ApiError(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Resolves a free-text address to a coordinate
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, address: &str) -> Result<Coordinate, GeocodeError>;
}

/// Google Maps geocoding client
pub struct GoogleGeocoder {
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

impl GoogleGeocoder {
    pub fn new(base_url: String, api_key: Option<String>, timeout: Duration) -> Result<Self, GeocodeError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url,
            api_key: api_key.filter(|k| !k.is_empty()),
            client,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

#[async_trait]
impl Geocoder for GoogleGeocoder {
    async fn geocode(&self, address: &str) -> Result<Coordinate, GeocodeError> {
        let api_key = self.api_key.as_deref().ok_or(GeocodeError::NotConfigured)?;

        let address = address.trim();
        if address.is_empty() {
            return Err(GeocodeError::MissingAddress);
        }

        let url = format!(
            "{}/maps/api/geocode/json?address={}&key={}",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(address),
            urlencoding::encode(api_key)
        );

        tracing::debug!("Geocoding address: {}", address);

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let message = response
                .json::<Value>()
                .await
                .ok()
                .and_then(|body| {
                    body.get("error_message")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                })
                .unwrap_or_else(|| status.to_string());
            tracing::error!("Error geocoding address: {} - {}", status, message);
            return Err(GeocodeError::ApiError(format!("{} - {}", status.as_u16(), message)));
        }

        let json: Value = response.json().await?;

        let status = json.get("status").and_then(Value::as_str).unwrap_or_default();
        let first = json
            .get("results")
            .and_then(Value::as_array)
            .and_then(|results| results.first());

        let location = match (status, first) {
            ("OK", Some(result)) => result
                .pointer("/geometry/location")
                .ok_or_else(|| GeocodeError::InvalidResponse("Missing geometry.location".into()))?,
            _ => {
                tracing::debug!("Geocoder returned status {:?} for {}", status, address);
                return Err(GeocodeError::NotFound(address.to_string()));
            }
        };

        let lat = location.get("lat").and_then(Value::as_f64);
        let lng = location.get("lng").and_then(Value::as_f64);

        match (lat, lng) {
            (Some(lat), Some(lng)) => Ok(Coordinate::new(lat, lng)),
            _ => Err(GeocodeError::InvalidResponse(format!(
                "Non-numeric location: {}",
                location
            ))),
        }
    }
}
