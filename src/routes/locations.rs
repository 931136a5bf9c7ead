use actix_web::{http::StatusCode, web, HttpResponse, Responder};
use std::sync::Arc;
use validator::Validate;

use crate::core::engine::ProximityStatus;
use crate::core::presenter::{build_cards, count_label, MarkerDiff, NO_RESULTS_MESSAGE};
use crate::core::LocationFilterEngine;
use crate::models::{
    EngineOptions, ErrorResponse, FilterLocationsRequest, FilterLocationsResponse, GeocodeQuery,
    HealthResponse,
};
use crate::services::{GeocodeError, Geocoder, RecordCache, RecordSource};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub source: Arc<dyn RecordSource>,
    pub geocoder: Arc<dyn Geocoder>,
    pub records: RecordCache,
    pub engine_options: EngineOptions,
}

/// Configure all location-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/locations", web::get().to(list_locations))
        .route("/locations/filter", web::post().to(filter_locations))
        .route("/geocode", web::get().to(geocode_address));
}

fn error_response(status: StatusCode, error: &str, message: String) -> HttpResponse {
    HttpResponse::build(status).json(ErrorResponse {
        error: error.to_string(),
        message,
        status_code: status.as_u16(),
    })
}

/// Health check endpoint
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Full, unfiltered record collection
///
/// GET /api/v1/locations
async fn list_locations(state: web::Data<AppState>) -> impl Responder {
    match state.records.get_or_load(state.source.as_ref()).await {
        Ok(records) => HttpResponse::Ok().json(records.as_slice()),
        Err(e) => {
            tracing::error!("Failed to fetch locations: {}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to fetch locations",
                e.to_string(),
            )
        }
    }
}

/// Filter endpoint
///
/// POST /api/v1/locations/filter
///
/// Request body:
/// ```json
/// {
///   "borough": "Manhattan",
///   "locationType": "all|dedicated|event",
///   "dateStart": "2024-11-01",
///   "dateEnd": "2024-11-05",
///   "zipCode": "10001",
///   "address": "string",
///   "requestToken": 3,
///   "previousMarkerIds": ["rec..."]
/// }
/// ```
async fn filter_locations(
    state: web::Data<AppState>,
    req: web::Json<FilterLocationsRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for filter request: {:?}", errors);
        return error_response(StatusCode::BAD_REQUEST, "Validation failed", errors.to_string());
    }

    let records = match state.records.get_or_load(state.source.as_ref()).await {
        Ok(records) => records,
        Err(e) => {
            tracing::error!("Failed to fetch locations via backend: {}", e);
            return error_response(
                StatusCode::BAD_GATEWAY,
                "Failed to load voting locations",
                e.to_string(),
            );
        }
    };

    let criteria = req.to_criteria();
    // One engine per request: request tokens only order calls from a single client
    let engine = LocationFilterEngine::new(state.engine_options);

    let outcome = match engine
        .filter(&records, &criteria, state.geocoder.as_ref())
        .await
    {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::warn!("{}", e);
            return error_response(StatusCode::CONFLICT, "Request superseded", e.to_string());
        }
    };

    let cards = build_cards(&outcome.records);
    let markers = MarkerDiff::between(&req.previous_marker_ids, &cards);

    let warning = match &outcome.proximity {
        ProximityStatus::AddressUnresolved { .. } => {
            Some("Could not find that address; showing locations without distance ranking.".to_string())
        }
        _ if cards.is_empty() => Some(NO_RESULTS_MESSAGE.to_string()),
        _ => None,
    };

    tracing::info!(
        "Returning {} locations (from {} records, proximity: {:?})",
        cards.len(),
        records.len(),
        outcome.proximity
    );

    HttpResponse::Ok().json(FilterLocationsResponse {
        request_token: req.request_token,
        count: cards.len(),
        count_label: count_label(cards.len()),
        locations: cards,
        markers,
        proximity: outcome.proximity,
        warning,
    })
}

/// Geocoding proxy
///
/// GET /api/v1/geocode?address={address}
async fn geocode_address(
    state: web::Data<AppState>,
    query: web::Query<GeocodeQuery>,
) -> impl Responder {
    if query.validate().is_err() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Missing address",
            "Please provide an 'address' in the query string.".to_string(),
        );
    }

    match state.geocoder.geocode(&query.address).await {
        Ok(coordinate) => HttpResponse::Ok().json(coordinate),
        Err(e) => {
            let status = match e {
                GeocodeError::MissingAddress => StatusCode::BAD_REQUEST,
                GeocodeError::NotFound(_) => StatusCode::NOT_FOUND,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            if status.is_server_error() {
                tracing::error!("Error geocoding address: {}", e);
            }
            error_response(status, "Failed to geocode address", e.to_string())
        }
    }
}
