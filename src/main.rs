use actix_cors::Cors;
use actix_web::{error, http::StatusCode, middleware, web, App, HttpResponse, HttpServer};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use voting_locator::config::Settings;
use voting_locator::routes::{self, locations::AppState};
use voting_locator::services::{AirtableClient, GoogleGeocoder, RecordCache};

/// JSON error response for payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST)
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(self)
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

/// Handle query payload errors
pub fn handle_query_payload_error(err: error::QueryPayloadError, _req: &actix_web::HttpRequest) -> actix_web::Error {
    JsonError {
        error: "invalid_query".to_string(),
        message: format!("Invalid query: {}", err),
        status_code: 400,
    }
    .into()
}

fn init_logging(level: &str, format: &str) {
    // LOG_LEVEL / LOG_FORMAT win over the config file
    let level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| level.to_string());
    let format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| format.to_string());

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_level(true);

    if format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.json().init();
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e));
        }
    };

    init_logging(&settings.logging.level, &settings.logging.format);
    info!("Starting voting locator service...");

    let airtable = &settings.airtable;
    let source = AirtableClient::new(
        airtable.endpoint.clone(),
        airtable.api_token.clone(),
        airtable.base_id.clone(),
        airtable.table_id.clone(),
        airtable.limits(),
        Duration::from_secs(airtable.timeout_secs),
    )
    .map_err(|e| {
        error!("Failed to create Airtable client: {}", e);
        std::io::Error::new(std::io::ErrorKind::Other, e)
    })?;

    if airtable.api_token.is_empty() || airtable.base_id.is_empty() || airtable.table_id.is_empty() {
        warn!("Airtable API token or IDs are not configured; location requests will fail");
    }

    let geocoder = GoogleGeocoder::new(
        settings.geocoding.endpoint.clone(),
        settings.geocoding.api_key.clone(),
        Duration::from_secs(settings.geocoding.timeout_secs),
    )
    .map_err(|e| {
        error!("Failed to create geocoding client: {}", e);
        std::io::Error::new(std::io::ErrorKind::Other, e)
    })?;

    if !geocoder.is_configured() {
        warn!("Geocoding API key is not configured; address filtering is unavailable");
    }

    let engine_options = settings.filtering.engine_options();
    info!(
        "Filtering: nearest {} results, degrees_to_radians={}",
        engine_options.result_limit, engine_options.degrees_to_radians
    );

    let app_state = AppState {
        source: Arc::new(source),
        geocoder: Arc::new(geocoder),
        records: RecordCache::new(settings.cache.ttl_secs),
        engine_options,
    };

    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
