use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

use crate::models::EngineOptions;
use crate::services::FetchLimits;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    #[serde(default)]
    pub airtable: AirtableSettings,
    #[serde(default)]
    pub geocoding: GeocodingSettings,
    #[serde(default)]
    pub filtering: FilteringSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AirtableSettings {
    #[serde(default = "default_airtable_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub api_token: String,
    #[serde(default)]
    pub base_id: String,
    #[serde(default)]
    pub table_id: String,
    #[serde(default = "default_max_records")]
    pub max_records: usize,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AirtableSettings {
    fn default() -> Self {
        Self {
            endpoint: default_airtable_endpoint(),
            api_token: String::new(),
            base_id: String::new(),
            table_id: String::new(),
            max_records: default_max_records(),
            page_size: default_page_size(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl AirtableSettings {
    pub fn limits(&self) -> FetchLimits {
        FetchLimits {
            max_records: self.max_records,
            page_size: self.page_size,
        }
    }
}

fn default_airtable_endpoint() -> String { "https://api.airtable.com".to_string() }
fn default_max_records() -> usize { 400 }
fn default_page_size() -> usize { 100 }
fn default_timeout_secs() -> u64 { 30 }

#[derive(Debug, Clone, Deserialize)]
pub struct GeocodingSettings {
    #[serde(default = "default_geocoding_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GeocodingSettings {
    fn default() -> Self {
        Self {
            endpoint: default_geocoding_endpoint(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_geocoding_endpoint() -> String { "https://maps.googleapis.com".to_string() }

#[derive(Debug, Clone, Deserialize)]
pub struct FilteringSettings {
    #[serde(default = "default_result_limit")]
    pub result_limit: usize,
    /// Off by default: distances are computed on raw decimal degrees
    #[serde(default)]
    pub degrees_to_radians: bool,
}

impl Default for FilteringSettings {
    fn default() -> Self {
        Self {
            result_limit: default_result_limit(),
            degrees_to_radians: false,
        }
    }
}

impl FilteringSettings {
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            result_limit: self.result_limit,
            degrees_to_radians: self.degrees_to_radians,
        }
    }
}

fn default_result_limit() -> usize { 10 }

#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self { ttl_secs: default_ttl_secs() }
    }
}

fn default_ttl_secs() -> u64 { 300 }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Environment variables (prefixed with VOTING__)
    /// 4. The plain variables of the hosted functions (AIRTABLE_API_TOKEN, ...)
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .add_source(File::with_name("config/default").required(false))
            // Local overrides for development
            .add_source(File::with_name("config/local").required(false))
            // e.g., VOTING__SERVER__PORT -> server.port
            .add_source(
                Environment::with_prefix("VOTING")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        apply_legacy_env(settings)?.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("VOTING")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }
}

/// Plain environment variable names used by the hosted functions
const LEGACY_ENV: [(&str, &str); 6] = [
    ("AIRTABLE_API_TOKEN", "airtable.api_token"),
    ("AIRTABLE_BASE_ID", "airtable.base_id"),
    ("AIRTABLE_TABLE_ID", "airtable.table_id"),
    ("MAX_RECORDS", "airtable.max_records"),
    ("PAGE_SIZE", "airtable.page_size"),
    ("GEOCODING_API_KEY", "geocoding.api_key"),
];

fn apply_legacy_env(settings: Config) -> Result<Config, ConfigError> {
    let mut builder = Config::builder().add_source(settings);

    for (var, key) in LEGACY_ENV {
        if let Ok(value) = std::env::var(var) {
            builder = builder.set_override(key, value)?;
        }
    }

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filtering() {
        let filtering = FilteringSettings::default();
        let options = filtering.engine_options();
        assert_eq!(options.result_limit, 10);
        assert!(!options.degrees_to_radians);
    }

    #[test]
    fn test_default_airtable_limits() {
        let limits = AirtableSettings::default().limits();
        assert_eq!(limits.max_records, 400);
        assert_eq!(limits.page_size, 100);
    }

    #[test]
    fn test_default_logging() {
        let level = default_log_level();
        let format = default_log_format();
        assert_eq!(level, "info");
        assert_eq!(format, "json");
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join("voting_locator_settings_test.toml");
        std::fs::write(
            &path,
            r#"
[server]
host = "127.0.0.1"
port = 9000

[filtering]
result_limit = 5
"#,
        )
        .unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.server.port, 9000);
        assert_eq!(settings.filtering.result_limit, 5);
        assert_eq!(settings.airtable.endpoint, "https://api.airtable.com");
        assert_eq!(settings.cache.ttl_secs, 300);

        std::fs::remove_file(&path).ok();
    }
}
