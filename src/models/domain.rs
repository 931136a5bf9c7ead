use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Category value Airtable uses for one-time dated events
pub const COMMUNITY_EVENT: &str = "Community Event";

/// Voting location record as returned by Airtable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VotingRecord {
    pub id: String,
    #[serde(rename = "createdTime", default, skip_serializing_if = "Option::is_none")]
    pub created_time: Option<String>,
    #[serde(default)]
    pub fields: RecordFields,
}

impl VotingRecord {
    pub fn is_community_event(&self) -> bool {
        self.fields.category.is_community_event()
    }
}

/// Field mapping of a voting record
///
/// Decoding is lenient: a malformed timestamp or zip code becomes `None`
/// instead of rejecting the whole record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordFields {
    #[serde(rename = "Category", default)]
    pub category: Category,
    #[serde(
        rename = "Date and Time",
        default,
        deserialize_with = "lenient_datetime",
        skip_serializing_if = "Option::is_none"
    )]
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(
        rename = "End Time",
        default,
        deserialize_with = "lenient_datetime",
        skip_serializing_if = "Option::is_none"
    )]
    pub ends_at: Option<DateTime<Utc>>,
    #[serde(
        rename = "Name of Voting Location or Voting Event",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Option<String>,
    #[serde(rename = "Borough", default, skip_serializing_if = "Option::is_none")]
    pub borough: Option<String>,
    #[serde(rename = "Address", default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(rename = "Address Formatted", default, skip_serializing_if = "Option::is_none")]
    pub address_formatted: Option<String>,
    #[serde(
        rename = "Zip Code",
        default,
        deserialize_with = "lenient_zip",
        skip_serializing_if = "Option::is_none"
    )]
    pub zip_code: Option<i64>,
    #[serde(rename = "Open Hours", default, skip_serializing_if = "Option::is_none")]
    pub open_hours: Option<String>,
    #[serde(rename = "CS Open Hours", default, skip_serializing_if = "Option::is_none")]
    pub cs_open_hours: Option<String>,
    #[serde(
        rename = "Geocode Cache (For Maps Extension)",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub geocode_cache: Option<String>,
}

/// Record category: either a community event or a standing site
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    CommunityEvent,
    /// Any other non-empty category label
    Other(String),
    #[default]
    Unspecified,
}

impl Category {
    pub fn is_community_event(&self) -> bool {
        matches!(self, Category::CommunityEvent)
    }
}

impl From<String> for Category {
    fn from(value: String) -> Self {
        match value.as_str() {
            COMMUNITY_EVENT => Category::CommunityEvent,
            "" => Category::Unspecified,
            _ => Category::Other(value),
        }
    }
}

impl From<Category> for String {
    fn from(value: Category) -> Self {
        match value {
            Category::CommunityEvent => COMMUNITY_EVENT.to_string(),
            Category::Other(label) => label,
            Category::Unspecified => String::new(),
        }
    }
}

fn lenient_datetime<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc)))
}

fn lenient_zip<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Latitude/longitude pair in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.lat, self.lng)
    }
}

/// Which kinds of location the user wants to see
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategorySelector {
    #[default]
    All,
    Dedicated,
    Event,
}

/// Inclusive day range used by the date filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        day >= self.start && day <= self.end
    }
}

/// Active filter criteria for one filter invocation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub borough: Option<String>,
    pub category: CategorySelector,
    pub date_range: Option<DateRange>,
    pub zip_code: Option<i64>,
    pub address: Option<String>,
}

impl FilterCriteria {
    /// Address to geocode, ignoring blank input
    pub fn active_address(&self) -> Option<&str> {
        self.address
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
    }
}

/// Proximity ranking options
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineOptions {
    /// Number of records kept after a proximity stage
    pub result_limit: usize,
    /// Convert decimal degrees to radians before computing distances
    pub degrees_to_radians: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            result_limit: 10,
            degrees_to_radians: false,
        }
    }
}
