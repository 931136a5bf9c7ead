use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::domain::{CategorySelector, DateRange, FilterCriteria};

/// Request to filter the voting locations
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FilterLocationsRequest {
    #[validate(length(max = 64))]
    #[serde(default)]
    pub borough: Option<String>,
    #[serde(default, alias = "type")]
    pub location_type: CategorySelector,
    #[serde(default)]
    pub date_start: Option<NaiveDate>,
    #[serde(default)]
    pub date_end: Option<NaiveDate>,
    /// Raw zip input; only its leading integer is used (`10001-1234` -> 10001)
    #[validate(length(max = 16))]
    #[serde(default)]
    pub zip_code: Option<String>,
    #[validate(length(max = 256))]
    #[serde(default)]
    pub address: Option<String>,
    /// Client-side sequence number, echoed back in the response
    #[serde(default)]
    pub request_token: Option<u64>,
    /// Ids of the markers currently shown by the client
    #[serde(default)]
    pub previous_marker_ids: Vec<String>,
}

impl FilterLocationsRequest {
    /// Build engine criteria, dropping blank or unusable inputs
    pub fn to_criteria(&self) -> FilterCriteria {
        let borough = non_blank(self.borough.as_deref());

        // The date filter only applies once both ends are chosen
        let date_range = match (self.date_start, self.date_end) {
            (Some(start), Some(end)) => Some(DateRange::new(start, end)),
            _ => None,
        };

        let zip_code = non_blank(self.zip_code.as_deref()).and_then(|zip| {
            let parsed = leading_integer(&zip);
            if parsed.is_none() {
                tracing::debug!("Ignoring non-numeric zip filter: {}", zip);
            }
            parsed
        });

        FilterCriteria {
            borough,
            category: self.location_type,
            date_range,
            zip_code,
            address: non_blank(self.address.as_deref()),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Integer prefix of `value`: optional sign, then digits up to the first
/// non-digit. `None` when there are no leading digits.
fn leading_integer(value: &str) -> Option<i64> {
    let value = value.trim_start();
    let unsigned = value.trim_start_matches(['+', '-']);
    let sign_len = value.len() - unsigned.len();
    if sign_len > 1 {
        return None;
    }

    let digits = unsigned
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(unsigned.len());
    if digits == 0 {
        return None;
    }

    value[..sign_len + digits].parse().ok()
}

/// Query string of the geocoding proxy
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GeocodeQuery {
    #[validate(length(min = 1, max = 256))]
    #[serde(default)]
    pub address: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let req: FilterLocationsRequest = serde_json::from_str("{}").unwrap();
        let criteria = req.to_criteria();
        assert_eq!(criteria, FilterCriteria::default());
    }

    #[test]
    fn test_request_to_criteria() {
        let req: FilterLocationsRequest = serde_json::from_value(serde_json::json!({
            "borough": "Queens",
            "locationType": "event",
            "dateStart": "2024-11-01",
            "dateEnd": "2024-11-05",
            "zipCode": "11101",
            "address": "  ",
            "requestToken": 7
        }))
        .unwrap();

        let criteria = req.to_criteria();
        assert_eq!(criteria.borough.as_deref(), Some("Queens"));
        assert_eq!(criteria.category, CategorySelector::Event);
        assert!(criteria.date_range.is_some());
        assert_eq!(criteria.zip_code, Some(11101));
        assert_eq!(criteria.address, None);
        assert_eq!(req.request_token, Some(7));
    }

    #[test]
    fn test_half_open_date_range_is_ignored() {
        let req = FilterLocationsRequest {
            date_start: NaiveDate::from_ymd_opt(2024, 11, 1),
            ..Default::default()
        };
        assert!(req.to_criteria().date_range.is_none());
    }

    #[test]
    fn test_non_numeric_zip_is_ignored() {
        let req = FilterLocationsRequest {
            zip_code: Some("abc".to_string()),
            ..Default::default()
        };
        assert!(req.to_criteria().zip_code.is_none());
    }

    #[test]
    fn test_zip_uses_leading_digits() {
        let zip = |raw: &str| {
            FilterLocationsRequest {
                zip_code: Some(raw.to_string()),
                ..Default::default()
            }
            .to_criteria()
            .zip_code
        };

        assert_eq!(zip("10001-1234"), Some(10001));
        assert_eq!(zip("10001abc"), Some(10001));
        assert_eq!(zip(" 10001 "), Some(10001));
        assert_eq!(zip("+11201"), Some(11201));
        assert_eq!(zip("-12"), Some(-12));
        assert_eq!(zip("zip 10001"), None);
        assert_eq!(zip("-"), None);
        assert_eq!(zip("+-5"), None);
    }

    #[test]
    fn test_validation_rejects_long_address() {
        let req = FilterLocationsRequest {
            address: Some("x".repeat(300)),
            ..Default::default()
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_geocode_query_requires_address() {
        let query = GeocodeQuery { address: String::new() };
        assert!(query.validate().is_err());
    }
}
