use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;

use crate::core::{
    distance::distance,
    filters::{matches_borough, matches_category, matches_date_range, zip_distance},
    geocode_cache,
};
use crate::models::{Coordinate, EngineOptions, FilterCriteria, VotingRecord};
use crate::services::geocoding::Geocoder;

/// Sequence number attached to each filter invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestToken(u64);

impl RequestToken {
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How (and whether) the result was ranked by proximity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum ProximityStatus {
    NotRequested,
    ZipCode { target: i64 },
    Address { origin: Coordinate },
    /// Geocoding failed; the records are the unranked pre-stage set
    AddressUnresolved { address: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("filter request {0} was superseded by a newer request")]
    Superseded(RequestToken),
}

/// Result of one filter invocation
#[derive(Debug, Clone)]
pub struct FilterOutcome {
    pub token: RequestToken,
    pub records: Vec<VotingRecord>,
    pub proximity: ProximityStatus,
}

/// Location filtering pipeline
///
/// # Pipeline Stages
/// 1. Borough exact match
/// 2. Category (dedicated sites / community events)
/// 3. Event date range
/// 4. Zip-code proximity, or
/// 5. Address proximity (takes precedence over zip)
///
/// Proximity stages re-sort and keep the nearest `result_limit` records.
/// Clones share one token counter, so a newer invocation on any clone makes
/// an older one stale.
#[derive(Debug, Clone)]
pub struct LocationFilterEngine {
    options: EngineOptions,
    latest: Arc<AtomicU64>,
}

impl LocationFilterEngine {
    pub fn new(options: EngineOptions) -> Self {
        Self {
            options,
            latest: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn with_default_options() -> Self {
        Self::new(EngineOptions::default())
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Start a new invocation, making every earlier token stale
    pub fn issue_token(&self) -> RequestToken {
        RequestToken(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, token: RequestToken) -> bool {
        self.latest.load(Ordering::SeqCst) == token.0
    }

    /// Run the full pipeline
    ///
    /// The geocoder is called at most once, and only when an address is set.
    /// A geocoding failure is not an error: the records from before the
    /// proximity stage are returned and `proximity` says why.
    pub async fn filter<G>(
        &self,
        records: &[VotingRecord],
        criteria: &FilterCriteria,
        geocoder: &G,
    ) -> Result<FilterOutcome, FilterError>
    where
        G: Geocoder + ?Sized,
    {
        let token = self.issue_token();
        let filtered = self.apply_filters(records, criteria);

        let (ranked, proximity) = if let Some(address) = criteria.active_address() {
            let resolved = geocoder.geocode(address).await;

            if !self.is_current(token) {
                tracing::debug!("Discarding geocode response for stale request {}", token);
                return Err(FilterError::Superseded(token));
            }

            match resolved {
                Ok(origin) => {
                    tracing::debug!("Input: {}", origin);
                    (
                        self.rank_by_distance(filtered, origin),
                        ProximityStatus::Address { origin },
                    )
                }
                Err(e) => {
                    tracing::error!("Could not geocode the input address: {}", e);
                    (
                        filtered,
                        ProximityStatus::AddressUnresolved {
                            address: address.to_string(),
                            reason: e.to_string(),
                        },
                    )
                }
            }
        } else if let Some(target) = criteria.zip_code {
            (
                self.rank_by_zip(filtered, target),
                ProximityStatus::ZipCode { target },
            )
        } else {
            (filtered, ProximityStatus::NotRequested)
        };

        tracing::debug!(
            "Request {}: {} of {} records selected",
            token,
            ranked.len(),
            records.len()
        );

        Ok(FilterOutcome {
            token,
            records: ranked.into_iter().cloned().collect(),
            proximity,
        })
    }

    /// Borough, category and date stages, preserving input order
    pub fn apply_filters<'a>(
        &self,
        records: &'a [VotingRecord],
        criteria: &FilterCriteria,
    ) -> Vec<&'a VotingRecord> {
        let filtered: Vec<&VotingRecord> = records
            .iter()
            // Stage 1: Borough
            .filter(|r| criteria.borough.as_deref().map_or(true, |b| matches_borough(r, b)))
            // Stage 2: Category
            .filter(|r| matches_category(r, criteria.category))
            // Stage 3: Date range
            .filter(|r| criteria.date_range.as_ref().map_or(true, |d| matches_date_range(r, d)))
            .collect();

        tracing::debug!(
            "Categorical filters kept {} of {} records",
            filtered.len(),
            records.len()
        );

        filtered
    }

    /// Nearest zip codes first, ties keep their input order
    pub fn rank_by_zip<'a>(
        &self,
        mut records: Vec<&'a VotingRecord>,
        target: i64,
    ) -> Vec<&'a VotingRecord> {
        records.sort_by_key(|r| zip_distance(r, target));
        records.truncate(self.options.result_limit);
        records
    }

    /// Nearest decoded coordinates first; records without one sort last
    pub fn rank_by_distance<'a>(
        &self,
        records: Vec<&'a VotingRecord>,
        origin: Coordinate,
    ) -> Vec<&'a VotingRecord> {
        let mut with_distance: Vec<(f64, &VotingRecord)> = records
            .into_iter()
            .map(|r| (self.distance_to(origin, r), r))
            .collect();

        with_distance.sort_by(|a, b| a.0.total_cmp(&b.0));
        with_distance.truncate(self.options.result_limit);

        with_distance.into_iter().map(|(_, r)| r).collect()
    }

    /// Distance from `origin` to a record, `INFINITY` when it cannot be placed
    pub fn distance_to(&self, origin: Coordinate, record: &VotingRecord) -> f64 {
        let Some(target) = geocode_cache::decode(record.fields.geocode_cache.as_deref()) else {
            return f64::INFINITY;
        };

        let angle = |deg: f64| {
            if self.options.degrees_to_radians {
                deg.to_radians()
            } else {
                deg
            }
        };

        distance(
            Some(angle(origin.lng)),
            Some(angle(origin.lat)),
            Some(angle(target.lng)),
            Some(angle(target.lat)),
        )
        .unwrap_or_else(|e| {
            tracing::warn!("Cannot rank record {}: {}", record.id, e);
            f64::INFINITY
        })
    }
}

impl Default for LocationFilterEngine {
    fn default() -> Self {
        Self::with_default_options()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, CategorySelector, RecordFields};
    use crate::services::geocoding::GeocodeError;
    use async_trait::async_trait;
    use base64::{engine::general_purpose::STANDARD, Engine as _};

    struct FixedGeocoder(Option<Coordinate>);

    #[async_trait]
    impl Geocoder for FixedGeocoder {
        async fn geocode(&self, address: &str) -> Result<Coordinate, GeocodeError> {
            self.0
                .ok_or_else(|| GeocodeError::NotFound(address.to_string()))
        }
    }

    /// Starts a newer request on a shared engine before answering
    struct RacingGeocoder(LocationFilterEngine);

    #[async_trait]
    impl Geocoder for RacingGeocoder {
        async fn geocode(&self, _address: &str) -> Result<Coordinate, GeocodeError> {
            self.0.issue_token();
            Ok(Coordinate::new(40.7, -74.0))
        }
    }

    fn create_site(id: &str, lat: Option<f64>, zip: i64) -> VotingRecord {
        VotingRecord {
            id: id.to_string(),
            created_time: None,
            fields: RecordFields {
                category: Category::from("Early Voting Site".to_string()),
                zip_code: Some(zip),
                geocode_cache: lat.map(|lat| {
                    STANDARD.encode(format!(r#"{{"o":{{"lat":{},"lng":-74.0}}}}"#, lat))
                }),
                ..Default::default()
            },
        }
    }

    fn ids(records: &[VotingRecord]) -> Vec<&str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_no_criteria_keeps_everything() {
        let engine = LocationFilterEngine::default();
        let records = vec![create_site("a", None, 1), create_site("b", None, 2)];

        let outcome = tokio_test::block_on(engine.filter(
            &records,
            &FilterCriteria::default(),
            &FixedGeocoder(None),
        ))
        .unwrap();

        assert_eq!(ids(&outcome.records), vec!["a", "b"]);
        assert_eq!(outcome.proximity, ProximityStatus::NotRequested);
    }

    #[test]
    fn test_address_ranking_puts_unplaceable_last() {
        let engine = LocationFilterEngine::default();
        let records = vec![
            create_site("none", None, 1),
            create_site("far", Some(40.9), 2),
            create_site("near", Some(40.71), 3),
        ];
        let criteria = FilterCriteria {
            address: Some("1 Centre St".to_string()),
            ..Default::default()
        };
        let origin = Coordinate::new(40.7, -74.0);

        let outcome =
            tokio_test::block_on(engine.filter(&records, &criteria, &FixedGeocoder(Some(origin))))
                .unwrap();

        assert_eq!(ids(&outcome.records), vec!["near", "far", "none"]);
        assert_eq!(outcome.proximity, ProximityStatus::Address { origin });
    }

    #[test]
    fn test_address_wins_over_zip() {
        let engine = LocationFilterEngine::default();
        let records = vec![create_site("zip-close", Some(41.5), 10000), create_site("geo-close", Some(40.7), 99999)];
        let criteria = FilterCriteria {
            zip_code: Some(10000),
            address: Some("somewhere".to_string()),
            ..Default::default()
        };

        let outcome = tokio_test::block_on(engine.filter(
            &records,
            &criteria,
            &FixedGeocoder(Some(Coordinate::new(40.7, -74.0))),
        ))
        .unwrap();

        assert_eq!(ids(&outcome.records), vec!["geo-close", "zip-close"]);
    }

    #[test]
    fn test_result_limit_applies_to_proximity_only() {
        let engine = LocationFilterEngine::new(EngineOptions {
            result_limit: 2,
            degrees_to_radians: true,
        });
        let records: Vec<_> = (0..5).map(|i| create_site(&i.to_string(), None, i)).collect();

        let all = engine.apply_filters(&records, &FilterCriteria::default());
        assert_eq!(all.len(), 5);

        let ranked = engine.rank_by_zip(all, 4);
        let ranked: Vec<&str> = ranked.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ranked, vec!["4", "3"]);
    }

    #[test]
    fn test_degree_conversion_option() {
        let origin = Coordinate::new(40.7, -74.0);
        let record = create_site("a", Some(41.7), 1);

        let raw = LocationFilterEngine::default().distance_to(origin, &record);
        let converted = LocationFilterEngine::new(EngineOptions {
            result_limit: 10,
            degrees_to_radians: true,
        })
        .distance_to(origin, &record);

        // One degree of latitude is ~111km; one "radian" is ~6378km
        assert!((converted - 111.3).abs() < 1.0, "got {}", converted);
        assert!((raw - 6378.0).abs() < 1.0, "got {}", raw);
    }

    #[test]
    fn test_tokens_increase_and_go_stale() {
        let engine = LocationFilterEngine::default();
        let clone = engine.clone();

        let first = engine.issue_token();
        assert!(engine.is_current(first));

        let second = clone.issue_token();
        assert!(second > first);
        assert!(!engine.is_current(first));
        assert!(engine.is_current(second));
    }

    #[tokio::test]
    async fn test_newer_request_supersedes_pending_geocode() {
        let engine = LocationFilterEngine::default();
        let geocoder = RacingGeocoder(engine.clone());
        let records = vec![create_site("a", Some(40.71), 1)];
        let criteria = FilterCriteria {
            address: Some("1 Centre St".to_string()),
            ..Default::default()
        };

        let result = engine.filter(&records, &criteria, &geocoder).await;
        assert_eq!(result.err(), Some(FilterError::Superseded(RequestToken(1))));

        // Without an address the geocoder is never awaited, so nothing goes stale
        let outcome = engine
            .filter(&records, &FilterCriteria::default(), &geocoder)
            .await
            .unwrap();
        assert_eq!(outcome.token, RequestToken(3));
    }

    #[test]
    fn test_category_filter_on_events() {
        let engine = LocationFilterEngine::default();
        let mut event = create_site("event", None, 1);
        event.fields.category = Category::CommunityEvent;
        let records = vec![create_site("site", None, 2), event];
        let criteria = FilterCriteria {
            category: CategorySelector::Event,
            ..Default::default()
        };

        let kept = engine.apply_filters(&records, &criteria);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, "event");
    }
}
