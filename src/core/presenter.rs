use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::core::{geocode_cache, hours::group_by_day};
use crate::models::{Coordinate, VotingRecord};

pub const NO_RESULTS_MESSAGE: &str = "No locations found matching your criteria.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LocationKind {
    CommunityEvent,
    VotingSite,
}

impl LocationKind {
    pub fn badge(self) -> &'static str {
        match self {
            LocationKind::CommunityEvent => "Community Voting Event",
            LocationKind::VotingSite => "Voting Site",
        }
    }

    pub fn marker_color(self) -> &'static str {
        match self {
            LocationKind::CommunityEvent => "red",
            LocationKind::VotingSite => "green",
        }
    }
}

/// One row of a site's weekly hours, e.g. `Monday - Friday: 9:00am - 5:00pm`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoursLine {
    pub days: String,
    pub hours: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Schedule {
    Event {
        starts_at: DateTime<Utc>,
        ends_at: Option<DateTime<Utc>>,
    },
    OpenHours { lines: Vec<HoursLine> },
    /// Community event with no date on record
    Unscheduled,
}

/// Everything a list card and its map marker need
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationCard {
    pub id: String,
    pub name: String,
    pub address: String,
    pub kind: LocationKind,
    pub badge: String,
    pub coordinate: Option<Coordinate>,
    pub schedule: Schedule,
}

impl LocationCard {
    pub fn from_record(record: &VotingRecord) -> Self {
        let fields = &record.fields;
        let kind = if record.is_community_event() {
            LocationKind::CommunityEvent
        } else {
            LocationKind::VotingSite
        };

        let schedule = match (kind, fields.starts_at) {
            (LocationKind::CommunityEvent, Some(starts_at)) => Schedule::Event {
                starts_at,
                ends_at: fields.ends_at,
            },
            (LocationKind::CommunityEvent, None) => Schedule::Unscheduled,
            (LocationKind::VotingSite, _) => Schedule::OpenHours {
                lines: hours_lines(fields.cs_open_hours.as_deref().unwrap_or_default()),
            },
        };

        Self {
            id: record.id.clone(),
            name: fields
                .name
                .clone()
                .unwrap_or_else(|| "No name provided".to_string()),
            address: fields
                .address_formatted
                .clone()
                .unwrap_or_else(|| "No address provided".to_string()),
            kind,
            badge: kind.badge().to_string(),
            coordinate: geocode_cache::decode(fields.geocode_cache.as_deref()),
            schedule,
        }
    }
}

fn hours_lines(hours_csv: &str) -> Vec<HoursLine> {
    group_by_day(hours_csv)
        .into_iter()
        .map(|group| HoursLine {
            days: group.days.join(", "),
            hours: if group.label.is_closed() {
                "Closed".to_string()
            } else {
                group.label.to_string()
            },
        })
        .collect()
}

pub fn build_cards(records: &[VotingRecord]) -> Vec<LocationCard> {
    records.iter().map(LocationCard::from_record).collect()
}

pub fn count_label(count: usize) -> String {
    if count == 1 {
        format!("Found {} location", count)
    } else {
        format!("Found {} locations", count)
    }
}

/// Marker changes needed to go from the previous result to a new one
///
/// Only cards with a coordinate get a marker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerDiff {
    pub add: Vec<String>,
    pub remove: Vec<String>,
    pub keep: Vec<String>,
}

impl MarkerDiff {
    pub fn between(previous_ids: &[String], cards: &[LocationCard]) -> Self {
        let previous: HashSet<&str> = previous_ids.iter().map(String::as_str).collect();
        let placed: Vec<&str> = cards
            .iter()
            .filter(|c| c.coordinate.is_some())
            .map(|c| c.id.as_str())
            .collect();
        let current: HashSet<&str> = placed.iter().copied().collect();

        let (keep, add): (Vec<&str>, Vec<&str>) =
            placed.into_iter().partition(|id| previous.contains(id));

        let remove = previous_ids
            .iter()
            .filter(|id| !current.contains(id.as_str()))
            .cloned()
            .collect();

        Self {
            add: add.into_iter().map(str::to_string).collect(),
            remove,
            keep: keep.into_iter().map(str::to_string).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, RecordFields};
    use base64::{engine::general_purpose::STANDARD, Engine as _};

    fn create_site(id: &str, placed: bool) -> VotingRecord {
        VotingRecord {
            id: id.to_string(),
            created_time: None,
            fields: RecordFields {
                category: Category::from("Early Voting Site".to_string()),
                cs_open_hours: Some("none,9am-5pm,9am-5pm,9am-5pm,9am-5pm,9am-5pm,10am-2pm".to_string()),
                geocode_cache: placed.then(|| STANDARD.encode(r#"{"o":{"lat":40.7,"lng":-74.0}}"#)),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_site_card() {
        let card = LocationCard::from_record(&create_site("rec1", true));

        assert_eq!(card.name, "No name provided");
        assert_eq!(card.address, "No address provided");
        assert_eq!(card.kind.marker_color(), "green");
        assert_eq!(card.coordinate, Some(Coordinate::new(40.7, -74.0)));

        let Schedule::OpenHours { lines } = card.schedule else {
            panic!("expected open hours");
        };
        assert_eq!(
            lines,
            vec![
                HoursLine { days: "Sunday".into(), hours: "Closed".into() },
                HoursLine { days: "Monday - Friday".into(), hours: "9:00am - 5:00pm".into() },
                HoursLine { days: "Saturday".into(), hours: "10:00am - 2:00pm".into() },
            ]
        );
    }

    #[test]
    fn test_undated_event_card() {
        let mut record = create_site("rec2", false);
        record.fields.category = Category::CommunityEvent;

        let card = LocationCard::from_record(&record);
        assert_eq!(card.badge, "Community Voting Event");
        assert_eq!(card.schedule, Schedule::Unscheduled);
        assert!(card.coordinate.is_none());
    }

    #[test]
    fn test_count_label() {
        assert_eq!(count_label(1), "Found 1 location");
        assert_eq!(count_label(0), "Found 0 locations");
        assert_eq!(count_label(12), "Found 12 locations");
    }

    #[test]
    fn test_marker_diff() {
        let cards = build_cards(&[create_site("a", true), create_site("b", true), create_site("c", false)]);
        let previous = vec!["b".to_string(), "z".to_string()];

        let diff = MarkerDiff::between(&previous, &cards);
        assert_eq!(diff.add, vec!["a"]);
        assert_eq!(diff.keep, vec!["b"]);
        assert_eq!(diff.remove, vec!["z"]);
    }
}
