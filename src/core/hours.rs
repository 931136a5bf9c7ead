use serde::{Serialize, Serializer};
use std::fmt;

pub const DAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

/// Label value the data uses for a closed day
pub const CLOSED_LABEL: &str = "none";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Meridiem {
    Am,
    Pm,
}

impl fmt::Display for Meridiem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Meridiem::Am => f.write_str("am"),
            Meridiem::Pm => f.write_str("pm"),
        }
    }
}

/// One side of an hours range
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HoursToken {
    Time {
        hour: String,
        minute: String,
        meridiem: Meridiem,
    },
    /// Token that did not look like `9am` / `9:30pm`, kept verbatim
    Unparsed(String),
}

impl HoursToken {
    /// Parse `digits{1,2}[:digits{2}](am|pm)`; anything else is kept as-is
    pub fn parse(token: &str) -> Self {
        Self::parse_time(token).unwrap_or_else(|| HoursToken::Unparsed(token.to_string()))
    }

    fn parse_time(token: &str) -> Option<Self> {
        let (clock, meridiem) = if let Some(clock) = token.strip_suffix("am") {
            (clock, Meridiem::Am)
        } else if let Some(clock) = token.strip_suffix("pm") {
            (clock, Meridiem::Pm)
        } else {
            return None;
        };

        let (hour, minute) = match clock.split_once(':') {
            Some((hour, minute)) => (hour, Some(minute)),
            None => (clock, None),
        };

        let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if hour.is_empty() || hour.len() > 2 || !all_digits(hour) {
            return None;
        }
        if let Some(minute) = minute {
            if minute.len() != 2 || !all_digits(minute) {
                return None;
            }
        }

        Some(HoursToken::Time {
            hour: hour.to_string(),
            minute: minute.unwrap_or("00").to_string(),
            meridiem,
        })
    }

    pub fn is_parsed(&self) -> bool {
        matches!(self, HoursToken::Time { .. })
    }
}

impl fmt::Display for HoursToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HoursToken::Time {
                hour,
                minute,
                meridiem,
            } => write!(f, "{}:{}{}", hour, minute, meridiem),
            HoursToken::Unparsed(raw) => f.write_str(raw),
        }
    }
}

/// Normalized hours of a single day, e.g. `9:00am - 5:30pm`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HoursLabel {
    tokens: Vec<HoursToken>,
}

impl HoursLabel {
    /// Lowercase, drop whitespace, and normalize each `-` separated time
    pub fn normalize(entry: &str) -> Self {
        let compact: String = entry
            .to_lowercase()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();

        Self {
            tokens: compact.split('-').map(HoursToken::parse).collect(),
        }
    }

    pub fn tokens(&self) -> &[HoursToken] {
        &self.tokens
    }

    pub fn is_fully_parsed(&self) -> bool {
        self.tokens.iter().all(HoursToken::is_parsed)
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.tokens.as_slice(), [HoursToken::Unparsed(raw)] if raw == CLOSED_LABEL)
    }
}

impl fmt::Display for HoursLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, token) in self.tokens.iter().enumerate() {
            if i > 0 {
                f.write_str(" - ")?;
            }
            write!(f, "{}", token)?;
        }
        Ok(())
    }
}

impl Serialize for HoursLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Days sharing one hours label
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayHours {
    pub label: HoursLabel,
    pub days: Vec<String>,
}

/// Weekly hours grouped by label, in first-seen label order
///
/// Every weekday appears in exactly one group.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DayHoursGroup {
    groups: Vec<DayHours>,
}

impl DayHoursGroup {
    pub fn iter(&self) -> impl Iterator<Item = &DayHours> {
        self.groups.iter()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Day list for a label, matched on its display form
    pub fn days_for(&self, label: &str) -> Option<&[String]> {
        self.groups
            .iter()
            .find(|g| g.label.to_string() == label)
            .map(|g| g.days.as_slice())
    }
}

impl IntoIterator for DayHoursGroup {
    type Item = DayHours;
    type IntoIter = std::vec::IntoIter<DayHours>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.into_iter()
    }
}

/// Sorted, distinct day indices forming a run of at least three days
fn is_consecutive_run(days: &[usize]) -> bool {
    match (days.first(), days.last()) {
        (Some(first), Some(last)) if days.len() > 2 => last - first + 1 == days.len(),
        _ => false,
    }
}

/// Group a comma-separated weekly hours string (Sunday first) by identical hours
pub fn group_by_day(hours_csv: &str) -> DayHoursGroup {
    let mut entries: Vec<&str> = hours_csv.split(',').collect();
    if entries.len() > DAY_NAMES.len() {
        tracing::warn!(
            "Hours string has {} entries, ignoring everything after the seventh",
            entries.len()
        );
        entries.truncate(DAY_NAMES.len());
    }
    entries.resize(DAY_NAMES.len(), "");

    let mut by_label: Vec<(HoursLabel, Vec<usize>)> = Vec::new();
    for (day, entry) in entries.iter().enumerate() {
        let label = HoursLabel::normalize(entry);
        if !label.is_fully_parsed() {
            tracing::trace!("Keeping unparsed hours for {}: {}", DAY_NAMES[day], label);
        }
        match by_label.iter_mut().find(|(existing, _)| *existing == label) {
            Some((_, days)) => days.push(day),
            None => by_label.push((label, vec![day])),
        }
    }

    let groups = by_label
        .into_iter()
        .map(|(label, days)| {
            let days = if is_consecutive_run(&days) {
                vec![format!(
                    "{} - {}",
                    DAY_NAMES[days[0]],
                    DAY_NAMES[days[days.len() - 1]]
                )]
            } else {
                days.iter().map(|&d| DAY_NAMES[d].to_string()).collect()
            };
            DayHours { label, days }
        })
        .collect();

    DayHoursGroup { groups }
}
