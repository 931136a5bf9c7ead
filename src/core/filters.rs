use crate::models::{CategorySelector, DateRange, VotingRecord};

/// Borough stage: exact, case-sensitive match
#[inline]
pub fn matches_borough(record: &VotingRecord, borough: &str) -> bool {
    record.fields.borough.as_deref() == Some(borough)
}

/// Category stage
#[inline]
pub fn matches_category(record: &VotingRecord, selector: CategorySelector) -> bool {
    match selector {
        CategorySelector::All => true,
        CategorySelector::Dedicated => !record.is_community_event(),
        CategorySelector::Event => record.is_community_event(),
    }
}

/// Date stage
///
/// Standing sites always pass. Events pass when the UTC day of their start
/// falls inside the range; an event without a start time never does.
#[inline]
pub fn matches_date_range(record: &VotingRecord, range: &DateRange) -> bool {
    if !record.is_community_event() {
        return true;
    }

    match record.fields.starts_at {
        Some(starts_at) => range.contains(starts_at.date_naive()),
        None => false,
    }
}

/// Zip proximity key: absolute difference, a missing zip counts as 0
#[inline]
pub fn zip_distance(record: &VotingRecord, target: i64) -> u64 {
    target.abs_diff(record.fields.zip_code.unwrap_or(0))
}
