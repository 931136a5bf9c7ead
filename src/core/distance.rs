use thiserror::Error;

/// Sphere radius used for proximity ranking, in kilometers
const EARTH_RADIUS_KM: f64 = 6378.0;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DistanceError {
    #[error("missing coordinate(s): {}", .0.join(", "))]
    MissingCoordinate(Vec<&'static str>),
}

/// Great-circle distance between two points in kilometers
///
/// Angles are taken as radians exactly as passed; converting decimal degrees
/// is the caller's job. An absent (or NaN) argument is rejected before any
/// trigonometry runs.
///
/// # Arguments
/// * `lng1` - Longitude of first point
/// * `lat1` - Latitude of first point
/// * `lng2` - Longitude of second point
/// * `lat2` - Latitude of second point
pub fn distance(
    lng1: Option<f64>,
    lat1: Option<f64>,
    lng2: Option<f64>,
    lat2: Option<f64>,
) -> Result<f64, DistanceError> {
    let missing: Vec<&'static str> = [("lng1", lng1), ("lat1", lat1), ("lng2", lng2), ("lat2", lat2)]
        .into_iter()
        .filter(|(_, v)| !matches!(v, Some(x) if !x.is_nan()))
        .map(|(name, _)| name)
        .collect();

    match (lng1, lat1, lng2, lat2) {
        (Some(lng1), Some(lat1), Some(lng2), Some(lat2)) if missing.is_empty() => {
            Ok(spherical_distance(lng1, lat1, lng2, lat2))
        }
        _ => {
            tracing::error!("Undefined input(s): {}", missing.join(", "));
            Err(DistanceError::MissingCoordinate(missing))
        }
    }
}

#[inline]
fn spherical_distance(lng1: f64, lat1: f64, lng2: f64, lat2: f64) -> f64 {
    let delta_lng = lng2 - lng1;
    let delta_lat = lat2 - lat1;

    let num = 1.0 - delta_lat.cos() + lat1.cos() * lat2.cos() * (1.0 - delta_lng.cos());
    // Rounding can push the ratio a hair outside [0, 1]
    let half_chord = (num / 2.0).clamp(0.0, 1.0).sqrt();

    2.0 * half_chord.asin() * EARTH_RADIUS_KM
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_to_self_is_zero() {
        let d = distance(Some(-1.2916), Some(0.7105), Some(-1.2916), Some(0.7105)).unwrap();
        assert!(d.abs() < 1e-9);
    }

    #[test]
    fn test_distance_london_to_paris() {
        let london = (-0.1278_f64.to_radians(), 51.5074_f64.to_radians());
        let paris = (2.3522_f64.to_radians(), 48.8566_f64.to_radians());

        let d = distance(Some(london.0), Some(london.1), Some(paris.0), Some(paris.1)).unwrap();
        assert!((d - 344.0).abs() < 10.0, "Distance should be ~344km, got {}", d);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let a = distance(Some(-74.0), Some(40.7), Some(-73.9), Some(40.8)).unwrap();
        let b = distance(Some(-73.9), Some(40.8), Some(-74.0), Some(40.7)).unwrap();
        assert!((a - b).abs() < 1e-9);
    }

    #[test]
    fn test_missing_coordinate_is_rejected() {
        let err = distance(Some(1.0), None, Some(1.0), None).unwrap_err();
        assert_eq!(err, DistanceError::MissingCoordinate(vec!["lat1", "lat2"]));
        assert_eq!(err.to_string(), "missing coordinate(s): lat1, lat2");
    }

    #[test]
    fn test_nan_is_rejected() {
        assert!(distance(Some(f64::NAN), Some(0.0), Some(0.0), Some(0.0)).is_err());
    }
}
