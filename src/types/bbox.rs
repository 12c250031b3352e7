//! Bounding box validation and normalization.

use rstar::AABB;

/// A normalized latitude/longitude box. Membership is inclusive on every edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

impl BoundingBox {
    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        (self.lat_min..=self.lat_max).contains(&latitude)
            && (self.lon_min..=self.lon_max).contains(&longitude)
    }

    /// The box as an `rstar` envelope in `[latitude, longitude]` space.
    pub fn envelope(&self) -> AABB<[f64; 2]> {
        AABB::from_corners([self.lat_min, self.lon_min], [self.lat_max, self.lon_max])
    }

    /// Upstream `bbox` parameter: `lon_min,lat_min,lon_max,lat_max`.
    pub fn to_query_value(&self) -> String {
        format!(
            "{},{},{},{}",
            self.lon_min, self.lat_min, self.lon_max, self.lat_max
        )
    }
}

fn valid_latitude(value: f64) -> bool {
    -90.0 < value && value < 90.0
}

fn valid_longitude(value: f64) -> bool {
    -180.0 < value && value < 180.0
}

fn ordered(a: f64, b: f64) -> (f64, f64) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Validates four optional corner coordinates and returns a normalized box.
///
/// All four values must be present and lie strictly inside (-90, 90) for latitudes
/// and (-180, 180) for longitudes. Anything else yields `None`, meaning "no spatial
/// filter"; this never fails. The pairs are reordered so that min <= max.
///
/// # Examples
///
/// ```
/// use mesodb::check_coords;
///
/// let bbox = check_coords(Some(42.5), Some(32.0), Some(-112.0), Some(-125.0)).unwrap();
/// assert_eq!((bbox.lat_min, bbox.lat_max), (32.0, 42.5));
/// assert_eq!((bbox.lon_min, bbox.lon_max), (-125.0, -112.0));
///
/// assert!(check_coords(Some(32.0), None, Some(-125.0), Some(-112.0)).is_none());
/// ```
pub fn check_coords(
    latitude1: Option<f64>,
    latitude2: Option<f64>,
    longitude1: Option<f64>,
    longitude2: Option<f64>,
) -> Option<BoundingBox> {
    let (Some(lat1), Some(lat2), Some(lon1), Some(lon2)) =
        (latitude1, latitude2, longitude1, longitude2)
    else {
        return None;
    };
    if !(valid_latitude(lat1)
        && valid_latitude(lat2)
        && valid_longitude(lon1)
        && valid_longitude(lon2))
    {
        return None;
    }
    let (lat_min, lat_max) = ordered(lat1, lat2);
    let (lon_min, lon_max) = ordered(lon1, lon2);
    Some(BoundingBox {
        lat_min,
        lat_max,
        lon_min,
        lon_max,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swapped_pairs_are_reordered() {
        let cases = [
            (40.0, 30.0, -100.0, -120.0),
            (30.0, 40.0, -120.0, -100.0),
            (40.0, 30.0, -120.0, -100.0),
            (30.0, 40.0, -100.0, -120.0),
        ];
        for (lat1, lat2, lon1, lon2) in cases {
            let bbox = check_coords(Some(lat1), Some(lat2), Some(lon1), Some(lon2))
                .expect("valid coordinates");
            assert!(bbox.lat_min <= bbox.lat_max);
            assert!(bbox.lon_min <= bbox.lon_max);
            assert_eq!((bbox.lat_min, bbox.lat_max), (30.0, 40.0));
            assert_eq!((bbox.lon_min, bbox.lon_max), (-120.0, -100.0));
        }
    }

    #[test]
    fn test_missing_or_out_of_range_means_no_filter() {
        assert!(check_coords(None, None, None, None).is_none());
        assert!(check_coords(Some(10.0), Some(20.0), Some(10.0), None).is_none());
        // Bounds are exclusive.
        assert!(check_coords(Some(90.0), Some(20.0), Some(10.0), Some(20.0)).is_none());
        assert!(check_coords(Some(10.0), Some(-90.0), Some(10.0), Some(20.0)).is_none());
        assert!(check_coords(Some(10.0), Some(20.0), Some(180.0), Some(20.0)).is_none());
        assert!(check_coords(Some(10.0), Some(20.0), Some(10.0), Some(-180.5)).is_none());
        assert!(check_coords(Some(f64::NAN), Some(20.0), Some(10.0), Some(20.0)).is_none());
    }

    #[test]
    fn test_contains_is_inclusive() {
        let bbox = check_coords(Some(32.0), Some(42.5), Some(-125.0), Some(-112.0)).unwrap();
        assert!(bbox.contains(32.0, -125.0));
        assert!(bbox.contains(42.5, -112.0));
        assert!(bbox.contains(37.0, -120.0));
        assert!(!bbox.contains(31.999, -120.0));
        assert!(!bbox.contains(37.0, -111.999));
    }

    #[test]
    fn test_query_value_is_lon_lat_order() {
        let bbox = check_coords(Some(32.0), Some(42.5), Some(-125.0), Some(-112.0)).unwrap();
        assert_eq!(bbox.to_query_value(), "-125,32,-112,42.5");
    }
}
