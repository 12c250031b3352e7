use crate::error::MesoDbError;
use crate::partition::time::{min_span, MIN_SPAN_SECONDS};
use crate::types::bbox::{check_coords, BoundingBox};
use crate::types::location_filter::LocationFilter;
use bon::Builder;
use chrono::{DateTime, Utc};

/// One read or fill request against the cache.
///
/// Build it with [`QueryParams::builder`]. Spatial arguments that do not form a valid
/// bounding box are ignored rather than rejected.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use mesodb::{LocationFilter, QueryParams};
///
/// let params = QueryParams::builder()
///     .start_time(Utc.with_ymd_and_hms(2021, 6, 1, 5, 0, 0).unwrap())
///     .end_time(Utc.with_ymd_and_hms(2021, 6, 1, 7, 0, 0).unwrap())
///     .state("CA")
///     .build();
/// assert_eq!(params.location_filter(), LocationFilter::State("CA".to_string()));
/// assert!(!params.make_file);
/// ```
#[derive(Debug, Clone, PartialEq, Builder)]
pub struct QueryParams {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[builder(into)]
    pub country: Option<String>,
    #[builder(into)]
    pub state: Option<String>,
    pub latitude1: Option<f64>,
    pub latitude2: Option<f64>,
    pub longitude1: Option<f64>,
    pub longitude2: Option<f64>,
    /// Also write the result to a CSV file in the cache folder.
    #[builder(default)]
    pub make_file: bool,
}

impl QueryParams {
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        check_coords(
            self.latitude1,
            self.latitude2,
            self.longitude1,
            self.longitude2,
        )
    }

    pub fn location_filter(&self) -> LocationFilter {
        LocationFilter::resolve(
            self.country.as_deref(),
            self.state.as_deref(),
            self.bounding_box(),
        )
    }

    /// Filter the cache is filled with: the requested country, or none at all.
    ///
    /// Partitions hold every station of an hour, so state and bounding-box filters are
    /// only applied when reading.
    pub fn fill_filter(&self) -> LocationFilter {
        match self.location_filter() {
            country @ LocationFilter::Country(_) => country,
            _ => LocationFilter::None,
        }
    }

    /// Rejects ranges that are too short or reach past `now`.
    ///
    /// # Errors
    ///
    /// [`MesoDbError::InvalidRange`] if the span is at most one minute,
    /// [`MesoDbError::FutureRequest`] if either end lies after `now`.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), MesoDbError> {
        if self.end_time - self.start_time <= min_span() {
            return Err(MesoDbError::InvalidRange {
                start: self.start_time,
                end: self.end_time,
                min_seconds: MIN_SPAN_SECONDS,
            });
        }
        for time in [self.start_time, self.end_time] {
            if time > now {
                return Err(MesoDbError::FutureRequest { time, now });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 6, 2, 1, 0, 0).unwrap()
    }

    fn params(start: DateTime<Utc>, end: DateTime<Utc>) -> QueryParams {
        QueryParams::builder().start_time(start).end_time(end).build()
    }

    #[test]
    fn test_range_must_exceed_one_minute() {
        let start = now() - Duration::hours(2);
        let err = params(start, start + Duration::seconds(60)).validate(now());
        assert!(matches!(err, Err(MesoDbError::InvalidRange { .. })));
        let err = params(start, start - Duration::hours(1)).validate(now());
        assert!(matches!(err, Err(MesoDbError::InvalidRange { .. })));
        assert!(params(start, start + Duration::seconds(61))
            .validate(now())
            .is_ok());
    }

    #[test]
    fn test_future_end_is_rejected() {
        let start = now() - Duration::hours(1);
        let err = params(start, now() + Duration::minutes(5)).validate(now());
        assert!(matches!(
            err,
            Err(MesoDbError::FutureRequest { time, .. }) if time == now() + Duration::minutes(5)
        ));
    }

    #[test]
    fn test_future_start_is_rejected() {
        let start = now() + Duration::hours(1);
        let err = params(start, start + Duration::hours(1)).validate(now());
        assert!(matches!(
            err,
            Err(MesoDbError::FutureRequest { time, .. }) if time == start
        ));
    }

    #[test]
    fn test_invalid_coords_mean_no_filter() {
        let p = QueryParams::builder()
            .start_time(now() - Duration::hours(3))
            .end_time(now())
            .latitude1(95.0)
            .latitude2(30.0)
            .longitude1(-120.0)
            .longitude2(-110.0)
            .build();
        assert!(p.bounding_box().is_none());
        assert_eq!(p.location_filter(), LocationFilter::None);
    }

    #[test]
    fn test_fill_filter_only_keeps_country() {
        let p = QueryParams::builder()
            .start_time(now() - Duration::hours(3))
            .end_time(now())
            .state("NV")
            .latitude1(35.0)
            .latitude2(42.0)
            .longitude1(-120.0)
            .longitude2(-114.0)
            .build();
        assert_eq!(p.location_filter(), LocationFilter::State("NV".to_string()));
        assert_eq!(p.fill_filter(), LocationFilter::None);

        let p = QueryParams {
            country: Some("us".to_string()),
            ..p
        };
        assert_eq!(p.fill_filter(), LocationFilter::Country("us".to_string()));
    }

    #[test]
    fn test_swapped_coords_become_a_box() {
        let p = QueryParams::builder()
            .start_time(now() - Duration::hours(3))
            .end_time(now())
            .latitude1(42.0)
            .latitude2(35.0)
            .longitude1(-114.0)
            .longitude2(-120.0)
            .build();
        let bbox = p.bounding_box().unwrap();
        assert_eq!((bbox.lat_min, bbox.lat_max), (35.0, 42.0));
        assert_eq!((bbox.lon_min, bbox.lon_max), (-120.0, -114.0));
    }
}
