//! UTC calendar arithmetic shared by the locator, the planner and the assembler.

use chrono::{DateTime, Duration, NaiveTime, Timelike, Utc};

/// Spans at or below this many seconds are too small to plan or fetch.
pub const MIN_SPAN_SECONDS: i64 = 60;

pub(crate) fn min_span() -> Duration {
    Duration::seconds(MIN_SPAN_SECONDS)
}

/// Truncates a timestamp to the start of its UTC hour.
pub fn floor_hour(ts: DateTime<Utc>) -> DateTime<Utc> {
    let date = ts.date_naive();
    let naive = date
        .and_hms_opt(ts.hour(), 0, 0)
        .unwrap_or_else(|| date.and_time(NaiveTime::MIN));
    DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc)
}

/// Truncates a timestamp to midnight of its UTC day.
pub fn floor_day(ts: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::<Utc>::from_naive_utc_and_offset(ts.date_naive().and_time(NaiveTime::MIN), Utc)
}

pub(crate) fn next_midnight(ts: DateTime<Utc>) -> DateTime<Utc> {
    floor_day(ts) + Duration::days(1)
}

/// Aligned hour starts `h` with `floor_hour(start) <= h < end`.
pub(crate) fn hours_between(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> impl Iterator<Item = DateTime<Utc>> {
    std::iter::successors(Some(floor_hour(start)), |h| Some(*h + Duration::hours(1)))
        .take_while(move |h| *h < end)
}

/// Aligned hour starts `h` with `floor_hour(start) <= h <= end`: every hour a closed
/// window touches.
pub(crate) fn hours_through(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> impl Iterator<Item = DateTime<Utc>> {
    std::iter::successors(Some(floor_hour(start)), |h| Some(*h + Duration::hours(1)))
        .take_while(move |h| *h <= end)
}

/// Aligned day starts `d` with `floor_day(start) <= d < end`.
pub(crate) fn days_between(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> impl Iterator<Item = DateTime<Utc>> {
    std::iter::successors(Some(floor_day(start)), |d| Some(*d + Duration::days(1)))
        .take_while(move |d| *d < end)
}

/// Formats a timestamp the way the upstream API expects (`YYYYmmddHHMM`), truncated to the hour.
pub fn meso_time(ts: DateTime<Utc>) -> String {
    floor_hour(ts).format("%Y%m%d%H%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_floor_hour_and_day() {
        let ts = Utc.with_ymd_and_hms(2021, 6, 1, 5, 23, 41).unwrap();
        assert_eq!(floor_hour(ts), Utc.with_ymd_and_hms(2021, 6, 1, 5, 0, 0).unwrap());
        assert_eq!(floor_day(ts), Utc.with_ymd_and_hms(2021, 6, 1, 0, 0, 0).unwrap());
        assert_eq!(
            next_midnight(ts),
            Utc.with_ymd_and_hms(2021, 6, 2, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_hours_between_is_half_open_and_aligned() {
        let start = Utc.with_ymd_and_hms(2021, 6, 1, 5, 30, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2021, 6, 1, 8, 0, 0).unwrap();
        let hours: Vec<_> = hours_between(start, end).map(|h| h.hour()).collect();
        assert_eq!(hours, vec![5, 6, 7]);

        let end = Utc.with_ymd_and_hms(2021, 6, 1, 8, 0, 1).unwrap();
        assert_eq!(hours_between(start, end).count(), 4);
    }

    #[test]
    fn test_hours_through_includes_end_hour() {
        let start = Utc.with_ymd_and_hms(2021, 6, 1, 5, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2021, 6, 1, 7, 0, 0).unwrap();
        let hours: Vec<_> = hours_through(start, end).map(|h| h.hour()).collect();
        assert_eq!(hours, vec![5, 6, 7]);
    }

    #[test]
    fn test_days_between_crosses_year_end() {
        let start = Utc.with_ymd_and_hms(2020, 12, 30, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2021, 1, 2, 0, 0, 0).unwrap();
        assert_eq!(days_between(start, end).count(), 3);
    }

    #[test]
    fn test_meso_time_drops_minutes() {
        let ts = Utc.with_ymd_and_hms(2021, 6, 1, 5, 23, 0).unwrap();
        assert_eq!(meso_time(ts), "202106010500");
    }
}
