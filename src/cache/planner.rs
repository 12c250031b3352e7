//! Decides which parts of a span still need fetching, and fetches them.
//!
//! A span is cut into at most three segments: a leading hourly piece up to the first
//! midnight, a run of whole UTC days, and a trailing hourly piece after the last
//! midnight. Each segment is then walked one aligned unit at a time.

use crate::cache::error::CacheError;
use crate::cache::writer::CacheWriter;
use crate::fetch::api::TimeseriesApi;
use crate::fetch::fetcher::Fetcher;
use crate::partition::locator::{DayState, PartitionLocator};
use crate::partition::time::{days_between, hours_between, min_span, next_midnight};
use crate::types::granularity::Granularity;
use crate::types::location_filter::LocationFilter;
use chrono::{DateTime, Utc};
use log::{debug, info};
use std::ops::AddAssign;

/// A piece of a fill span, walked in units of `granularity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub granularity: Granularity,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Segment {
    fn hourly(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            granularity: Granularity::Hourly,
            start,
            end,
        }
    }

    fn daily(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            granularity: Granularity::Daily,
            start,
            end,
        }
    }
}

/// Splits `[start, end)` into hourly and daily segments.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use mesodb::{plan_segments, Granularity};
///
/// let start = Utc.with_ymd_and_hms(2021, 6, 1, 18, 0, 0).unwrap();
/// let end = Utc.with_ymd_and_hms(2021, 6, 4, 6, 0, 0).unwrap();
/// let kinds: Vec<_> = plan_segments(start, end).iter().map(|s| s.granularity).collect();
/// assert_eq!(kinds, [Granularity::Hourly, Granularity::Daily, Granularity::Hourly]);
/// ```
pub fn plan_segments(start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<Segment> {
    if end <= start {
        return Vec::new();
    }
    let first_midnight = next_midnight(start);
    if end < first_midnight {
        return vec![Segment::hourly(start, end)];
    }

    let mut segments = Vec::with_capacity(3);
    let days_start = if Granularity::Daily.floor(start) == start {
        start
    } else {
        segments.push(Segment::hourly(start, first_midnight));
        first_midnight
    };
    let days_end = Granularity::Daily.floor(end);
    if days_end - days_start > min_span() {
        segments.push(Segment::daily(days_start, days_end));
    }
    if end - days_end > min_span() {
        segments.push(Segment::hourly(days_end, end));
    }
    segments
}

/// Counters for one fill.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FillReport {
    /// Successful upstream fetches.
    pub fetches: usize,
    /// Hours skipped because a final partition already existed.
    pub skipped_hours: usize,
    /// Whole days skipped because all 24 hours were final.
    pub skipped_days: usize,
}

impl AddAssign for FillReport {
    fn add_assign(&mut self, other: Self) {
        self.fetches += other.fetches;
        self.skipped_hours += other.skipped_hours;
        self.skipped_days += other.skipped_days;
    }
}

pub struct FillPlanner<'a, A> {
    fetcher: &'a Fetcher<A>,
    locator: &'a PartitionLocator,
    filter: &'a LocationFilter,
}

impl<'a, A: TimeseriesApi> FillPlanner<'a, A> {
    pub fn new(
        fetcher: &'a Fetcher<A>,
        locator: &'a PartitionLocator,
        filter: &'a LocationFilter,
    ) -> Self {
        Self {
            fetcher,
            locator,
            filter,
        }
    }

    /// Makes sure every hour intersecting `[start, end)` has a final partition, or at
    /// least a provisional one if it is still realtime.
    ///
    /// Stops at the first failed fetch. Whatever was written before stays cached.
    pub async fn fill(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<FillReport, CacheError> {
        info!("Filling cache from {} to {} ({})", start, end, self.filter);
        let mut report = FillReport::default();
        for segment in plan_segments(start, end) {
            debug!(
                "Walking {} segment {} to {}",
                segment.granularity, segment.start, segment.end
            );
            report += match segment.granularity {
                Granularity::Hourly => self.fill_hours(segment.start, segment.end).await?,
                Granularity::Daily => self.fill_days(segment.start, segment.end).await?,
            };
        }
        info!(
            "Fill done: {} fetches, {} hours and {} days already cached",
            report.fetches, report.skipped_hours, report.skipped_days
        );
        Ok(report)
    }

    async fn fill_hours(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<FillReport, CacheError> {
        let mut report = FillReport::default();
        for hour in hours_between(start, end) {
            if self.locator.partition_exists(hour).await {
                debug!("{} already cached", self.locator.final_path(hour).display());
                report.skipped_hours += 1;
                continue;
            }
            let unit_end = hour + Granularity::Hourly.unit();
            self.fetch_and_write(hour, unit_end).await?;
            report.fetches += 1;
        }
        Ok(report)
    }

    async fn fill_days(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<FillReport, CacheError> {
        let mut report = FillReport::default();
        for day in days_between(start, end) {
            let day_end = day + Granularity::Daily.unit();
            match self.locator.day_state(day).await {
                DayState::Empty => {
                    self.fetch_and_write(day, day_end).await?;
                    report.fetches += 1;
                }
                DayState::Partial(present) => {
                    debug!(
                        "{} has {} of 24 hours cached, filling hourly",
                        self.locator.julian_path(day).display(),
                        present
                    );
                    report += self.fill_hours(day, day_end).await?;
                }
                DayState::Complete => {
                    debug!(
                        "{} is a complete day",
                        self.locator.julian_path(day).display()
                    );
                    report.skipped_days += 1;
                }
            }
        }
        Ok(report)
    }

    async fn fetch_and_write(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<(), CacheError> {
        let batch = self.fetcher.fetch(start, end, self.filter).await?;
        CacheWriter::new(self.locator).write(batch, start, end).await?;
        Ok(())
    }
}
