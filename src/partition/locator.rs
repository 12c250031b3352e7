//! Maps UTC timestamps to hour partitions on disk.
//!
//! A partition lives at `<root>/<YYYY>/<DDD>/<YYYY><DDD><HH>.parquet` once it is final.
//! Realtime data for the same hour goes to the `_tmp` sibling, which readers only use
//! when no final file exists.

use crate::cache::error::CacheError;
use crate::config::Clock;
use crate::partition::time::floor_day;
use crate::utils::file_exists;
use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use std::fmt;
use std::path::{Path, PathBuf};

const PARTITION_EXTENSION: &str = "parquet";
const PROVISIONAL_SUFFIX: &str = "_tmp";
const HOURS_PER_DAY: usize = 24;

/// Storage key of one UTC hour: calendar year, day of year (1-366) and hour (0-23).
///
/// Any two timestamps within the same UTC hour produce the same key.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use mesodb::PartitionKey;
///
/// let key = PartitionKey::from(Utc.with_ymd_and_hms(2021, 6, 1, 5, 42, 0).unwrap());
/// assert_eq!((key.year, key.day_of_year, key.hour), (2021, 152, 5));
/// assert_eq!(key.file_stem(), "202115205");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartitionKey {
    pub year: i32,
    pub day_of_year: u32,
    pub hour: u32,
}

impl PartitionKey {
    pub fn file_stem(&self) -> String {
        format!("{:04}{:03}{:02}", self.year, self.day_of_year, self.hour)
    }

    fn day_dir(&self) -> PathBuf {
        Path::new(&format!("{:04}", self.year)).join(format!("{:03}", self.day_of_year))
    }
}

impl From<DateTime<Utc>> for PartitionKey {
    fn from(ts: DateTime<Utc>) -> Self {
        Self {
            year: ts.year(),
            day_of_year: ts.ordinal(),
            hour: ts.hour(),
        }
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.file_stem())
    }
}

/// How many final hour partitions a UTC day already has.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayState {
    /// No final partition for any hour of the day.
    Empty,
    /// Some, but not all, of the 24 hours are final. Holds the count.
    Partial(usize),
    /// All 24 hours are final.
    Complete,
}

#[derive(Debug, Clone)]
pub struct PartitionLocator {
    root: PathBuf,
    realtime_length: Duration,
    clock: Clock,
}

impl PartitionLocator {
    pub fn new(root: &Path, realtime_minutes: i64, clock: Clock) -> Self {
        Self {
            root: root.to_path_buf(),
            realtime_length: Duration::minutes(realtime_minutes),
            clock,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The current time according to the configured clock.
    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    /// Directory holding every partition of the UTC day containing `ts`.
    pub fn julian_path(&self, ts: DateTime<Utc>) -> PathBuf {
        self.root.join(PartitionKey::from(ts).day_dir())
    }

    pub fn final_path(&self, ts: DateTime<Utc>) -> PathBuf {
        let key = PartitionKey::from(ts);
        self.root
            .join(key.day_dir())
            .join(format!("{}.{}", key.file_stem(), PARTITION_EXTENSION))
    }

    pub fn provisional_path(&self, ts: DateTime<Utc>) -> PathBuf {
        let key = PartitionKey::from(ts);
        self.root.join(key.day_dir()).join(format!(
            "{}{}.{}",
            key.file_stem(),
            PROVISIONAL_SUFFIX,
            PARTITION_EXTENSION
        ))
    }

    /// True if the final file for the hour containing `ts` is present.
    pub async fn partition_exists(&self, ts: DateTime<Utc>) -> bool {
        file_exists(&self.final_path(ts)).await
    }

    /// True if a provisional file for the hour containing `ts` is present,
    /// regardless of whether a final one exists too.
    pub async fn is_provisional_present(&self, ts: DateTime<Utc>) -> bool {
        file_exists(&self.provisional_path(ts)).await
    }

    /// Whether data for `ts` may still change upstream.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::FutureTimestamp`] if `ts` is after the current time.
    pub fn is_realtime(&self, ts: DateTime<Utc>) -> Result<bool, CacheError> {
        let now = self.now();
        if now < ts {
            return Err(CacheError::FutureTimestamp { timestamp: ts, now });
        }
        Ok(now - ts <= self.realtime_length)
    }

    pub async fn day_state(&self, ts: DateTime<Utc>) -> DayState {
        let day = floor_day(ts);
        let mut present = 0;
        for hour in 0..HOURS_PER_DAY as i64 {
            if self.partition_exists(day + Duration::hours(hour)).await {
                present += 1;
            }
        }
        match present {
            0 => DayState::Empty,
            HOURS_PER_DAY => DayState::Complete,
            n => DayState::Partial(n),
        }
    }
}
