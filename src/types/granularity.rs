//! Planning granularity of the cache fill.

use crate::partition::time::{floor_day, floor_hour};
use chrono::{DateTime, Duration, Utc};
use std::fmt;

/// The unit a fill segment is walked in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Granularity {
    /// One fetch per missing UTC hour.
    Hourly,
    /// One fetch per empty UTC day; partially filled days fall back to hourly.
    Daily,
}

impl Granularity {
    pub fn unit(&self) -> Duration {
        match self {
            Granularity::Hourly => Duration::hours(1),
            Granularity::Daily => Duration::days(1),
        }
    }

    /// Aligns `ts` to the start of its unit.
    pub fn floor(&self, ts: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Granularity::Hourly => floor_hour(ts),
            Granularity::Daily => floor_day(ts),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Granularity::Hourly => "hourly",
            Granularity::Daily => "daily",
        }
    }
}

/// # Examples
///
/// ```
/// use mesodb::Granularity;
///
/// assert_eq!(Granularity::Hourly.to_string(), "hourly");
/// assert_eq!(format!("{}", Granularity::Daily), "daily");
/// ```
impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}
