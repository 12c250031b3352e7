//! Configuration for a [`crate::MesoDb`] instance.

use crate::error::MesoDbError;
use crate::utils::get_cache_dir;
use bon::Builder;
use chrono::{DateTime, Utc};
use std::path::PathBuf;

/// Source of "now". Realtime classification and request validation go through it.
pub type Clock = fn() -> DateTime<Utc>;

pub const DEFAULT_API_BASE_URL: &str = "https://api.synopticdata.com/v2";
pub const DEFAULT_VARIABLE: &str = "fuel_moisture";
pub const DEFAULT_COUNTRY: &str = "us";
/// Partitions younger than this many minutes are kept provisional.
pub const DEFAULT_REALTIME_MINUTES: i64 = 120;

/// Settings for the cache and the upstream API.
///
/// # Examples
///
/// ```
/// use mesodb::MesoDbConfig;
/// use std::path::PathBuf;
///
/// let config = MesoDbConfig::builder()
///     .cache_folder(PathBuf::from("/tmp/mesodb"))
///     .realtime_minutes(60)
///     .variable("fuel_moisture")
///     .build();
/// assert_eq!(config.realtime_minutes, 60);
/// assert_eq!(config.default_country, "us");
/// ```
#[derive(Debug, Clone, Builder)]
pub struct MesoDbConfig {
    /// Root of the on-disk cache. Created if missing.
    pub cache_folder: PathBuf,
    #[builder(default = DEFAULT_REALTIME_MINUTES)]
    pub realtime_minutes: i64,
    #[builder(into, default = DEFAULT_API_BASE_URL.to_string())]
    pub api_base_url: String,
    /// Upstream variable requested on every fetch.
    #[builder(into, default = DEFAULT_VARIABLE.to_string())]
    pub variable: String,
    /// Country fetched when a request carries no location filter.
    #[builder(into, default = DEFAULT_COUNTRY.to_string())]
    pub default_country: String,
    #[builder(default = Utc::now as Clock)]
    pub clock: Clock,
}

impl MesoDbConfig {
    pub fn with_cache_folder(cache_folder: PathBuf) -> Self {
        Self::builder().cache_folder(cache_folder).build()
    }

    /// Uses the platform cache directory (e.g. `~/.cache/mesodb` on Linux).
    pub fn from_default_dir() -> Result<Self, MesoDbError> {
        let cache_folder = get_cache_dir().map_err(MesoDbError::CacheDirResolution)?;
        Ok(Self::with_cache_folder(cache_folder))
    }
}
