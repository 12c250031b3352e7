use crate::cache::error::CacheError;
use crate::fetch::error::FetchError;
use crate::stations::error::RegistryError;
use chrono::{DateTime, Utc};
use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MesoDbError {
    /// The upstream fetch failed. Distinct from an empty result.
    #[error(transparent)]
    Fetch(FetchError),

    #[error(transparent)]
    Registry(RegistryError),

    #[error(transparent)]
    Cache(CacheError),

    #[error("Failed to create cache directory '{0}'")]
    CacheDirCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to determine cache directory")]
    CacheDirResolution(#[source] std::io::Error),

    #[error("Failed to read token file '{0}'")]
    TokenRead(PathBuf, #[source] std::io::Error),

    #[error("Failed to write token file '{0}'")]
    TokenWrite(PathBuf, #[source] std::io::Error),

    #[error("No tokens were provided or found in '{0}'")]
    NoTokens(PathBuf),

    #[error("Invalid time range {start} to {end}: the interval must be longer than {min_seconds} seconds")]
    InvalidRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        min_seconds: i64,
    },

    #[error("Requested time {time} is in the future (now is {now})")]
    FutureRequest {
        time: DateTime<Utc>,
        now: DateTime<Utc>,
    },

    #[error("Failed processing DataFrame: {0}")]
    PolarsError(#[from] PolarsError),
}

impl From<FetchError> for MesoDbError {
    fn from(e: FetchError) -> Self {
        MesoDbError::Fetch(e)
    }
}

impl From<RegistryError> for MesoDbError {
    fn from(e: RegistryError) -> Self {
        MesoDbError::Registry(e)
    }
}

// Fetch and registry failures surface under their own variants, wherever they happened.
impl From<CacheError> for MesoDbError {
    fn from(e: CacheError) -> Self {
        match e {
            CacheError::Fetch(e) => MesoDbError::Fetch(e),
            CacheError::Registry(e) => MesoDbError::Registry(e),
            other => MesoDbError::Cache(other),
        }
    }
}
