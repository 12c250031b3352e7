use crate::fetch::error::FetchError;
use crate::stations::error::RegistryError;
use chrono::{DateTime, Utc};
use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Timestamp {timestamp} is after the current time {now}")]
    FutureTimestamp {
        timestamp: DateTime<Utc>,
        now: DateTime<Utc>,
    },

    #[error("Failed to create partition directory '{0}'")]
    DirCreation(PathBuf, #[source] std::io::Error),

    #[error("I/O error writing partition file '{0}'")]
    PartitionWriteIo(PathBuf, #[source] std::io::Error),
    #[error("Encoding error writing partition file '{0}'")]
    PartitionWritePolars(PathBuf, #[source] PolarsError),

    #[error("I/O error reading partition file '{0}'")]
    PartitionReadIo(PathBuf, #[source] std::io::Error),
    #[error("Decoding error reading partition file '{0}'")]
    PartitionReadPolars(PathBuf, #[source] PolarsError),

    #[error("Failed to delete provisional partition '{0}'")]
    ProvisionalDelete(PathBuf, #[source] std::io::Error),

    #[error("I/O error writing output file '{0}'")]
    OutputWriteIo(PathBuf, #[source] std::io::Error),
    #[error("Encoding error writing output file '{0}'")]
    OutputWritePolars(PathBuf, #[source] PolarsError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Failed processing DataFrame: {0}")]
    DataFrameProcessing(#[from] PolarsError),

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
