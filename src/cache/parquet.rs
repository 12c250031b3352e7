//! Blocking polars I/O, run on the blocking pool.

use crate::cache::error::CacheError;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use tokio::{fs, task};

/// Writes `df` to `path` as Snappy-compressed parquet, creating parent directories.
pub(crate) async fn write_partition(mut df: DataFrame, path: &Path) -> Result<(), CacheError> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .await
            .map_err(|e| CacheError::DirCreation(dir.to_path_buf(), e))?;
    }
    let path_buf = path.to_path_buf();
    task::spawn_blocking(move || {
        let file = std::fs::File::create(&path_buf)
            .map_err(|e| CacheError::PartitionWriteIo(path_buf.clone(), e))?;
        ParquetWriter::new(file)
            .with_compression(ParquetCompression::Snappy)
            .finish(&mut df)
            .map_err(|e| CacheError::PartitionWritePolars(path_buf, e))?;
        Ok::<(), CacheError>(())
    })
    .await??;
    Ok(())
}

pub(crate) async fn read_partition(path: &Path) -> Result<DataFrame, CacheError> {
    let path_buf = path.to_path_buf();
    task::spawn_blocking(move || {
        let file = std::fs::File::open(&path_buf)
            .map_err(|e| CacheError::PartitionReadIo(path_buf.clone(), e))?;
        ParquetReader::new(file)
            .finish()
            .map_err(|e| CacheError::PartitionReadPolars(path_buf, e))
    })
    .await?
}

/// Removes a provisional file. A file that is already gone is not an error.
pub(crate) async fn remove_provisional(path: &Path) -> Result<bool, CacheError> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(CacheError::ProvisionalDelete(path.to_path_buf(), e)),
    }
}

pub(crate) async fn write_csv(mut df: DataFrame, path: PathBuf) -> Result<PathBuf, CacheError> {
    task::spawn_blocking(move || {
        let mut file = std::fs::File::create(&path)
            .map_err(|e| CacheError::OutputWriteIo(path.clone(), e))?;
        CsvWriter::new(&mut file)
            .include_header(true)
            .finish(&mut df)
            .map_err(|e| CacheError::OutputWritePolars(path.clone(), e))?;
        Ok::<PathBuf, CacheError>(path)
    })
    .await?
}
