//! Answers a query from the cache, filling it first.

use crate::cache::error::CacheError;
use crate::cache::parquet::{read_partition, write_csv};
use crate::cache::planner::{FillPlanner, FillReport};
use crate::error::MesoDbError;
use crate::fetch::api::TimeseriesApi;
use crate::fetch::fetcher::Fetcher;
use crate::partition::locator::PartitionLocator;
use crate::partition::time::{floor_hour, hours_through};
use crate::stations::registry::StationRegistry;
use crate::types::observation::{
    observations_to_frame, retain_stations, trim_to_window, ObservationFrame,
};
use crate::types::query::QueryParams;
use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};
use polars::prelude::DataFrame;
use std::collections::HashSet;
use std::path::PathBuf;

pub struct QueryAssembler<'a, A> {
    fetcher: &'a Fetcher<A>,
    locator: &'a PartitionLocator,
}

impl<'a, A: TimeseriesApi> QueryAssembler<'a, A> {
    pub fn new(fetcher: &'a Fetcher<A>, locator: &'a PartitionLocator) -> Self {
        Self { fetcher, locator }
    }

    /// Fills the half-open window `[start_time, end_time)` of `params`.
    pub async fn fill(&self, params: &QueryParams) -> Result<FillReport, MesoDbError> {
        params.validate(self.locator.now())?;
        self.fill_span(params, params.start_time, params.end_time)
            .await
    }

    async fn fill_span(
        &self,
        params: &QueryParams,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<FillReport, MesoDbError> {
        let filter = params.fill_filter();
        Ok(FillPlanner::new(self.fetcher, self.locator, &filter)
            .fill(start, end)
            .await?)
    }

    /// Every hour the closed window `[start_time, end_time]` touches, capped at now.
    fn fill_window(&self, params: &QueryParams) -> (DateTime<Utc>, DateTime<Utc>) {
        let end = (floor_hour(params.end_time) + Duration::hours(1)).min(self.locator.now());
        (floor_hour(params.start_time), end)
    }

    /// Fills the cache for `params`, then reads back the matching rows.
    ///
    /// Hours without any cached file are logged and skipped. If `params.make_file` is
    /// set, the result is also written to `<root>/<YYYYMMDDHH>.csv`.
    pub async fn assemble(&self, params: &QueryParams) -> Result<ObservationFrame, MesoDbError> {
        params.validate(self.locator.now())?;
        let (fill_start, fill_end) = self.fill_window(params);
        self.fill_span(params, fill_start, fill_end).await?;

        let filter = params.location_filter();
        let registry = StationRegistry::load(self.locator.root()).await?;
        let allowed = registry.matching_ids(&filter);
        if let Some(ids) = &allowed {
            debug!("{} registered stations match {}", ids.len(), filter);
        }

        let data = self
            .read_window(params.start_time, params.end_time, allowed.as_ref())
            .await?;
        info!(
            "Assembled {} rows from {} to {} ({})",
            data.height(),
            params.start_time,
            params.end_time,
            filter
        );

        let frame = ObservationFrame::new(data);
        if params.make_file {
            let path = self.write_output(&frame).await?;
            info!("Wrote query result to {}", path.display());
            return Ok(frame.with_output_path(path));
        }
        Ok(frame)
    }

    /// Concatenates the cached hours touching `[start, end]` in order, keeps the rows of
    /// `allowed` stations (all rows if `None`) and trims to the closed window.
    async fn read_window(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        allowed: Option<&HashSet<String>>,
    ) -> Result<DataFrame, CacheError> {
        let mut data = observations_to_frame(&[])?;
        for hour in hours_through(start, end) {
            let Some(path) = self.readable_path(hour).await else {
                warn!("No cached data for {}, skipping", hour);
                continue;
            };
            let mut df = read_partition(&path).await?;
            if let Some(ids) = allowed {
                df = retain_stations(&df, ids)?;
            }
            data.vstack_mut(&df)?;
        }
        Ok(trim_to_window(data, start, end)?)
    }

    /// Final file if present, otherwise the provisional one.
    async fn readable_path(&self, hour: DateTime<Utc>) -> Option<PathBuf> {
        if self.locator.partition_exists(hour).await {
            Some(self.locator.final_path(hour))
        } else if self.locator.is_provisional_present(hour).await {
            Some(self.locator.provisional_path(hour))
        } else {
            None
        }
    }

    async fn write_output(&self, frame: &ObservationFrame) -> Result<PathBuf, CacheError> {
        let file_name = format!("{}.csv", self.locator.now().format("%Y%m%d%H"));
        write_csv(frame.collect()?, self.locator.root().join(file_name)).await
    }
}
