//! Persists fetched batches: station registry first, then one file per UTC hour.

use crate::cache::error::CacheError;
use crate::cache::parquet::{remove_provisional, write_partition};
use crate::fetch::response::FetchedBatch;
use crate::partition::locator::PartitionLocator;
use crate::partition::time::{floor_hour, hours_between};
use crate::stations::registry::StationRegistry;
use crate::types::observation::{observations_to_frame, Observation};
use crate::types::station::Station;
use chrono::{DateTime, Utc};
use log::{debug, info};
use std::collections::BTreeMap;

/// What a single [`CacheWriter::write`] call put on disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteSummary {
    pub new_stations: usize,
    pub final_hours: usize,
    pub provisional_hours: usize,
    /// Hours outside the requested span that received rows in their provisional slot.
    pub spilled_hours: usize,
    /// Rows outside the requested span that were dropped because their hour was cached.
    pub skipped_rows: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct CacheWriter<'a> {
    locator: &'a PartitionLocator,
}

impl<'a> CacheWriter<'a> {
    pub fn new(locator: &'a PartitionLocator) -> Self {
        Self { locator }
    }

    /// Stores `batch` as the result of fetching `[start, end)`.
    ///
    /// Every hour in the span gets a partition, even if no rows fall in it. Realtime hours
    /// go to the provisional slot; older hours become final and replace any provisional
    /// file. Rows outside the span only fill hours nothing is cached for yet.
    pub async fn write(
        &self,
        batch: FetchedBatch,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<WriteSummary, CacheError> {
        let mut summary = WriteSummary {
            new_stations: self.merge_stations(batch.stations).await?,
            ..Default::default()
        };

        let mut by_hour: BTreeMap<DateTime<Utc>, Vec<Observation>> = BTreeMap::new();
        for row in batch.observations {
            by_hour.entry(floor_hour(row.datetime)).or_default().push(row);
        }

        for hour in hours_between(start, end) {
            let rows = by_hour.remove(&hour).unwrap_or_default();
            if self.locator.is_realtime(hour)? {
                self.write_provisional(hour, &rows).await?;
                summary.provisional_hours += 1;
            } else {
                self.write_final(hour, &rows).await?;
                summary.final_hours += 1;
            }
        }

        for (hour, rows) in by_hour {
            if self.locator.partition_exists(hour).await
                || self.locator.is_provisional_present(hour).await
            {
                debug!(
                    "Skipping {} rows outside the fetched span, {} is already cached",
                    rows.len(),
                    hour
                );
                summary.skipped_rows += rows.len();
            } else {
                debug!(
                    "Keeping {} rows outside the fetched span as provisional data for {}",
                    rows.len(),
                    hour
                );
                self.write_provisional(hour, &rows).await?;
                summary.spilled_hours += 1;
            }
        }

        info!(
            "Cached {} to {}: {} final, {} provisional, {} new stations",
            start, end, summary.final_hours, summary.provisional_hours, summary.new_stations
        );
        Ok(summary)
    }

    async fn merge_stations(&self, stations: Vec<Station>) -> Result<usize, CacheError> {
        if stations.is_empty() {
            return Ok(0);
        }
        let mut registry = StationRegistry::load(self.locator.root()).await?;
        let added = registry.merge(stations);
        if added > 0 {
            registry.save(self.locator.root()).await?;
        }
        Ok(added)
    }

    async fn write_final(
        &self,
        hour: DateTime<Utc>,
        rows: &[Observation],
    ) -> Result<(), CacheError> {
        let path = self.locator.final_path(hour);
        write_partition(observations_to_frame(rows)?, &path).await?;
        if remove_provisional(&self.locator.provisional_path(hour)).await? {
            debug!("Replaced provisional partition for {}", hour);
        }
        debug!("Wrote {} rows to {}", rows.len(), path.display());
        Ok(())
    }

    async fn write_provisional(
        &self,
        hour: DateTime<Utc>,
        rows: &[Observation],
    ) -> Result<(), CacheError> {
        let path = self.locator.provisional_path(hour);
        write_partition(observations_to_frame(rows)?, &path).await?;
        debug!("Wrote {} rows to {}", rows.len(), path.display());
        Ok(())
    }
}
