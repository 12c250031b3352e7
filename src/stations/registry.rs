//! Append-only registry of every station the cache has seen.

use crate::stations::error::RegistryError;
use crate::types::location_filter::LocationFilter;
use crate::types::station::Station;
use bincode::config::{Configuration, Fixint, LittleEndian};
use log::{debug, info};
use rstar::RTree;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

const BINCODE_CACHE_FILE_NAME: &str = "stations.bin";
const BINCODE_CONFIG: Configuration<LittleEndian, Fixint> =
    bincode::config::standard().with_fixed_int_encoding();

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StationRegistry {
    stations: Vec<Station>,
}

impl StationRegistry {
    pub fn new(stations: Vec<Station>) -> Self {
        let mut registry = Self::default();
        registry.merge(stations);
        registry
    }

    pub fn file_path(cache_dir: &Path) -> PathBuf {
        cache_dir.join(BINCODE_CACHE_FILE_NAME)
    }

    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    pub fn into_stations(self) -> Vec<Station> {
        self.stations
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Station> {
        self.stations.iter().find(|s| s.id == id)
    }

    /// Appends stations whose id is not registered yet and returns how many were added.
    ///
    /// Known ids are left untouched: the first attributes recorded for a station win,
    /// including within `incoming` itself.
    pub fn merge(&mut self, incoming: impl IntoIterator<Item = Station>) -> usize {
        let mut known: HashSet<String> = self.stations.iter().map(|s| s.id.clone()).collect();
        let before = self.stations.len();
        for station in incoming {
            if known.insert(station.id.clone()) {
                self.stations.push(station);
            }
        }
        self.stations.len() - before
    }

    /// Ids of the registered stations that pass `filter`.
    ///
    /// Returns `None` for [`LocationFilter::None`], meaning every row is kept, including
    /// rows from stations the registry has no coordinates for.
    pub fn matching_ids(&self, filter: &LocationFilter) -> Option<HashSet<String>> {
        match filter {
            LocationFilter::None => None,
            LocationFilter::BoundingBox(bbox) => {
                let tree = RTree::bulk_load(self.stations.clone());
                Some(
                    tree.locate_in_envelope(&bbox.envelope())
                        .map(|s| s.id.clone())
                        .collect(),
                )
            }
            other => Some(
                self.stations
                    .iter()
                    .filter(|s| other.matches(s))
                    .map(|s| s.id.clone())
                    .collect(),
            ),
        }
    }

    /// Reads the registry from `cache_dir`. A missing file is an empty registry.
    pub async fn load(cache_dir: &Path) -> Result<Self, RegistryError> {
        let cache_file = Self::file_path(cache_dir);
        if !tokio::fs::try_exists(&cache_file)
            .await
            .map_err(|e| RegistryError::CacheRead(cache_file.clone(), e))?
        {
            debug!("No station registry at {}", cache_file.display());
            return Ok(Self::default());
        }

        let bytes = tokio::fs::read(&cache_file)
            .await
            .map_err(|e| RegistryError::CacheRead(cache_file.clone(), e))?;
        let stations = tokio::task::spawn_blocking(move || {
            bincode::serde::decode_from_slice::<Vec<Station>, _>(&bytes, BINCODE_CONFIG)
                .map(|(stations, _)| stations)
                .map_err(|e| RegistryError::CacheDecode(cache_file, Box::new(e)))
        })
        .await??;
        Ok(Self { stations })
    }

    pub async fn save(&self, cache_dir: &Path) -> Result<(), RegistryError> {
        let cache_file = Self::file_path(cache_dir);
        let stations = self.stations.clone();
        let bincode_data = tokio::task::spawn_blocking(move || {
            bincode::serde::encode_to_vec(stations, BINCODE_CONFIG)
                .map_err(|e| RegistryError::CacheEncode(Box::new(e)))
        })
        .await??;
        tokio::fs::write(&cache_file, &bincode_data)
            .await
            .map_err(|e| RegistryError::CacheWrite(cache_file.clone(), e))?;
        info!(
            "Wrote {} stations ({} bytes) to {}",
            self.stations.len(),
            bincode_data.len(),
            cache_file.display()
        );
        Ok(())
    }
}
