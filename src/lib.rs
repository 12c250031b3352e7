mod cache;
mod config;
mod error;
mod fetch;
mod mesodb;
mod partition;
mod stations;
mod tokens;
mod types;
mod utils;

#[cfg(test)]
mod testing;

pub use error::MesoDbError;
pub use mesodb::*;

pub use config::{
    Clock, MesoDbConfig, DEFAULT_API_BASE_URL, DEFAULT_COUNTRY, DEFAULT_REALTIME_MINUTES,
    DEFAULT_VARIABLE,
};
pub use tokens::TokenStore;
pub use utils::{ensure_cache_dir_exists, get_cache_dir};

pub use cache::assembler::QueryAssembler;
pub use cache::error::CacheError;
pub use cache::planner::{plan_segments, FillPlanner, FillReport, Segment};
pub use cache::writer::{CacheWriter, WriteSummary};

pub use fetch::api::{SynopticClient, TimeseriesApi, TimeseriesRequest};
pub use fetch::error::FetchError;
pub use fetch::fetcher::Fetcher;
pub use fetch::response::{FetchedBatch, StationRecord, Summary, TimeseriesResponse};

pub use partition::locator::{DayState, PartitionKey, PartitionLocator};
pub use partition::time::{floor_day, floor_hour, meso_time, MIN_SPAN_SECONDS};

pub use stations::error::RegistryError;
pub use stations::registry::StationRegistry;

pub use types::bbox::{check_coords, BoundingBox};
pub use types::granularity::Granularity;
pub use types::location_filter::LocationFilter;
pub use types::observation::{
    Observation, ObservationFrame, DATETIME_COL, STATION_ID_COL, TIMESTAMP_COL, VALUE_COL,
};
pub use types::query::QueryParams;
pub use types::station::Station;
