pub mod bbox;
pub mod granularity;
pub mod location_filter;
pub mod observation;
pub mod query;
pub mod station;
