//! Defines the static station metadata kept in the local registry, and the
//! `rstar` implementation that lets stations be indexed by location.

use crate::types::bbox::BoundingBox;
use rstar::{RTreeObject, AABB};
use serde::{Deserialize, Serialize};

/// A single observing station as reported by the upstream time-series API.
///
/// Stations are only ever appended to the registry. The attributes recorded the
/// first time a station is seen are the ones that stick.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Station {
    /// The upstream station identifier (`STID`), e.g. "KSFO".
    pub id: String,
    /// Latitude in decimal degrees (WGS84).
    pub latitude: f64,
    /// Longitude in decimal degrees (WGS84).
    pub longitude: f64,
    /// Elevation in feet, if reported.
    pub elevation: Option<f64>,
    /// Two letter state code, if reported (e.g. "CA").
    pub state: Option<String>,
    /// Country code, if reported (e.g. "US").
    pub country: Option<String>,
}

impl Station {
    /// Case-insensitive exact match on the state code.
    pub fn in_state(&self, state: &str) -> bool {
        self.state
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case(state.trim()))
    }

    /// Case-insensitive exact match on the country code.
    pub fn in_country(&self, country: &str) -> bool {
        self.country
            .as_deref()
            .is_some_and(|c| c.eq_ignore_ascii_case(country.trim()))
    }

    pub fn within(&self, bbox: &BoundingBox) -> bool {
        bbox.contains(self.latitude, self.longitude)
    }
}

/// Stations are points, so the envelope is a degenerate AABB at `[latitude, longitude]`.
impl RTreeObject for Station {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.latitude, self.longitude])
    }
}
