//! Spatial/administrative filter applied to fetches and to query results.

use crate::types::bbox::BoundingBox;
use crate::types::station::Station;
use std::fmt;

/// Exactly one location restriction, or none.
///
/// When several are requested, precedence is country, then state, then bounding box.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationFilter {
    Country(String),
    State(String),
    BoundingBox(BoundingBox),
    None,
}

impl LocationFilter {
    /// Picks the highest-precedence filter that is set. Blank codes count as unset.
    ///
    /// # Examples
    ///
    /// ```
    /// use mesodb::{check_coords, LocationFilter};
    ///
    /// let bbox = check_coords(Some(32.0), Some(42.5), Some(-125.0), Some(-112.0));
    /// assert_eq!(
    ///     LocationFilter::resolve(None, Some("ca"), bbox),
    ///     LocationFilter::State("ca".to_string())
    /// );
    /// assert_eq!(LocationFilter::resolve(None, Some(" "), None), LocationFilter::None);
    /// ```
    pub fn resolve(
        country: Option<&str>,
        state: Option<&str>,
        bbox: Option<BoundingBox>,
    ) -> Self {
        let non_blank = |code: Option<&str>| {
            code.map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
        };
        if let Some(country) = non_blank(country) {
            LocationFilter::Country(country)
        } else if let Some(state) = non_blank(state) {
            LocationFilter::State(state)
        } else if let Some(bbox) = bbox {
            LocationFilter::BoundingBox(bbox)
        } else {
            LocationFilter::None
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, LocationFilter::None)
    }

    /// Whether `station` passes the filter. `None` matches everything.
    pub fn matches(&self, station: &Station) -> bool {
        match self {
            LocationFilter::Country(country) => station.in_country(country),
            LocationFilter::State(state) => station.in_state(state),
            LocationFilter::BoundingBox(bbox) => station.within(bbox),
            LocationFilter::None => true,
        }
    }
}

impl fmt::Display for LocationFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocationFilter::Country(country) => write!(f, "country={}", country),
            LocationFilter::State(state) => write!(f, "state={}", state),
            LocationFilter::BoundingBox(bbox) => write!(f, "bbox={}", bbox.to_query_value()),
            LocationFilter::None => write!(f, "no location filter"),
        }
    }
}
