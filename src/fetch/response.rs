//! Wire format of the `stations/timeseries` endpoint and its conversion to rows.

use crate::fetch::error::FetchError;
use crate::types::observation::Observation;
use crate::types::station::Station;
use chrono::{DateTime, NaiveDateTime, Utc};
use log::debug;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

const RESPONSE_OK: i64 = 1;
/// The query matched no stations. Not an error.
const RESPONSE_NO_RESULTS: i64 = 2;
const DATE_TIME_KEY: &str = "date_time";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TimeseriesResponse {
    #[serde(rename = "SUMMARY")]
    pub summary: Summary,
    #[serde(rename = "STATION", default)]
    pub stations: Vec<StationRecord>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Summary {
    #[serde(rename = "RESPONSE_CODE")]
    pub response_code: i64,
    #[serde(rename = "RESPONSE_MESSAGE", default)]
    pub response_message: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StationRecord {
    #[serde(rename = "STID")]
    pub stid: String,
    #[serde(rename = "LATITUDE", default, deserialize_with = "lenient_f64")]
    pub latitude: Option<f64>,
    #[serde(rename = "LONGITUDE", default, deserialize_with = "lenient_f64")]
    pub longitude: Option<f64>,
    #[serde(rename = "ELEVATION", default, deserialize_with = "lenient_f64")]
    pub elevation: Option<f64>,
    #[serde(rename = "STATE", default)]
    pub state: Option<String>,
    #[serde(rename = "COUNTRY", default)]
    pub country: Option<String>,
    /// `date_time` plus one array per requested variable, e.g. `fuel_moisture_set_1`.
    #[serde(rename = "OBSERVATIONS", default)]
    pub observations: Map<String, Value>,
}

/// The upstream sends station coordinates both as numbers and as strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f64),
    Text(String),
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(
        match Option::<NumberOrString>::deserialize(deserializer)? {
            Some(NumberOrString::Number(n)) => Some(n),
            Some(NumberOrString::Text(s)) => s.trim().parse().ok(),
            None => None,
        },
    )
}

fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

impl TimeseriesResponse {
    /// Turns a refusal by the service into an error. "No stations matched" is fine.
    pub fn check_summary(&self) -> Result<(), FetchError> {
        match self.summary.response_code {
            RESPONSE_OK | RESPONSE_NO_RESULTS => Ok(()),
            code => Err(FetchError::Api {
                code,
                message: self.summary.response_message.clone(),
            }),
        }
    }
}

impl StationRecord {
    /// Registry entry for this record, if it has coordinates.
    pub fn to_station(&self) -> Option<Station> {
        Some(Station {
            id: self.stid.clone(),
            latitude: self.latitude?,
            longitude: self.longitude?,
            elevation: self.elevation,
            state: self.state.clone(),
            country: self.country.clone(),
        })
    }

    /// Finds the array holding `variable`: `<variable>_set_1`, then any `<variable>*` key,
    /// then the first non-time column.
    fn value_column(&self, variable: &str) -> Option<&Vec<Value>> {
        let preferred = format!("{}_set_1", variable);
        let key = if self.observations.contains_key(&preferred) {
            Some(preferred.as_str())
        } else {
            self.observations
                .keys()
                .map(String::as_str)
                .find(|k| k.starts_with(variable))
                .or_else(|| {
                    self.observations
                        .keys()
                        .map(String::as_str)
                        .find(|k| *k != DATE_TIME_KEY)
                })
        }?;
        self.observations.get(key)?.as_array()
    }

    fn observation_rows(&self, variable: &str) -> Result<Vec<Observation>, FetchError> {
        let Some(times) = self
            .observations
            .get(DATE_TIME_KEY)
            .and_then(Value::as_array)
        else {
            return Ok(Vec::new());
        };
        let values = self.value_column(variable);

        times
            .iter()
            .enumerate()
            .map(|(i, raw)| {
                let text = raw.as_str().unwrap_or_default();
                let datetime =
                    parse_timestamp(text).ok_or_else(|| FetchError::InvalidTimestamp {
                        station: self.stid.clone(),
                        value: raw.to_string(),
                    })?;
                Ok(Observation {
                    station_id: self.stid.clone(),
                    datetime,
                    value: values.and_then(|v| v.get(i)).and_then(value_as_f64),
                })
            })
            .collect()
    }
}

/// Observation rows and station metadata extracted from one response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchedBatch {
    pub observations: Vec<Observation>,
    pub stations: Vec<Station>,
}

impl FetchedBatch {
    pub fn from_response(
        response: &TimeseriesResponse,
        variable: &str,
    ) -> Result<Self, FetchError> {
        let mut batch = FetchedBatch::default();
        for record in &response.stations {
            batch
                .observations
                .extend(record.observation_rows(variable)?);
            match record.to_station() {
                Some(station) => batch.stations.push(station),
                None => debug!("Station {} has no coordinates, not registering it", record.stid),
            }
        }
        Ok(batch)
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty() && self.stations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn sample() -> TimeseriesResponse {
        serde_json::from_value(json!({
            "SUMMARY": {"RESPONSE_CODE": 1, "RESPONSE_MESSAGE": "OK"},
            "STATION": [
                {
                    "STID": "KSFO",
                    "LATITUDE": "37.61961",
                    "LONGITUDE": -122.36558,
                    "ELEVATION": "10.0",
                    "STATE": "CA",
                    "COUNTRY": "US",
                    "OBSERVATIONS": {
                        "date_time": ["2021-06-01T05:00:00Z", "2021-06-01T05:30:00Z"],
                        "fuel_moisture_set_1": [11.2, null]
                    }
                },
                {
                    "STID": "NOLOC",
                    "LATITUDE": "",
                    "LONGITUDE": null,
                    "STATE": "NV",
                    "OBSERVATIONS": {
                        "date_time": ["2021-06-01T05:10:00"],
                        "fuel_moisture_set_2": ["9.5"]
                    }
                }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_lenient_numbers() {
        let response = sample();
        let ksfo = &response.stations[0];
        assert_eq!(ksfo.latitude, Some(37.61961));
        assert_eq!(ksfo.longitude, Some(-122.36558));
        assert_eq!(ksfo.elevation, Some(10.0));
        assert_eq!(response.stations[1].latitude, None);
    }

    #[test]
    fn test_batch_from_response() {
        let batch = FetchedBatch::from_response(&sample(), "fuel_moisture").unwrap();
        assert_eq!(batch.observations.len(), 3);
        assert_eq!(
            batch.observations[0],
            Observation {
                station_id: "KSFO".to_string(),
                datetime: Utc.with_ymd_and_hms(2021, 6, 1, 5, 0, 0).unwrap(),
                value: Some(11.2),
            }
        );
        assert_eq!(batch.observations[1].value, None);
        // Falls back to the other set of the same variable, and to naive UTC timestamps.
        assert_eq!(batch.observations[2].value, Some(9.5));
        assert_eq!(
            batch.observations[2].datetime,
            Utc.with_ymd_and_hms(2021, 6, 1, 5, 10, 0).unwrap()
        );
        // Observations of a station without coordinates are kept, the station is not registered.
        assert_eq!(batch.stations.len(), 1);
        assert_eq!(batch.stations[0].country.as_deref(), Some("US"));
    }

    #[test]
    fn test_response_codes() {
        assert!(sample().check_summary().is_ok());

        let empty: TimeseriesResponse = serde_json::from_value(json!({
            "SUMMARY": {"RESPONSE_CODE": 2, "RESPONSE_MESSAGE": "No stations found"}
        }))
        .unwrap();
        assert!(empty.check_summary().is_ok());
        assert!(FetchedBatch::from_response(&empty, "fuel_moisture")
            .unwrap()
            .is_empty());

        let refused: TimeseriesResponse = serde_json::from_value(json!({
            "SUMMARY": {"RESPONSE_CODE": -1, "RESPONSE_MESSAGE": "Invalid token."}
        }))
        .unwrap();
        assert!(matches!(
            refused.check_summary(),
            Err(FetchError::Api { code: -1, .. })
        ));
    }

    #[test]
    fn test_bad_timestamp_is_an_error() {
        let response: TimeseriesResponse = serde_json::from_value(json!({
            "SUMMARY": {"RESPONSE_CODE": 1},
            "STATION": [{
                "STID": "X",
                "OBSERVATIONS": {"date_time": ["yesterday"], "fuel_moisture_set_1": [1.0]}
            }]
        }))
        .unwrap();
        assert!(matches!(
            FetchedBatch::from_response(&response, "fuel_moisture"),
            Err(FetchError::InvalidTimestamp { .. })
        ));
    }
}
