//! In-memory stand-in for the upstream API.

use crate::fetch::api::{TimeseriesApi, TimeseriesRequest};
use crate::fetch::error::FetchError;
use crate::fetch::response::TimeseriesResponse;
use crate::partition::time::hours_between;
use crate::types::location_filter::LocationFilter;
use crate::types::station::Station;
use async_trait::async_trait;
use chrono::{Duration, SecondsFormat, Timelike};
use serde_json::{json, Value};
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::cell::RefCell;
use std::collections::HashSet;
use std::sync::Mutex;

thread_local! {
    static CAPTURED: RefCell<Vec<(Level, String)>> = const { RefCell::new(Vec::new()) };
}

/// Records log lines per thread, so parallel tests only see their own output.
struct CapturingLogger;

impl Log for CapturingLogger {
    fn enabled(&self, _: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        CAPTURED.with(|c| {
            c.borrow_mut()
                .push((record.level(), record.args().to_string()))
        });
    }

    fn flush(&self) {}
}

static LOGGER: CapturingLogger = CapturingLogger;

/// Starts capturing log lines on the current thread, dropping earlier ones.
pub(crate) fn capture_logs() {
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(LevelFilter::Debug);
    CAPTURED.with(|c| c.borrow_mut().clear());
}

/// Warnings logged on the current thread since [`capture_logs`].
pub(crate) fn captured_warnings() -> Vec<String> {
    CAPTURED.with(|c| {
        c.borrow()
            .iter()
            .filter(|(level, _)| *level == Level::Warn)
            .map(|(_, message)| message.clone())
            .collect()
    })
}

#[derive(Debug, Clone)]
pub(crate) struct MockStation {
    pub id: &'static str,
    pub latitude: f64,
    pub longitude: f64,
    pub state: &'static str,
}

impl MockStation {
    /// Two stations in California and one in Nevada.
    pub fn defaults() -> Vec<MockStation> {
        vec![
            MockStation {
                id: "CA001",
                latitude: 38.5,
                longitude: -121.5,
                state: "CA",
            },
            MockStation {
                id: "NV001",
                latitude: 39.5,
                longitude: -119.8,
                state: "NV",
            },
            MockStation {
                id: "CA002",
                latitude: 34.1,
                longitude: -118.2,
                state: "CA",
            },
        ]
    }

    fn station(&self) -> Station {
        Station {
            id: self.id.to_string(),
            latitude: self.latitude,
            longitude: self.longitude,
            elevation: None,
            state: Some(self.state.to_string()),
            country: Some("US".to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct RecordedCall {
    pub token: String,
    pub request: TimeseriesRequest,
}

/// Answers every request with readings at `:00` and `:30` of each requested hour for
/// every station that passes the filter. Tokens marked as failing get an API refusal.
pub(crate) struct MockApi {
    stations: Vec<MockStation>,
    failing: HashSet<String>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockApi {
    pub fn new(stations: Vec<MockStation>) -> Self {
        Self {
            stations,
            failing: HashSet::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_tokens<'a>(mut self, tokens: impl IntoIterator<Item = &'a str>) -> Self {
        self.failing.extend(tokens.into_iter().map(str::to_string));
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn tokens_used(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.token).collect()
    }

    /// Calls made with a token that is not marked as failing.
    pub fn successful_calls(&self) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| !self.failing.contains(&c.token))
            .collect()
    }

    /// Readings are `10 + hour + minute / 100`, so each one identifies its slot.
    fn station_json(station: &MockStation, request: &TimeseriesRequest) -> Value {
        let mut times = Vec::new();
        let mut values = Vec::new();
        for hour in hours_between(request.start, request.end) {
            for minutes in [0, 30] {
                let ts = hour + Duration::minutes(minutes);
                times.push(ts.to_rfc3339_opts(SecondsFormat::Secs, true));
                values.push(10.0 + ts.hour() as f64 + minutes as f64 / 100.0);
            }
        }
        json!({
            "STID": station.id,
            "LATITUDE": station.latitude.to_string(),
            "LONGITUDE": station.longitude,
            "ELEVATION": "120",
            "STATE": station.state,
            "COUNTRY": "US",
            "OBSERVATIONS": {
                "date_time": times,
                (format!("{}_set_1", request.variable)): values,
            }
        })
    }
}

#[async_trait]
impl TimeseriesApi for MockApi {
    async fn timeseries(
        &self,
        token: &str,
        request: &TimeseriesRequest,
    ) -> Result<TimeseriesResponse, FetchError> {
        self.calls.lock().unwrap().push(RecordedCall {
            token: token.to_string(),
            request: request.clone(),
        });
        if self.failing.contains(token) {
            return Err(FetchError::Api {
                code: -1,
                message: format!("token {} is over its quota", token),
            });
        }

        let matching: Vec<Value> = self
            .stations
            .iter()
            .filter(|s| match &request.filter {
                LocationFilter::None => true,
                filter => filter.matches(&s.station()),
            })
            .map(|s| Self::station_json(s, request))
            .collect();
        let code = if matching.is_empty() { 2 } else { 1 };
        Ok(serde_json::from_value(json!({
            "SUMMARY": {"RESPONSE_CODE": code, "RESPONSE_MESSAGE": "OK"},
            "STATION": matching,
        }))?)
    }
}
