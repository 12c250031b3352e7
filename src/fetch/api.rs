use crate::fetch::error::FetchError;
use crate::fetch::response::TimeseriesResponse;
use crate::partition::time::meso_time;
use crate::types::location_filter::LocationFilter;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use reqwest::Client;

const TIMESERIES_PATH: &str = "stations/timeseries";

/// One upstream time-series query, minus the credential.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeseriesRequest {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Never [`LocationFilter::None`] once it reaches an API; the fetcher substitutes
    /// the default country.
    pub filter: LocationFilter,
    pub variable: String,
}

impl TimeseriesRequest {
    /// Query string pairs, without the token.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("start", meso_time(self.start)),
            ("end", meso_time(self.end)),
            ("vars", self.variable.clone()),
        ];
        match &self.filter {
            LocationFilter::Country(country) => pairs.push(("country", country.clone())),
            LocationFilter::State(state) => pairs.push(("state", state.clone())),
            LocationFilter::BoundingBox(bbox) => pairs.push(("bbox", bbox.to_query_value())),
            LocationFilter::None => {}
        }
        pairs
    }
}

/// Anything that can answer a time-series query with a given token.
#[async_trait]
pub trait TimeseriesApi: Send + Sync {
    async fn timeseries(
        &self,
        token: &str,
        request: &TimeseriesRequest,
    ) -> Result<TimeseriesResponse, FetchError>;
}

/// [`TimeseriesApi`] backed by the Synoptic web service.
#[derive(Debug, Clone)]
pub struct SynopticClient {
    client: Client,
    base_url: String,
}

impl SynopticClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl TimeseriesApi for SynopticClient {
    async fn timeseries(
        &self,
        token: &str,
        request: &TimeseriesRequest,
    ) -> Result<TimeseriesResponse, FetchError> {
        let url = format!("{}/{}", self.base_url, TIMESERIES_PATH);
        debug!(
            "Requesting {} from {} to {} ({})",
            request.variable,
            meso_time(request.start),
            meso_time(request.end),
            request.filter
        );

        let response = self
            .client
            .get(&url)
            .query(&[("token", token)])
            .query(&request.query_pairs())
            .send()
            .await
            .map_err(|e| FetchError::NetworkRequest(url.clone(), e))?;
        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                if let Some(status) = e.status() {
                    return Err(FetchError::HttpStatus {
                        url,
                        status,
                        source: e,
                    });
                } else {
                    return Err(FetchError::NetworkRequest(url, e));
                }
            }
        };
        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::NetworkRequest(url.clone(), e))?;

        let parsed: TimeseriesResponse = serde_json::from_slice(&bytes)?;
        parsed.check_summary()?;
        Ok(parsed)
    }
}
