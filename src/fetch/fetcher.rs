//! Credential fallback around a [`TimeseriesApi`].

use crate::fetch::api::{TimeseriesApi, TimeseriesRequest};
use crate::fetch::error::FetchError;
use crate::fetch::response::FetchedBatch;
use crate::types::location_filter::LocationFilter;
use chrono::{DateTime, Utc};
use log::{info, warn};

pub struct Fetcher<A> {
    api: A,
    tokens: Vec<String>,
    variable: String,
    default_country: String,
}

impl<A: TimeseriesApi> Fetcher<A> {
    pub fn new(
        api: A,
        tokens: Vec<String>,
        variable: impl Into<String>,
        default_country: impl Into<String>,
    ) -> Self {
        Self {
            api,
            tokens,
            variable: variable.into(),
            default_country: default_country.into(),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn set_tokens(&mut self, tokens: Vec<String>) {
        self.tokens = tokens;
    }

    pub fn variable(&self) -> &str {
        &self.variable
    }

    /// The request sent upstream for `[start, end)` under `filter`.
    pub fn request(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        filter: &LocationFilter,
    ) -> TimeseriesRequest {
        let filter = match filter {
            LocationFilter::None => LocationFilter::Country(self.default_country.clone()),
            other => other.clone(),
        };
        TimeseriesRequest {
            start,
            end,
            filter,
            variable: self.variable.clone(),
        }
    }

    /// Fetches `[start, end)`, trying each token in order until one succeeds.
    ///
    /// # Errors
    ///
    /// [`FetchError::NoCredentials`] if there are no tokens, otherwise
    /// [`FetchError::ExhaustedCredentials`] carrying the last failure once every token
    /// has been tried.
    pub async fn fetch(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        filter: &LocationFilter,
    ) -> Result<FetchedBatch, FetchError> {
        if self.tokens.is_empty() {
            return Err(FetchError::NoCredentials);
        }
        let request = self.request(start, end, filter);

        let mut last_error = None;
        for (n, token) in self.tokens.iter().enumerate() {
            let result = match self.api.timeseries(token, &request).await {
                Ok(response) => FetchedBatch::from_response(&response, &self.variable),
                Err(e) => Err(e),
            };
            match result {
                Ok(batch) => {
                    info!(
                        "Fetched {} observations from {} stations for {} to {}",
                        batch.observations.len(),
                        batch.stations.len(),
                        start,
                        end
                    );
                    return Ok(batch);
                }
                Err(e) => {
                    warn!(
                        "Token {} of {} failed, it may be over its monthly quota: {}",
                        n + 1,
                        self.tokens.len(),
                        e
                    );
                    last_error = Some(Box::new(e));
                }
            }
        }

        Err(FetchError::ExhaustedCredentials {
            tried: self.tokens.len(),
            last_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{capture_logs, captured_warnings, MockApi, MockStation};
    use chrono::TimeZone;

    fn window() -> (DateTime<Utc>, DateTime<Utc>) {
        (
            Utc.with_ymd_and_hms(2021, 6, 1, 5, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2021, 6, 1, 6, 0, 0).unwrap(),
        )
    }

    fn fetcher(api: MockApi, tokens: &[&str]) -> Fetcher<MockApi> {
        Fetcher::new(
            api,
            tokens.iter().map(|t| t.to_string()).collect(),
            "fuel_moisture",
            "us",
        )
    }

    #[tokio::test]
    async fn test_falls_through_failing_tokens() {
        let (start, end) = window();
        let api = MockApi::new(MockStation::defaults()).failing_tokens(["a", "b"]);
        let fallback = fetcher(api, &["a", "b", "c"]);

        capture_logs();
        let batch = fallback.fetch(start, end, &LocationFilter::None).await.unwrap();
        assert_eq!(fallback.api().tokens_used(), ["a", "b", "c"]);
        let warnings = captured_warnings();
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].starts_with("Token 1 of 3 failed"));
        assert!(warnings[1].starts_with("Token 2 of 3 failed"));

        let single = fetcher(MockApi::new(MockStation::defaults()), &["c"])
            .fetch(start, end, &LocationFilter::None)
            .await
            .unwrap();
        assert_eq!(batch, single);
    }

    #[tokio::test]
    async fn test_all_tokens_fail() {
        let (start, end) = window();
        let api = MockApi::new(MockStation::defaults()).failing_tokens(["a", "b"]);
        let fetcher = fetcher(api, &["a", "b"]);

        let err = fetcher
            .fetch(start, end, &LocationFilter::None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FetchError::ExhaustedCredentials { tried: 2, last_error: Some(_) }
        ));
    }

    #[tokio::test]
    async fn test_no_tokens() {
        let (start, end) = window();
        let fetcher = fetcher(MockApi::new(MockStation::defaults()), &[]);
        let err = fetcher
            .fetch(start, end, &LocationFilter::None)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::NoCredentials));
        assert!(fetcher.api().calls().is_empty());
    }

    #[tokio::test]
    async fn test_no_filter_uses_default_country() {
        let (start, end) = window();
        let fetcher = fetcher(MockApi::new(MockStation::defaults()), &["a"]);
        fetcher.fetch(start, end, &LocationFilter::None).await.unwrap();
        assert_eq!(
            fetcher.api().calls()[0].request.filter,
            LocationFilter::Country("us".to_string())
        );
    }
}
