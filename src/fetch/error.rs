use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to parse time-series response")]
    JsonParse(#[from] serde_json::Error),

    /// The service answered, but refused the request (bad token, quota exhausted, ...).
    #[error("Time-series API returned code {code}: {message}")]
    Api { code: i64, message: String },

    #[error("Station {station} reported an unparsable timestamp '{value}'")]
    InvalidTimestamp { station: String, value: String },

    #[error("No API tokens are configured")]
    NoCredentials,

    #[error("All {tried} API tokens failed; add a token or try again later")]
    ExhaustedCredentials {
        tried: usize,
        #[source]
        last_error: Option<Box<FetchError>>,
    },
}
