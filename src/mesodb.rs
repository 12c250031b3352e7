//! This module provides the main entry point of the crate: a cache of Synoptic/MesoWest
//! time series that fetches what it is missing and answers queries from disk.

use crate::cache::assembler::QueryAssembler;
use crate::cache::planner::FillReport;
use crate::config::MesoDbConfig;
use crate::error::MesoDbError;
use crate::fetch::api::{SynopticClient, TimeseriesApi};
use crate::fetch::fetcher::Fetcher;
use crate::partition::locator::PartitionLocator;
use crate::stations::registry::StationRegistry;
use crate::tokens::TokenStore;
use crate::types::observation::ObservationFrame;
use crate::types::query::QueryParams;
use crate::types::station::Station;
use crate::utils::ensure_cache_dir_exists;
use bon::bon;
use chrono::{DateTime, Duration, Utc};
use std::path::{Path, PathBuf};

/// Window used by [`MesoDb::update_db`] and [`MesoDb::get_db`] when no start is given.
const DEFAULT_LOOKBACK_HOURS: i64 = 3;

/// The main client struct: a local, hour-partitioned cache of observations.
///
/// Every read first makes sure the requested hours are cached, fetching only what is
/// missing, and then assembles the result from the partition files.
///
/// Create an instance using [`MesoDb::new()`] for the default cache directory,
/// [`MesoDb::with_cache_folder()`] for a custom location, or [`MesoDb::with_config()`]
/// for full control.
///
/// # Examples
///
/// ```rust
/// # use mesodb::{MesoDb, MesoDbError};
/// # async fn run() -> Result<(), MesoDbError> {
/// let db = MesoDb::new(["my-synoptic-token"]).await?;
/// let last_hours = db.get_db().state("CA").call().await?;
/// println!("{} observations", last_hours.height());
/// # Ok(())
/// # }
/// ```
pub struct MesoDb<A = SynopticClient> {
    config: MesoDbConfig,
    locator: PartitionLocator,
    token_store: TokenStore,
    fetcher: Fetcher<A>,
}

impl MesoDb<SynopticClient> {
    /// Creates a client using the default cache directory (e.g. `~/.cache/mesodb` on Linux).
    ///
    /// `tokens` are added to the ones already stored in the cache directory.
    ///
    /// # Errors
    ///
    /// Returns [`MesoDbError::CacheDirResolution`] if the default cache directory cannot be
    /// found, [`MesoDbError::CacheDirCreation`] if it cannot be created, and
    /// [`MesoDbError::NoTokens`] if neither `tokens` nor the token file hold any token.
    pub async fn new<I, S>(tokens: I) -> Result<Self, MesoDbError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::with_config(MesoDbConfig::from_default_dir()?, tokens).await
    }

    /// Creates a client caching into `cache_folder`, with default settings otherwise.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use mesodb::{MesoDb, MesoDbError};
    /// # use std::path::PathBuf;
    /// # async fn run() -> Result<(), MesoDbError> {
    /// let db = MesoDb::with_cache_folder(PathBuf::from("/data/mesodb"), ["token"]).await?;
    /// assert_eq!(db.cache_folder(), PathBuf::from("/data/mesodb"));
    /// # Ok(())
    /// # }
    /// ```
    pub async fn with_cache_folder<I, S>(
        cache_folder: PathBuf,
        tokens: I,
    ) -> Result<Self, MesoDbError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::with_config(MesoDbConfig::with_cache_folder(cache_folder), tokens).await
    }

    pub async fn with_config<I, S>(config: MesoDbConfig, tokens: I) -> Result<Self, MesoDbError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let api = SynopticClient::new(config.api_base_url.clone());
        Self::with_api(config, api, tokens).await
    }
}

#[bon]
impl<A: TimeseriesApi> MesoDb<A> {
    /// Creates a client that talks to `api` instead of the Synoptic web service.
    ///
    /// # Errors
    ///
    /// [`MesoDbError::CacheDirCreation`] if the cache folder cannot be created,
    /// [`MesoDbError::TokenRead`] or [`MesoDbError::TokenWrite`] if the token file cannot
    /// be used, [`MesoDbError::NoTokens`] if no token is available afterwards.
    pub async fn with_api<I, S>(
        config: MesoDbConfig,
        api: A,
        tokens: I,
    ) -> Result<Self, MesoDbError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        ensure_cache_dir_exists(&config.cache_folder)
            .await
            .map_err(|e| MesoDbError::CacheDirCreation(config.cache_folder.clone(), e))?;

        let mut token_store = TokenStore::load(&config.cache_folder).await?;
        token_store.add_tokens(tokens).await?;
        if token_store.is_empty() {
            return Err(MesoDbError::NoTokens(token_store.path().to_path_buf()));
        }

        let locator = PartitionLocator::new(
            &config.cache_folder,
            config.realtime_minutes,
            config.clock,
        );
        let fetcher = Fetcher::new(
            api,
            token_store.tokens().to_vec(),
            config.variable.clone(),
            config.default_country.clone(),
        );
        Ok(Self {
            config,
            locator,
            token_store,
            fetcher,
        })
    }

    pub fn cache_folder(&self) -> &Path {
        &self.config.cache_folder
    }

    pub fn config(&self) -> &MesoDbConfig {
        &self.config
    }

    pub fn api(&self) -> &A {
        self.fetcher.api()
    }

    /// Tokens in the order they are tried.
    pub fn tokens(&self) -> &[String] {
        self.token_store.tokens()
    }

    /// Adds tokens not known yet and persists them. Returns how many were new.
    pub async fn add_tokens<I, S>(&mut self, tokens: I) -> Result<usize, MesoDbError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let added = self.token_store.add_tokens(tokens).await?;
        self.fetcher.set_tokens(self.token_store.tokens().to_vec());
        Ok(added)
    }

    /// Every station seen so far, in the order they were first seen.
    pub async fn sites(&self) -> Result<Vec<Station>, MesoDbError> {
        Ok(StationRegistry::load(self.cache_folder())
            .await?
            .into_stations())
    }

    /// Fetches whatever is missing from the cache for the window `[start_time, end_time)`.
    ///
    /// This method uses a builder pattern. All arguments are optional: the window
    /// defaults to the last three hours. Hours are always fetched for a whole country:
    /// the given one, or the configured default. A state or bounding box only narrows
    /// what [`MesoDb::get_db`] returns, so the cached hours serve any later filter.
    ///
    /// # Errors
    ///
    /// [`MesoDbError::InvalidRange`] or [`MesoDbError::FutureRequest`] for a bad window,
    /// [`MesoDbError::Fetch`] if every token failed. Hours cached before a failure stay.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use mesodb::{MesoDb, MesoDbError};
    /// # use chrono::{TimeZone, Utc};
    /// # async fn run() -> Result<(), MesoDbError> {
    /// let db = MesoDb::new(["token"]).await?;
    /// let report = db
    ///     .update_db()
    ///     .start_time(Utc.with_ymd_and_hms(2021, 6, 1, 0, 0, 0).unwrap())
    ///     .end_time(Utc.with_ymd_and_hms(2021, 6, 8, 0, 0, 0).unwrap())
    ///     .call()
    ///     .await?;
    /// println!("{} fetches", report.fetches);
    /// # Ok(())
    /// # }
    /// ```
    #[builder]
    #[allow(clippy::too_many_arguments)]
    pub async fn update_db(
        &self,
        start_time: Option<DateTime<Utc>>,
        end_time: Option<DateTime<Utc>>,
        #[builder(into)] country: Option<String>,
        #[builder(into)] state: Option<String>,
        latitude1: Option<f64>,
        latitude2: Option<f64>,
        longitude1: Option<f64>,
        longitude2: Option<f64>,
    ) -> Result<FillReport, MesoDbError> {
        let params = self.params_with_defaults(
            start_time, end_time, country, state, latitude1, latitude2, longitude1, longitude2,
            false,
        );
        self.update(&params).await
    }

    /// Returns the cached observations in `[start_time, end_time]`, fetching missing hours
    /// first, including the hour `end_time` falls in.
    ///
    /// Takes the same arguments as [`MesoDb::update_db`], plus `.make_file(bool)` to also
    /// write the result to `<cache_folder>/<YYYYMMDDHH>.csv`.
    ///
    /// # Errors
    ///
    /// As for [`MesoDb::update_db`]. An hour with no cached file at all is logged and
    /// skipped, not an error.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use mesodb::{MesoDb, MesoDbError};
    /// # use chrono::{TimeZone, Utc};
    /// # use polars::prelude::*;
    /// # async fn run() -> Result<(), MesoDbError> {
    /// let db = MesoDb::new(["token"]).await?;
    /// let result = db
    ///     .get_db()
    ///     .start_time(Utc.with_ymd_and_hms(2021, 6, 1, 5, 0, 0).unwrap())
    ///     .end_time(Utc.with_ymd_and_hms(2021, 6, 1, 7, 0, 0).unwrap())
    ///     .latitude1(37.0)
    ///     .latitude2(39.0)
    ///     .longitude1(-123.0)
    ///     .longitude2(-121.0)
    ///     .call()
    ///     .await?;
    /// let df = result.frame().sort(["datetime"], Default::default()).collect()?;
    /// println!("{}", df);
    /// # Ok(())
    /// # }
    /// ```
    #[builder]
    #[allow(clippy::too_many_arguments)]
    pub async fn get_db(
        &self,
        start_time: Option<DateTime<Utc>>,
        end_time: Option<DateTime<Utc>>,
        #[builder(into)] country: Option<String>,
        #[builder(into)] state: Option<String>,
        latitude1: Option<f64>,
        latitude2: Option<f64>,
        longitude1: Option<f64>,
        longitude2: Option<f64>,
        #[builder(default)] make_file: bool,
    ) -> Result<ObservationFrame, MesoDbError> {
        let params = self.params_with_defaults(
            start_time, end_time, country, state, latitude1, latitude2, longitude1, longitude2,
            make_file,
        );
        self.query(&params).await
    }

    /// [`MesoDb::update_db`] with explicit parameters.
    pub async fn update(&self, params: &QueryParams) -> Result<FillReport, MesoDbError> {
        QueryAssembler::new(&self.fetcher, &self.locator)
            .fill(params)
            .await
    }

    /// [`MesoDb::get_db`] with explicit parameters.
    pub async fn query(&self, params: &QueryParams) -> Result<ObservationFrame, MesoDbError> {
        QueryAssembler::new(&self.fetcher, &self.locator)
            .assemble(params)
            .await
    }

    #[allow(clippy::too_many_arguments)]
    fn params_with_defaults(
        &self,
        start_time: Option<DateTime<Utc>>,
        end_time: Option<DateTime<Utc>>,
        country: Option<String>,
        state: Option<String>,
        latitude1: Option<f64>,
        latitude2: Option<f64>,
        longitude1: Option<f64>,
        longitude2: Option<f64>,
        make_file: bool,
    ) -> QueryParams {
        let now = self.locator.now();
        QueryParams {
            start_time: start_time.unwrap_or(now - Duration::hours(DEFAULT_LOOKBACK_HOURS)),
            end_time: end_time.unwrap_or(now),
            country,
            state,
            latitude1,
            latitude2,
            longitude1,
            longitude2,
            make_file,
        }
    }
}
