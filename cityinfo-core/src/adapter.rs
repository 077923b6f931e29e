use crate::{
    Config, FetchError,
    adapter::{geonames::GeoNamesAdapter, openweather::OpenWeatherAdapter, wikipedia::WikipediaAdapter},
    model::{
        AirQualitySample, CityQuery, CitySummary, Coordinates, ForecastSeries, GeoProfile,
        WeatherSnapshot,
    },
};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use std::{fmt::Debug, sync::Arc};

pub mod geonames;
pub mod openweather;
pub mod wikipedia;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    OpenWeather,
    GeoNames,
    Wikipedia,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::OpenWeather => "openweather",
            ProviderId::GeoNames => "geonames",
            ProviderId::Wikipedia => "wikipedia",
        }
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current conditions and the short-range forecast for a city.
#[async_trait]
pub trait WeatherSource: Send + Sync + Debug {
    async fn current(&self, city: &CityQuery) -> Result<WeatherSnapshot, FetchError>;
    async fn forecast(&self, city: &CityQuery) -> Result<ForecastSeries, FetchError>;
}

/// Air quality at a coordinate already resolved by a [`WeatherSource`].
#[async_trait]
pub trait AirQualitySource: Send + Sync + Debug {
    async fn air_quality(&self, at: Coordinates) -> Result<AirQualitySample, FetchError>;
}

#[async_trait]
pub trait GeoSource: Send + Sync + Debug {
    async fn lookup(&self, city: &CityQuery) -> Result<GeoProfile, FetchError>;
}

/// Encyclopedia summary. Never fails: problems yield the sentinel summary.
#[async_trait]
pub trait SummarySource: Send + Sync + Debug {
    async fn summary(&self, city: &CityQuery) -> CitySummary;
}

/// One instance of every source the report pipeline needs.
#[derive(Debug, Clone)]
pub struct Adapters {
    pub weather: Arc<dyn WeatherSource>,
    pub air_quality: Arc<dyn AirQualitySource>,
    pub geo: Arc<dyn GeoSource>,
    pub summary: Arc<dyn SummarySource>,
}

impl Adapters {
    /// Construct the HTTP adapters. Fails before any request if a credential is missing.
    pub fn from_config(config: &Config) -> Result<Self, FetchError> {
        let credentials = config.credentials()?;
        let http = build_client(config)?;

        let openweather = Arc::new(OpenWeatherAdapter::new(
            http.clone(),
            config.endpoints.openweather.clone(),
            credentials.openweather_api_key,
        ));

        Ok(Self {
            weather: openweather.clone(),
            air_quality: openweather,
            geo: Arc::new(GeoNamesAdapter::new(
                http.clone(),
                config.endpoints.geonames.clone(),
                credentials.geonames_username,
            )),
            summary: Arc::new(WikipediaAdapter::new(http, config.endpoints.wikipedia.clone())),
        })
    }
}

fn build_client(config: &Config) -> Result<Client, FetchError> {
    Client::builder()
        .timeout(config.http.timeout())
        .user_agent(config.http.user_agent.clone())
        .build()
        .map_err(|e| FetchError::Configuration(format!("Failed to build HTTP client: {e}")))
}

/// Send a request and read the whole body, whatever the status.
pub(crate) async fn fetch_body(
    provider: ProviderId,
    request: RequestBuilder,
) -> Result<(StatusCode, String), FetchError> {
    let res = request.send().await.map_err(FetchError::transport(provider))?;

    let status = res.status();
    tracing::debug!(%provider, %status, "provider responded");

    let body = res.text().await.map_err(FetchError::transport(provider))?;
    Ok((status, body))
}
