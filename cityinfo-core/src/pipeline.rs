//! Builds a [`CityReport`] from the individual sources.
//!
//! Geo, summary and current weather are independent and resolved
//! concurrently. Air quality and forecast only run after current weather
//! succeeds (concurrently with each other) and are skipped entirely when it
//! fails.

use crate::{
    adapter::Adapters,
    error::FetchError,
    model::{
        AirQualitySample, CityQuery, CityReport, ForecastSeries, Section, SectionError,
        WeatherSnapshot,
    },
};

#[derive(Debug, Clone)]
pub struct CityReportBuilder {
    adapters: Adapters,
}

impl CityReportBuilder {
    pub fn new(adapters: Adapters) -> Self {
        Self { adapters }
    }

    pub async fn build(&self, query: &CityQuery) -> CityReport {
        build_city_report(&self.adapters, query).await
    }
}

/// Sections that only make sense once current weather is known.
struct Dependents {
    air_quality: Result<AirQualitySample, FetchError>,
    forecast: Result<ForecastSeries, FetchError>,
}

/// Outcome of the weather stage; `dependents` is `None` when weather failed.
struct WeatherStage {
    weather: Result<WeatherSnapshot, FetchError>,
    dependents: Option<Dependents>,
}

async fn weather_stage(adapters: &Adapters, query: &CityQuery) -> WeatherStage {
    let weather = adapters.weather.current(query).await;

    let dependents = match &weather {
        Ok(snapshot) => {
            let (air_quality, forecast) = tokio::join!(
                adapters.air_quality.air_quality(snapshot.coordinates),
                adapters.weather.forecast(query),
            );
            Some(Dependents {
                air_quality,
                forecast,
            })
        }
        Err(_) => None,
    };

    WeatherStage {
        weather,
        dependents,
    }
}

/// Resolve every section for `query`. Section failures are recorded on the
/// report; this never fails as a whole.
#[tracing::instrument(skip_all, fields(city = %query))]
pub async fn build_city_report(adapters: &Adapters, query: &CityQuery) -> CityReport {
    let (geo, summary, stage) = tokio::join!(
        adapters.geo.lookup(query),
        adapters.summary.summary(query),
        weather_stage(adapters, query),
    );

    let mut report = CityReport::empty(query.clone());

    report.geo = record(&mut report, Section::Geo, geo);

    tracing::info!(section = %Section::Summary, available = summary.is_available(), "section resolved");
    report.summary = Some(summary);

    report.weather = record(&mut report, Section::Weather, stage.weather);
    match stage.dependents {
        Some(Dependents {
            air_quality,
            forecast,
        }) => {
            report.air_quality = record(&mut report, Section::AirQuality, air_quality);
            report.forecast = record(&mut report, Section::Forecast, forecast);
        }
        None => {
            tracing::debug!("air quality and forecast skipped: current weather unavailable");
        }
    }

    report
}

fn record<T>(report: &mut CityReport, section: Section, result: Result<T, FetchError>) -> Option<T> {
    match result {
        Ok(value) => {
            tracing::info!(%section, "section resolved");
            Some(value)
        }
        Err(err) => {
            tracing::warn!(%section, error = %err, "section failed");
            report.errors.insert(section, SectionError::from(&err));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        adapter::{AirQualitySource, GeoSource, ProviderId, SummarySource, WeatherSource},
        error::ErrorKind,
        model::{CitySummary, Coordinates, ForecastSeries, GeoProfile},
    };
    use async_trait::async_trait;
    use chrono::DateTime;
    use std::{
        collections::BTreeMap,
        sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        },
    };

    const SPRINGFIELD: Coordinates = Coordinates { lat: 39.8, lon: -89.6 };

    #[derive(Debug, Default)]
    struct FakeWeather {
        fail_current: bool,
        fail_forecast: bool,
        forecast_calls: AtomicUsize,
    }

    #[async_trait]
    impl WeatherSource for FakeWeather {
        async fn current(&self, _city: &CityQuery) -> Result<WeatherSnapshot, FetchError> {
            if self.fail_current {
                return Err(FetchError::provider(ProviderId::OpenWeather, Some(404), "city not found"));
            }
            Ok(WeatherSnapshot {
                location: "Springfield".into(),
                country: "US".into(),
                temperature: 72.0,
                condition: "clear sky".into(),
                humidity: 40,
                wind_speed: Some(5.1),
                pressure: 1012,
                sunrise: DateTime::from_timestamp(1_700_000_000, 0).expect("valid"),
                sunset: DateTime::from_timestamp(1_700_040_000, 0).expect("valid"),
                icon: "01d".into(),
                coordinates: SPRINGFIELD,
            })
        }

        async fn forecast(&self, _city: &CityQuery) -> Result<ForecastSeries, FetchError> {
            self.forecast_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_forecast {
                return Err(FetchError::provider(ProviderId::OpenWeather, Some(404), "city not found"));
            }
            Ok(ForecastSeries {
                city: "Springfield".into(),
                country: "US".into(),
                entries: Vec::new(),
                dropped: Vec::new(),
            })
        }
    }

    #[derive(Debug, Default)]
    struct FakeAirQuality {
        fail: bool,
        calls: AtomicUsize,
        last_coordinates: std::sync::Mutex<Option<Coordinates>>,
    }

    #[async_trait]
    impl AirQualitySource for FakeAirQuality {
        async fn air_quality(&self, at: Coordinates) -> Result<AirQualitySample, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Ok(mut last) = self.last_coordinates.lock() {
                *last = Some(at);
            }
            if self.fail {
                return Err(FetchError::provider(ProviderId::OpenWeather, Some(401), "Invalid API key"));
            }
            Ok(AirQualitySample {
                aqi: 2,
                components: BTreeMap::from([("co".to_string(), 201.9), ("o3".to_string(), 68.7)]),
            })
        }
    }

    #[derive(Debug, Default)]
    struct FakeGeo {
        not_found: bool,
    }

    #[async_trait]
    impl GeoSource for FakeGeo {
        async fn lookup(&self, city: &CityQuery) -> Result<GeoProfile, FetchError> {
            if self.not_found {
                return Err(FetchError::NotFound {
                    provider: ProviderId::GeoNames,
                    query: city.to_string(),
                });
            }
            Ok(GeoProfile {
                name: Some("Springfield".into()),
                country: Some("United States".into()),
                population: Some(116_250),
                timezone: None,
                elevation: None,
                coordinates: SPRINGFIELD,
            })
        }
    }

    #[derive(Debug, Default)]
    struct FakeSummary {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SummarySource for FakeSummary {
        async fn summary(&self, _city: &CityQuery) -> CitySummary {
            self.calls.fetch_add(1, Ordering::SeqCst);
            CitySummary {
                description: "Springfield is the capital of Illinois.".into(),
            }
        }
    }

    struct Fakes {
        weather: Arc<FakeWeather>,
        air: Arc<FakeAirQuality>,
        geo: Arc<FakeGeo>,
        summary: Arc<FakeSummary>,
    }

    impl Fakes {
        fn new(weather: FakeWeather, air: FakeAirQuality, geo: FakeGeo) -> Self {
            Self {
                weather: Arc::new(weather),
                air: Arc::new(air),
                geo: Arc::new(geo),
                summary: Arc::new(FakeSummary::default()),
            }
        }

        fn adapters(&self) -> Adapters {
            Adapters {
                weather: self.weather.clone(),
                air_quality: self.air.clone(),
                geo: self.geo.clone(),
                summary: self.summary.clone(),
            }
        }
    }

    fn query() -> CityQuery {
        CityQuery::new("Springfield").expect("valid query")
    }

    #[tokio::test]
    async fn all_sections_resolve() {
        let fakes = Fakes::new(FakeWeather::default(), FakeAirQuality::default(), FakeGeo::default());

        let report = CityReportBuilder::new(fakes.adapters()).build(&query()).await;

        assert!(report.errors.is_empty());
        assert!(report.is_complete());
        assert_eq!(report.weather.as_ref().map(|w| w.temperature), Some(72.0));
    }

    #[tokio::test]
    async fn air_quality_uses_weather_coordinates() {
        let fakes = Fakes::new(FakeWeather::default(), FakeAirQuality::default(), FakeGeo::default());

        build_city_report(&fakes.adapters(), &query()).await;

        let last = *fakes.air.last_coordinates.lock().expect("lock");
        assert_eq!(last, Some(SPRINGFIELD));
    }

    #[tokio::test]
    async fn geo_failure_does_not_stop_other_sections() {
        let fakes = Fakes::new(
            FakeWeather::default(),
            FakeAirQuality::default(),
            FakeGeo { not_found: true },
        );

        let report = build_city_report(&fakes.adapters(), &query()).await;

        assert!(report.geo.is_none());
        assert_eq!(report.error(Section::Geo).map(|e| e.kind), Some(ErrorKind::NotFound));
        assert_eq!(report.errors.len(), 1);
        assert!(report.summary.is_some());
        assert!(report.weather.is_some());
        assert!(report.air_quality.is_some());
        assert!(report.forecast.is_some());
        assert_eq!(fakes.summary.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn weather_failure_skips_air_quality_and_forecast() {
        let fakes = Fakes::new(
            FakeWeather {
                fail_current: true,
                ..Default::default()
            },
            FakeAirQuality::default(),
            FakeGeo::default(),
        );

        let report = build_city_report(&fakes.adapters(), &query()).await;

        assert!(report.has_error(Section::Weather));
        assert!(report.air_quality.is_none());
        assert!(!report.has_error(Section::AirQuality));
        assert_eq!(fakes.air.calls.load(Ordering::SeqCst), 0);

        assert_eq!(fakes.weather.forecast_calls.load(Ordering::SeqCst), 0);
        assert!(report.forecast.is_none());
        assert!(!report.has_error(Section::Forecast));

        assert_eq!(report.errors.len(), 1);
        assert!(report.geo.is_some());
        assert!(report.summary.is_some());
    }

    #[tokio::test]
    async fn air_quality_failure_is_isolated() {
        let fakes = Fakes::new(
            FakeWeather::default(),
            FakeAirQuality {
                fail: true,
                ..Default::default()
            },
            FakeGeo::default(),
        );

        let report = build_city_report(&fakes.adapters(), &query()).await;

        assert!(report.weather.is_some());
        assert!(report.air_quality.is_none());
        assert_eq!(report.error(Section::AirQuality).map(|e| e.kind), Some(ErrorKind::Provider));
        assert!(report.forecast.is_some());
    }

    #[tokio::test]
    async fn forecast_failure_is_tagged() {
        let fakes = Fakes::new(
            FakeWeather {
                fail_forecast: true,
                ..Default::default()
            },
            FakeAirQuality::default(),
            FakeGeo::default(),
        );

        let report = build_city_report(&fakes.adapters(), &query()).await;

        assert!(report.forecast.is_none());
        assert!(report.has_error(Section::Forecast));
        assert!(report.weather.is_some());
        assert!(report.air_quality.is_some());
    }

    #[tokio::test]
    async fn each_build_starts_fresh() {
        let fakes = Fakes::new(FakeWeather::default(), FakeAirQuality::default(), FakeGeo::default());
        let builder = CityReportBuilder::new(fakes.adapters());

        let first = builder.build(&query()).await;
        let second = builder.build(&CityQuery::new("Shelbyville").expect("valid")).await;

        assert_eq!(first.query.as_str(), "Springfield");
        assert_eq!(second.query.as_str(), "Shelbyville");
        assert_eq!(fakes.air.calls.load(Ordering::SeqCst), 2);
    }
}
