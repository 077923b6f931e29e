use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;

use crate::{
    error::{FetchError, truncate_body},
    model::{
        AirQualitySample, CityQuery, Coordinates, DroppedForecastEntry, FORECAST_LIMIT,
        ForecastEntry, ForecastSeries, WeatherSnapshot,
    },
    normalize::{parse_forecast_time, unix_to_utc},
};

use super::{AirQualitySource, ProviderId, WeatherSource, fetch_body};

const PROVIDER: ProviderId = ProviderId::OpenWeather;

/// Weather, forecast and air pollution from OpenWeather. Temperatures are always imperial.
#[derive(Debug, Clone)]
pub struct OpenWeatherAdapter {
    base_url: String,
    api_key: String,
    http: Client,
}

/// The `cod` value a successful response carries. Current weather reports a
/// number, forecast reports a string; both are kept as the provider sends them.
#[derive(Debug, Clone, Copy)]
enum SuccessCode {
    Number(u64),
    Text(&'static str),
}

impl SuccessCode {
    fn matches(&self, cod: &Value) -> bool {
        match (self, cod) {
            (SuccessCode::Number(n), Value::Number(v)) => v.as_u64() == Some(*n),
            (SuccessCode::Text(t), Value::String(v)) => v == t,
            _ => false,
        }
    }
}

const CURRENT_OK: SuccessCode = SuccessCode::Number(200);
const FORECAST_OK: SuccessCode = SuccessCode::Text("200");

impl OpenWeatherAdapter {
    pub fn new(http: Client, base_url: String, api_key: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            http,
        }
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<(StatusCode, String), FetchError> {
        let url = format!("{}/data/2.5/{path}", self.base_url);
        tracing::debug!(%url, "requesting OpenWeather");

        let request = self
            .http
            .get(&url)
            .query(query)
            .query(&[("appid", self.api_key.as_str())]);

        fetch_body(PROVIDER, request).await
    }

    fn city_query(city: &CityQuery) -> [(&'static str, String); 2] {
        [("q", city.as_str().to_string()), ("units", "imperial".to_string())]
    }
}

#[async_trait]
impl WeatherSource for OpenWeatherAdapter {
    async fn current(&self, city: &CityQuery) -> Result<WeatherSnapshot, FetchError> {
        let (status, body) = self.get("weather", &Self::city_query(city)).await?;
        ensure_success(status, &body, CURRENT_OK)?;

        let parsed: OwCurrentResponse =
            serde_json::from_str(&body).map_err(|e| FetchError::parse(PROVIDER, e))?;

        snapshot_from(parsed)
    }

    async fn forecast(&self, city: &CityQuery) -> Result<ForecastSeries, FetchError> {
        let (status, body) = self.get("forecast", &Self::city_query(city)).await?;
        ensure_success(status, &body, FORECAST_OK)?;

        let parsed: OwForecastResponse =
            serde_json::from_str(&body).map_err(|e| FetchError::parse(PROVIDER, e))?;

        Ok(series_from(parsed))
    }
}

#[async_trait]
impl AirQualitySource for OpenWeatherAdapter {
    async fn air_quality(&self, at: Coordinates) -> Result<AirQualitySample, FetchError> {
        let query = [("lat", at.lat.to_string()), ("lon", at.lon.to_string())];
        let (status, body) = self.get("air_pollution", &query).await?;

        if !status.is_success() {
            return Err(FetchError::provider(
                PROVIDER,
                Some(status.as_u16()),
                error_message(&body).unwrap_or_else(|| truncate_body(&body)),
            ));
        }

        let parsed: OwPollutionResponse =
            serde_json::from_str(&body).map_err(|e| FetchError::parse(PROVIDER, e))?;

        let first = parsed
            .list
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::parse(PROVIDER, "air pollution response contained no samples"))?;

        Ok(AirQualitySample {
            aqi: first.main.aqi,
            components: first.components,
        })
    }
}

/// Decide whether a weather or forecast body reports success, using both the
/// HTTP status and the endpoint-specific `cod` discriminator.
fn ensure_success(status: StatusCode, body: &str, expected: SuccessCode) -> Result<(), FetchError> {
    let envelope: OwEnvelope = match serde_json::from_str(body) {
        Ok(envelope) => envelope,
        Err(e) if status.is_success() => return Err(FetchError::parse(PROVIDER, e)),
        Err(_) => {
            return Err(FetchError::provider(
                PROVIDER,
                Some(status.as_u16()),
                truncate_body(body),
            ));
        }
    };

    let cod_ok = envelope.cod.as_ref().is_some_and(|cod| expected.matches(cod));
    if cod_ok && status.is_success() {
        return Ok(());
    }

    let message = match envelope.message {
        Some(Value::String(m)) if !m.is_empty() => m,
        _ => "Unknown error".to_string(),
    };
    Err(FetchError::provider(PROVIDER, Some(status.as_u16()), message))
}

fn error_message(body: &str) -> Option<String> {
    let envelope: OwEnvelope = serde_json::from_str(body).ok()?;
    match envelope.message {
        Some(Value::String(m)) => Some(m),
        _ => None,
    }
}

fn snapshot_from(parsed: OwCurrentResponse) -> Result<WeatherSnapshot, FetchError> {
    let coord = parsed
        .coord
        .ok_or_else(|| FetchError::parse(PROVIDER, "current weather response has no coordinates"))?;

    let sunrise = unix_to_utc(parsed.sys.sunrise)
        .ok_or_else(|| FetchError::parse(PROVIDER, "sunrise timestamp out of range"))?;
    let sunset = unix_to_utc(parsed.sys.sunset)
        .ok_or_else(|| FetchError::parse(PROVIDER, "sunset timestamp out of range"))?;

    let (condition, icon) = first_condition(parsed.weather);

    Ok(WeatherSnapshot {
        location: parsed.name,
        country: parsed.sys.country,
        temperature: parsed.main.temp,
        condition,
        humidity: parsed.main.humidity,
        wind_speed: parsed.wind.and_then(|w| w.speed),
        pressure: parsed.main.pressure,
        sunrise,
        sunset,
        icon,
        coordinates: Coordinates {
            lat: coord.lat,
            lon: coord.lon,
        },
    })
}

/// Keep the first [`FORECAST_LIMIT`] entries; drop any whose timestamp does not parse.
fn series_from(parsed: OwForecastResponse) -> ForecastSeries {
    let mut entries = Vec::with_capacity(FORECAST_LIMIT);
    let mut dropped = Vec::new();

    for raw in parsed.list.into_iter().take(FORECAST_LIMIT) {
        match parse_forecast_time(&raw.dt_txt) {
            Ok(timestamp) => {
                let (condition, icon) = first_condition(raw.weather);
                entries.push(ForecastEntry {
                    timestamp,
                    temperature: raw.main.temp,
                    condition,
                    pressure: raw.main.pressure,
                    humidity: raw.main.humidity,
                    icon,
                });
            }
            Err(e) => {
                let err = FetchError::parse(PROVIDER, format!("forecast time '{}': {e}", raw.dt_txt));
                tracing::warn!(error = %err, "dropping forecast entry");
                dropped.push(DroppedForecastEntry {
                    raw_timestamp: raw.dt_txt,
                    reason: err.to_string(),
                });
            }
        }
    }

    ForecastSeries {
        city: parsed.city.name,
        country: parsed.city.country,
        entries,
        dropped,
    }
}

fn first_condition(weather: Vec<OwWeather>) -> (String, String) {
    weather
        .into_iter()
        .next()
        .map(|w| (w.description, w.icon))
        .unwrap_or_else(|| ("Unknown".to_string(), String::new()))
}

#[derive(Debug, Deserialize)]
struct OwEnvelope {
    #[serde(default)]
    cod: Option<Value>,
    #[serde(default)]
    message: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    humidity: u8,
    pressure: u32,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    #[serde(default)]
    description: String,
    #[serde(default)]
    icon: String,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwCoord {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct OwSys {
    #[serde(default)]
    country: String,
    sunrise: i64,
    sunset: i64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    #[serde(default)]
    name: String,
    coord: Option<OwCoord>,
    main: OwMain,
    #[serde(default)]
    weather: Vec<OwWeather>,
    wind: Option<OwWind>,
    sys: OwSys,
}

#[derive(Debug, Deserialize)]
struct OwCity {
    #[serde(default)]
    name: String,
    #[serde(default)]
    country: String,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    #[serde(default)]
    dt_txt: String,
    main: OwMain,
    #[serde(default)]
    weather: Vec<OwWeather>,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    city: OwCity,
    #[serde(default)]
    list: Vec<OwForecastEntry>,
}

#[derive(Debug, Deserialize)]
struct OwPollutionMain {
    aqi: u8,
}

#[derive(Debug, Deserialize)]
struct OwPollutionEntry {
    main: OwPollutionMain,
    #[serde(default)]
    components: BTreeMap<String, f64>,
}

#[derive(Debug, Deserialize)]
struct OwPollutionResponse {
    #[serde(default)]
    list: Vec<OwPollutionEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn forecast_item(dt_txt: &str, temp: f64) -> Value {
        json!({
            "dt_txt": dt_txt,
            "main": { "temp": temp, "humidity": 60, "pressure": 1015 },
            "weather": [{ "description": "light rain", "icon": "10d" }]
        })
    }

    #[test]
    fn current_requires_numeric_cod() {
        let ok = r#"{"cod": 200}"#;
        assert!(ensure_success(StatusCode::OK, ok, CURRENT_OK).is_ok());

        let textual = r#"{"cod": "200"}"#;
        assert!(ensure_success(StatusCode::OK, textual, CURRENT_OK).is_err());
    }

    #[test]
    fn forecast_requires_string_cod() {
        let ok = r#"{"cod": "200", "message": 0}"#;
        assert!(ensure_success(StatusCode::OK, ok, FORECAST_OK).is_ok());

        let numeric = r#"{"cod": 200}"#;
        assert!(ensure_success(StatusCode::OK, numeric, FORECAST_OK).is_err());
    }

    #[test]
    fn provider_message_is_surfaced() {
        let body = r#"{"cod": "404", "message": "city not found"}"#;
        let err = ensure_success(StatusCode::NOT_FOUND, body, CURRENT_OK).unwrap_err();

        match err {
            FetchError::Provider { status, message, .. } => {
                assert_eq!(status, Some(404));
                assert_eq!(message, "city not found");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_message_falls_back_to_unknown() {
        let err = ensure_success(StatusCode::OK, r#"{"cod": 500}"#, CURRENT_OK).unwrap_err();
        assert!(err.to_string().ends_with("Unknown error"));
    }

    #[test]
    fn non_json_error_body_is_provider_error() {
        let err = ensure_success(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>", CURRENT_OK)
            .unwrap_err();
        assert!(matches!(err, FetchError::Provider { status: Some(502), .. }));
    }

    #[test]
    fn series_is_capped_at_five() {
        let list: Vec<Value> = (0..40)
            .map(|i| forecast_item(&format!("2024-03-{:02} 12:00:00", 1 + i % 28), 50.0 + i as f64))
            .collect();
        let parsed: OwForecastResponse = serde_json::from_value(json!({
            "cod": "200",
            "city": { "name": "Springfield", "country": "US" },
            "list": list
        }))
        .expect("valid forecast");

        let series = series_from(parsed);
        assert_eq!(series.entries.len(), 5);
        assert_eq!(series.entries[0].temperature, 50.0);
        assert_eq!(series.entries[4].temperature, 54.0);
        assert!(series.dropped.is_empty());
    }

    #[test]
    fn unparsable_forecast_time_drops_only_that_entry() {
        let parsed: OwForecastResponse = serde_json::from_value(json!({
            "city": { "name": "Springfield", "country": "US" },
            "list": [
                forecast_item("2024-03-09 12:00:00", 50.0),
                forecast_item("09.03.2024 15:00", 51.0),
                forecast_item("2024-03-09 18:00:00", 52.0),
            ]
        }))
        .expect("valid forecast");

        let series = series_from(parsed);
        assert_eq!(series.entries.len(), 2);
        assert_eq!(series.entries[1].display_time(), "03/09/2024 18:00");
        assert_eq!(series.dropped.len(), 1);
        assert_eq!(series.dropped[0].raw_timestamp, "09.03.2024 15:00");
        assert!(series.dropped[0].reason.contains("Failed to parse openweather response"));
    }

    #[test]
    fn snapshot_without_wind_has_no_speed() {
        let parsed: OwCurrentResponse = serde_json::from_value(json!({
            "cod": 200,
            "name": "Springfield",
            "main": { "temp": 72.0, "humidity": 40, "pressure": 1012 },
            "weather": [{ "description": "clear sky", "icon": "01d" }],
            "sys": { "country": "US", "sunrise": 1700000000, "sunset": 1700040000 },
            "coord": { "lat": 39.8, "lon": -89.6 }
        }))
        .expect("valid weather");

        let snapshot = snapshot_from(parsed).expect("snapshot");
        assert_eq!(snapshot.wind_speed, None);
        assert_eq!(snapshot.display_wind_speed(), "N/A");
        assert_eq!(snapshot.display_condition(), "Clear sky");
        assert_eq!(snapshot.coordinates, Coordinates { lat: 39.8, lon: -89.6 });
    }

    #[test]
    fn snapshot_without_coordinates_is_parse_error() {
        let parsed: OwCurrentResponse = serde_json::from_value(json!({
            "name": "Springfield",
            "main": { "temp": 72.0, "humidity": 40, "pressure": 1012 },
            "sys": { "sunrise": 1700000000, "sunset": 1700040000 }
        }))
        .expect("valid weather");

        assert!(matches!(snapshot_from(parsed), Err(FetchError::Parse { .. })));
    }
}
