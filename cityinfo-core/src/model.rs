use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;

use crate::error::{ErrorKind, FetchError};
use crate::normalize::{
    self, NO_DESCRIPTION, capitalize, display_or_na, format_forecast_time, format_utc_clock,
};

/// Maximum number of forecast entries kept from a provider response.
pub const FORECAST_LIMIT: usize = 5;

/// A city name as typed by the user, trimmed and known to be non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CityQuery(String);

impl CityQuery {
    pub fn new(name: impl AsRef<str>) -> Result<Self, FetchError> {
        let trimmed = name.as_ref().trim();
        if trimmed.is_empty() {
            return Err(FetchError::InvalidQuery);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CityQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// City metadata from the geocoding provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoProfile {
    pub name: Option<String>,
    pub country: Option<String>,
    pub population: Option<u64>,
    pub timezone: Option<String>,
    /// Metres above sea level.
    pub elevation: Option<i64>,
    pub coordinates: Coordinates,
}

impl GeoProfile {
    pub fn display_name(&self) -> String {
        display_or_na(self.name.as_ref())
    }

    pub fn display_country(&self) -> String {
        display_or_na(self.country.as_ref())
    }

    pub fn display_population(&self) -> String {
        display_or_na(self.population.as_ref())
    }

    pub fn display_timezone(&self) -> String {
        display_or_na(self.timezone.as_ref())
    }

    pub fn display_elevation(&self) -> String {
        display_or_na(self.elevation.as_ref())
    }
}

/// Current conditions, in imperial units.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherSnapshot {
    pub location: String,
    pub country: String,
    /// Degrees Fahrenheit.
    pub temperature: f64,
    pub condition: String,
    pub humidity: u8,
    /// Miles per hour.
    pub wind_speed: Option<f64>,
    /// hPa.
    pub pressure: u32,
    pub sunrise: DateTime<Utc>,
    pub sunset: DateTime<Utc>,
    pub icon: String,
    pub coordinates: Coordinates,
}

impl WeatherSnapshot {
    pub fn icon_url(&self) -> String {
        normalize::icon_url(&self.icon)
    }

    pub fn display_condition(&self) -> String {
        capitalize(&self.condition)
    }

    pub fn display_wind_speed(&self) -> String {
        display_or_na(self.wind_speed.as_ref())
    }

    pub fn display_sunrise(&self) -> String {
        format_utc_clock(&self.sunrise)
    }

    pub fn display_sunset(&self) -> String {
        format_utc_clock(&self.sunset)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastEntry {
    pub timestamp: NaiveDateTime,
    pub temperature: f64,
    pub condition: String,
    pub pressure: u32,
    pub humidity: u8,
    pub icon: String,
}

impl ForecastEntry {
    /// `MM/DD/YYYY HH:MM`.
    pub fn display_time(&self) -> String {
        format_forecast_time(&self.timestamp)
    }

    pub fn display_condition(&self) -> String {
        capitalize(&self.condition)
    }

    pub fn icon_url(&self) -> String {
        normalize::icon_url(&self.icon)
    }
}

/// A forecast entry removed because its timestamp could not be parsed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DroppedForecastEntry {
    pub raw_timestamp: String,
    pub reason: String,
}

/// Up to [`FORECAST_LIMIT`] entries, in provider order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastSeries {
    pub city: String,
    pub country: String,
    pub entries: Vec<ForecastEntry>,
    pub dropped: Vec<DroppedForecastEntry>,
}

/// Pollutants shown to users; anything else stays in the raw sample only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Pollutant {
    Co,
    No,
    No2,
    Pm2_5,
    Pm10,
}

impl Pollutant {
    pub const DISPLAYED: [Pollutant; 5] = [
        Pollutant::Co,
        Pollutant::No,
        Pollutant::No2,
        Pollutant::Pm2_5,
        Pollutant::Pm10,
    ];

    /// Component key used by the air-quality provider.
    pub fn code(&self) -> &'static str {
        match self {
            Pollutant::Co => "co",
            Pollutant::No => "no",
            Pollutant::No2 => "no2",
            Pollutant::Pm2_5 => "pm2_5",
            Pollutant::Pm10 => "pm10",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Pollutant::Co => "CO",
            Pollutant::No => "NO",
            Pollutant::No2 => "NO2",
            Pollutant::Pm2_5 => "PM2.5",
            Pollutant::Pm10 => "PM10",
        }
    }

    pub fn definition(&self) -> &'static str {
        match self {
            Pollutant::Co => {
                "Carbon Monoxide (CO): A colorless, odorless gas that can be harmful when inhaled in large amounts."
            }
            Pollutant::No => {
                "Nitric Oxide (NO): A precursor to nitrogen dioxide, found in vehicle emissions."
            }
            Pollutant::No2 => {
                "Nitrogen Dioxide (NO2): Contributes to air pollution and respiratory problems."
            }
            Pollutant::Pm2_5 => {
                "Particulate Matter (PM2.5): Fine inhalable particles that can cause health issues."
            }
            Pollutant::Pm10 => {
                "Particulate Matter (PM10): Larger inhalable particles that can cause respiratory issues."
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AirQualitySample {
    /// Ordinal index, 1 (good) to 5 (very poor).
    pub aqi: u8,
    /// Raw concentrations in µg/m³, keyed by provider component code.
    pub components: BTreeMap<String, f64>,
}

impl AirQualitySample {
    /// Allow-listed pollutants present in the sample, in fixed display order.
    pub fn displayed(&self) -> Vec<(Pollutant, f64)> {
        Pollutant::DISPLAYED
            .iter()
            .filter_map(|p| self.components.get(p.code()).map(|v| (*p, *v)))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CitySummary {
    pub description: String,
}

impl CitySummary {
    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn is_available(&self) -> bool {
        self.description != NO_DESCRIPTION
    }
}

impl Default for CitySummary {
    fn default() -> Self {
        Self {
            description: NO_DESCRIPTION.to_string(),
        }
    }
}

/// Independently resolvable parts of a [`CityReport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Section {
    Geo,
    Summary,
    Weather,
    AirQuality,
    Forecast,
}

impl Section {
    pub const ALL: [Section; 5] = [
        Section::Geo,
        Section::Summary,
        Section::Weather,
        Section::AirQuality,
        Section::Forecast,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Geo => "geo",
            Section::Summary => "summary",
            Section::Weather => "weather",
            Section::AirQuality => "airQuality",
            Section::Forecast => "forecast",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionError {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&FetchError> for SectionError {
    fn from(err: &FetchError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Everything gathered for one query. Sections are independent; a failed
/// section is `None` and has an entry in `errors`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityReport {
    pub query: CityQuery,
    pub geo: Option<GeoProfile>,
    pub summary: Option<CitySummary>,
    pub weather: Option<WeatherSnapshot>,
    pub air_quality: Option<AirQualitySample>,
    pub forecast: Option<ForecastSeries>,
    pub errors: BTreeMap<Section, SectionError>,
}

impl CityReport {
    pub fn empty(query: CityQuery) -> Self {
        Self {
            query,
            geo: None,
            summary: None,
            weather: None,
            air_quality: None,
            forecast: None,
            errors: BTreeMap::new(),
        }
    }

    pub fn has_error(&self, section: Section) -> bool {
        self.errors.contains_key(&section)
    }

    pub fn error(&self, section: Section) -> Option<&SectionError> {
        self.errors.get(&section)
    }

    pub fn is_present(&self, section: Section) -> bool {
        match section {
            Section::Geo => self.geo.is_some(),
            Section::Summary => self.summary.is_some(),
            Section::Weather => self.weather.is_some(),
            Section::AirQuality => self.air_quality.is_some(),
            Section::Forecast => self.forecast.is_some(),
        }
    }

    /// No errors and every section populated.
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty() && Section::ALL.iter().all(|s| self.is_present(*s))
    }
}
