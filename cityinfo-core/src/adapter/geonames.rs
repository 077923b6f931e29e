use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::{
    error::{FetchError, truncate_body},
    model::{CityQuery, Coordinates, GeoProfile},
};

use super::{GeoSource, ProviderId, fetch_body};

const PROVIDER: ProviderId = ProviderId::GeoNames;

/// City metadata from the GeoNames search service.
#[derive(Debug, Clone)]
pub struct GeoNamesAdapter {
    base_url: String,
    username: String,
    http: Client,
}

impl GeoNamesAdapter {
    pub fn new(http: Client, base_url: String, username: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            username,
            http,
        }
    }
}

#[async_trait]
impl GeoSource for GeoNamesAdapter {
    async fn lookup(&self, city: &CityQuery) -> Result<GeoProfile, FetchError> {
        let url = format!("{}/searchJSON", self.base_url);
        tracing::debug!(%url, city = %city, "requesting GeoNames");

        let request = self.http.get(&url).query(&[
            ("q", city.as_str()),
            ("maxRows", "1"),
            ("style", "FULL"),
            ("username", self.username.as_str()),
        ]);

        let (status, body) = fetch_body(PROVIDER, request).await?;
        if status != StatusCode::OK {
            return Err(FetchError::provider(
                PROVIDER,
                Some(status.as_u16()),
                format!("status {status}: {}", truncate_body(&body)),
            ));
        }

        let parsed: GnSearchResponse =
            serde_json::from_str(&body).map_err(|e| FetchError::parse(PROVIDER, e))?;

        profile_from(parsed, city)
    }
}

fn profile_from(parsed: GnSearchResponse, city: &CityQuery) -> Result<GeoProfile, FetchError> {
    // Account and quota problems come back as 200 with a status object.
    if let Some(status) = parsed.status {
        return Err(FetchError::provider(PROVIDER, None, status.message));
    }

    let place = parsed
        .geonames
        .into_iter()
        .next()
        .ok_or_else(|| FetchError::NotFound {
            provider: PROVIDER,
            query: city.to_string(),
        })?;

    let lat = place.lat.as_ref().and_then(Flexible::as_f64);
    let lon = place.lng.as_ref().and_then(Flexible::as_f64);
    let (Some(lat), Some(lon)) = (lat, lon) else {
        return Err(FetchError::parse(PROVIDER, "result is missing lat/lng"));
    };

    Ok(GeoProfile {
        name: place.name,
        country: place.country_name,
        population: place.population.as_ref().and_then(Flexible::as_f64).map(|p| p as u64),
        timezone: place.timezone.and_then(|tz| tz.time_zone_id),
        elevation: place.elevation.as_ref().and_then(Flexible::as_f64).map(|e| e.round() as i64),
        coordinates: Coordinates { lat, lon },
    })
}

/// GeoNames sends coordinates as strings and most other numbers as numbers.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Flexible {
    Number(f64),
    Text(String),
}

impl Flexible {
    fn as_f64(&self) -> Option<f64> {
        match self {
            Flexible::Number(n) => Some(*n),
            Flexible::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GnTimezone {
    time_zone_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GnPlace {
    name: Option<String>,
    country_name: Option<String>,
    population: Option<Flexible>,
    timezone: Option<GnTimezone>,
    elevation: Option<Flexible>,
    lat: Option<Flexible>,
    lng: Option<Flexible>,
}

#[derive(Debug, Deserialize)]
struct GnStatus {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct GnSearchResponse {
    #[serde(default)]
    geonames: Vec<GnPlace>,
    status: Option<GnStatus>,
}
