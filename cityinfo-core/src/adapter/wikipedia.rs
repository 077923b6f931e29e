use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;

use crate::model::{CityQuery, CitySummary};

use super::{ProviderId, SummarySource, fetch_body};

const PROVIDER: ProviderId = ProviderId::Wikipedia;

/// Page summaries from the Wikipedia REST API.
///
/// Every failure degrades to [`CitySummary::unavailable`]; callers never see an error.
#[derive(Debug, Clone)]
pub struct WikipediaAdapter {
    base_url: String,
    http: Client,
}

impl WikipediaAdapter {
    pub fn new(http: Client, base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        }
    }

    fn summary_url(&self, city: &CityQuery) -> Option<Url> {
        let mut url = Url::parse(&self.base_url).ok()?;
        url.path_segments_mut()
            .ok()?
            .pop_if_empty()
            .extend(["api", "rest_v1", "page", "summary"])
            .push(&page_title(city));
        Some(url)
    }
}

/// Page title for a city name: spaces become underscores, case is untouched.
pub fn page_title(city: &CityQuery) -> String {
    city.as_str().replace(' ', "_")
}

#[async_trait]
impl SummarySource for WikipediaAdapter {
    async fn summary(&self, city: &CityQuery) -> CitySummary {
        let Some(url) = self.summary_url(city) else {
            tracing::warn!(base_url = %self.base_url, "invalid Wikipedia base URL");
            return CitySummary::unavailable();
        };
        tracing::debug!(%url, "requesting Wikipedia summary");

        let (status, body) = match fetch_body(PROVIDER, self.http.get(url)).await {
            Ok(res) => res,
            Err(e) => {
                tracing::warn!(error = %e, "summary request failed");
                return CitySummary::unavailable();
            }
        };

        if status != StatusCode::OK {
            tracing::debug!(%status, "no summary available");
            return CitySummary::unavailable();
        }

        match serde_json::from_str::<WpSummary>(&body) {
            Ok(WpSummary { extract: Some(text) }) if !text.trim().is_empty() => CitySummary { description: text },
            Ok(_) => CitySummary::unavailable(),
            Err(e) => {
                tracing::warn!(error = %e, "undecodable summary response");
                CitySummary::unavailable()
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct WpSummary {
    extract: Option<String>,
}
