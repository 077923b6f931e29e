use serde::Serialize;
use thiserror::Error;

use crate::adapter::ProviderId;

/// Failure of a single fetch against one provider.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Missing or invalid credentials; raised before any request is sent.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("City name must not be empty")]
    InvalidQuery,

    #[error("{provider} returned no results for '{query}'")]
    NotFound { provider: ProviderId, query: String },

    #[error("{provider} error: {message}")]
    Provider {
        provider: ProviderId,
        status: Option<u16>,
        message: String,
    },

    #[error("Failed to parse {provider} response: {message}")]
    Parse { provider: ProviderId, message: String },

    #[error("Request to {provider} failed: {source}")]
    Transport {
        provider: ProviderId,
        #[source]
        source: reqwest::Error,
    },
}

/// Coarse classification of a [`FetchError`], recorded on failed report sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Configuration,
    NotFound,
    Provider,
    Parse,
    Transport,
}

impl FetchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::Configuration(_) => ErrorKind::Configuration,
            FetchError::InvalidQuery => ErrorKind::Configuration,
            FetchError::NotFound { .. } => ErrorKind::NotFound,
            FetchError::Provider { .. } => ErrorKind::Provider,
            FetchError::Parse { .. } => ErrorKind::Parse,
            FetchError::Transport { .. } => ErrorKind::Transport,
        }
    }

    pub(crate) fn provider(provider: ProviderId, status: Option<u16>, message: impl Into<String>) -> Self {
        FetchError::Provider {
            provider,
            status,
            message: message.into(),
        }
    }

    pub(crate) fn parse(provider: ProviderId, message: impl ToString) -> Self {
        FetchError::Parse {
            provider,
            message: message.to_string(),
        }
    }

    pub(crate) fn transport(provider: ProviderId) -> impl FnOnce(reqwest::Error) -> Self {
        move |source| FetchError::Transport { provider, source }
    }
}

/// Shorten a provider response body for inclusion in error messages.
pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_carries_message() {
        let err = FetchError::provider(ProviderId::OpenWeather, Some(404), "city not found");
        assert_eq!(err.to_string(), "openweather error: city not found");
    }

    #[test]
    fn kinds_follow_variants() {
        assert_eq!(FetchError::Configuration("x".into()).kind(), ErrorKind::Configuration);
        assert_eq!(
            FetchError::NotFound { provider: ProviderId::GeoNames, query: "Nowhere".into() }.kind(),
            ErrorKind::NotFound
        );
        assert_eq!(FetchError::parse(ProviderId::OpenWeather, "bad").kind(), ErrorKind::Parse);
    }

    #[test]
    fn truncate_body_respects_char_boundaries() {
        let body = "é".repeat(150);
        let short = truncate_body(&body);
        assert!(short.ends_with("..."));
        assert!(short.len() <= 203);

        assert_eq!(truncate_body("short"), "short");
    }
}
