//! Display normalization shared by the data model and the adapters.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Placeholder rendered for optional fields a provider did not supply.
pub const NOT_AVAILABLE: &str = "N/A";

/// Placeholder used when no encyclopedia summary could be retrieved.
pub const NO_DESCRIPTION: &str = "No description available.";

/// Timestamp layout of forecast `dt_txt` values.
pub const FORECAST_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Layout used when showing forecast timestamps.
pub const FORECAST_DISPLAY_FORMAT: &str = "%m/%d/%Y %H:%M";

const ICON_BASE_URL: &str = "http://openweathermap.org/img/wn";

pub fn display_or_na<T: ToString>(value: Option<&T>) -> String {
    value
        .map(ToString::to_string)
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

pub fn parse_forecast_time(raw: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(raw, FORECAST_TIME_FORMAT)
}

pub fn format_forecast_time(ts: &NaiveDateTime) -> String {
    ts.format(FORECAST_DISPLAY_FORMAT).to_string()
}

/// `HH:MM:SS UTC`, as used for sunrise and sunset.
pub fn format_utc_clock(ts: &DateTime<Utc>) -> String {
    format!("{} UTC", ts.format("%H:%M:%S"))
}

/// URL of the condition icon for a provider icon code. Existence is not checked.
pub fn icon_url(code: &str) -> String {
    format!("{ICON_BASE_URL}/{code}@2x.png")
}

/// Upper-case the first character and lower-case the rest.
pub fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

pub(crate) fn unix_to_utc(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(ts, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_values_render_sentinel() {
        assert_eq!(display_or_na::<u64>(None), "N/A");
        assert_eq!(display_or_na(Some(&116_250u64)), "116250");
    }

    #[test]
    fn forecast_time_is_reformatted() {
        let ts = parse_forecast_time("2024-03-09 15:00:00").expect("valid timestamp");
        assert_eq!(format_forecast_time(&ts), "03/09/2024 15:00");
    }

    #[test]
    fn forecast_time_rejects_other_layouts() {
        assert!(parse_forecast_time("2024-03-09T15:00:00Z").is_err());
        assert!(parse_forecast_time("").is_err());
    }

    #[test]
    fn icon_url_is_templated() {
        assert_eq!(icon_url("01d"), "http://openweathermap.org/img/wn/01d@2x.png");
    }

    #[test]
    fn capitalize_lowercases_the_rest() {
        assert_eq!(capitalize("clear sky"), "Clear sky");
        assert_eq!(capitalize("CLEAR Sky"), "Clear sky");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn utc_clock() {
        let ts = unix_to_utc(1_700_000_000).expect("in range");
        assert_eq!(format_utc_clock(&ts), "22:13:20 UTC");
    }
}
