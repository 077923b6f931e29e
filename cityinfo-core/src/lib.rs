//! Core library for the `cityinfo` CLI.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - Fetch adapters for the weather, geocoding and summary providers
//! - The pipeline that combines them into a single [`CityReport`]
//! - Shared domain models and their display normalization
//!
//! It is used by `cityinfo-cli`, but can also be reused by other binaries or services.

pub mod adapter;
pub mod config;
pub mod error;
pub mod model;
pub mod normalize;
pub mod pipeline;

pub use adapter::{Adapters, AirQualitySource, GeoSource, ProviderId, SummarySource, WeatherSource};
pub use config::{Config, Credentials};
pub use error::{ErrorKind, FetchError};
pub use model::{
    AirQualitySample, CityQuery, CityReport, CitySummary, Coordinates, ForecastEntry,
    ForecastSeries, GeoProfile, Pollutant, Section, SectionError, WeatherSnapshot,
};
pub use pipeline::{CityReportBuilder, build_city_report};
