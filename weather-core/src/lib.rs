//! Core library for the `weather` CLI.
//!
//! This crate defines:
//! - The streaming decoder for current-weather API responses
//! - Shared domain models (weather records and their sub-records)
//! - Configuration & credentials handling
//! - The OpenWeather byte-stream source feeding the decoder
//!
//! It is used by `weather-cli`, but can also be reused by other binaries or services.

pub mod config;
pub mod decode;
pub mod model;
pub mod source;

pub use config::{Config, Units};
pub use decode::{DecodeError, DecodeState, decode};
pub use model::{Atmosphere, Condition, DecodeOutcome, LocationInfo, WeatherRecord, WindInfo};
pub use source::{OpenWeatherSource, WeatherSource, current_weather};
