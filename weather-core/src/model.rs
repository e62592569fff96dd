use chrono::{DateTime, Utc};
use serde::Serialize;

/// Offset between Kelvin and Celsius, used for the API's default unit.
const KELVIN_OFFSET: f64 = 273.15;

/// Current-weather record decoded from one element of the API response.
///
/// `name`, `date` and `response_code` are always present. Every other field
/// that was absent from the source JSON is `None`; nothing is defaulted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherRecord {
    pub name: String,
    /// Observation time, epoch seconds.
    pub date: i64,
    pub response_code: i64,
    /// Only sent by the API on error responses.
    pub message: Option<String>,
    pub location: Option<LocationInfo>,
    pub atmosphere: Option<Atmosphere>,
    pub wind: Option<WindInfo>,
    /// Conditions in the order the API listed them.
    pub conditions: Option<Vec<Condition>>,
}

impl WeatherRecord {
    pub fn observed_at(&self) -> Option<DateTime<Utc>> {
        unix_to_utc(self.date)
    }

    /// `true` when the API reported a failure instead of a measurement.
    pub fn is_error_response(&self) -> bool {
        self.message.is_some() || !(200..300).contains(&self.response_code)
    }

    pub fn primary_condition(&self) -> Option<&Condition> {
        self.conditions.as_deref().and_then(<[Condition]>::first)
    }
}

/// The `sys` block: country and sun times.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LocationInfo {
    pub country_code: Option<String>,
    /// Internal API diagnostic parameter (`sys.message`).
    pub diagnostic_code: Option<f64>,
    pub sunrise: Option<i64>,
    pub sunset: Option<i64>,
}

impl LocationInfo {
    pub fn sunrise_at(&self) -> Option<DateTime<Utc>> {
        self.sunrise.and_then(unix_to_utc)
    }

    pub fn sunset_at(&self) -> Option<DateTime<Utc>> {
        self.sunset.and_then(unix_to_utc)
    }
}

/// The `main` block.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Atmosphere {
    /// In whatever unit the request asked for; Kelvin by default.
    pub temperature: Option<f64>,
    /// hPa.
    pub pressure: Option<f64>,
    /// Percent.
    pub humidity: Option<i32>,
}

impl Atmosphere {
    /// Converts a Kelvin temperature (the API default) to Celsius.
    pub fn temperature_celsius(&self) -> Option<f64> {
        self.temperature.map(|k| k - KELVIN_OFFSET)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WindInfo {
    pub degree: Option<f64>,
    pub speed: Option<f64>,
}

/// One entry of the `weather` array.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Condition {
    pub id: Option<i32>,
    /// Condition group, e.g. "Rain" or "Clear" (`main` on the wire).
    pub category: Option<String>,
    pub description: Option<String>,
    pub icon_code: Option<String>,
}

/// Successful result of [`decode`](crate::decode::decode).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "records", rename_all = "snake_case")]
pub enum DecodeOutcome {
    /// The root array held at least one element; only the first is decoded.
    Records(Vec<WeatherRecord>),
    /// The root array was empty.
    NoData,
}

impl DecodeOutcome {
    /// The first decoded record, if any.
    pub fn record(&self) -> Option<&WeatherRecord> {
        match self {
            DecodeOutcome::Records(records) => records.first(),
            DecodeOutcome::NoData => None,
        }
    }
}

pub(crate) fn unix_to_utc(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(ts, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(code: i64, message: Option<&str>) -> WeatherRecord {
        WeatherRecord {
            name: "Oslo".into(),
            date: 1_610_000_000,
            response_code: code,
            message: message.map(str::to_owned),
            location: None,
            atmosphere: None,
            wind: None,
            conditions: None,
        }
    }

    #[test]
    fn error_response_detection() {
        assert!(!record(200, None).is_error_response());
        assert!(record(404, None).is_error_response());
        assert!(record(200, Some("city not found")).is_error_response());
    }

    #[test]
    fn observed_at_converts_epoch_seconds() {
        let observed = record(200, None).observed_at().expect("valid timestamp");
        assert_eq!(observed.timestamp(), 1_610_000_000);
    }

    #[test]
    fn kelvin_to_celsius() {
        let atmosphere = Atmosphere { temperature: Some(280.5), ..Default::default() };
        let celsius = atmosphere.temperature_celsius().expect("temperature set");
        assert!((celsius - 7.35).abs() < 1e-9);
    }

    #[test]
    fn primary_condition_is_first_in_api_order() {
        let mut rec = record(200, None);
        assert!(rec.primary_condition().is_none());

        rec.conditions = Some(vec![
            Condition { id: Some(500), ..Default::default() },
            Condition { id: Some(701), ..Default::default() },
        ]);
        assert_eq!(rec.primary_condition().and_then(|c| c.id), Some(500));
    }

    #[test]
    fn no_data_has_no_record() {
        assert!(DecodeOutcome::NoData.record().is_none());
        assert!(DecodeOutcome::Records(vec![]).record().is_none());
    }
}
