use std::fmt::Write;

use chrono::{DateTime, Utc};
use weather_core::{DecodeOutcome, Units, WeatherRecord};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M UTC";

fn format_time(t: DateTime<Utc>) -> String {
    t.format(TIME_FORMAT).to_string()
}

/// Formats a decode outcome for the terminal.
pub fn render(outcome: &DecodeOutcome, units: Units) -> String {
    match outcome.record() {
        Some(record) => render_record(record, units),
        None => "No weather data found.\n".to_string(),
    }
}

fn render_record(rec: &WeatherRecord, units: Units) -> String {
    let mut out = String::new();

    if rec.is_error_response() {
        let reason = rec.message.as_deref().unwrap_or("no reason given");
        let _ = writeln!(out, "Weather service returned error {}: {}", rec.response_code, reason);
        return out;
    }

    match rec.location.as_ref().and_then(|l| l.country_code.as_deref()) {
        Some(country) => {
            let _ = writeln!(out, "{}, {country}", rec.name);
        }
        None => {
            let _ = writeln!(out, "{}", rec.name);
        }
    }

    if let Some(observed) = rec.observed_at() {
        let _ = writeln!(out, "Observed:    {}", format_time(observed));
    }

    if let Some(conditions) = &rec.conditions {
        for c in conditions {
            match (c.category.as_deref(), c.description.as_deref()) {
                (Some(cat), Some(desc)) => {
                    let _ = writeln!(out, "Conditions:  {cat} ({desc})");
                }
                (Some(text), None) | (None, Some(text)) => {
                    let _ = writeln!(out, "Conditions:  {text}");
                }
                (None, None) => {}
            }
        }
    }

    if let Some(main) = &rec.atmosphere {
        if let Some(temp) = main.temperature {
            let _ = writeln!(out, "Temperature: {temp:.1} {}", units.temperature_suffix());
        }
        if let Some(pressure) = main.pressure {
            let _ = writeln!(out, "Pressure:    {pressure:.0} hPa");
        }
        if let Some(humidity) = main.humidity {
            let _ = writeln!(out, "Humidity:    {humidity}%");
        }
    }

    if let Some(wind) = &rec.wind {
        match (wind.speed, wind.degree) {
            (Some(speed), Some(deg)) => {
                let _ = writeln!(out, "Wind:        {speed:.1} {} from {deg:.0}°", units.speed_suffix());
            }
            (Some(speed), None) => {
                let _ = writeln!(out, "Wind:        {speed:.1} {}", units.speed_suffix());
            }
            _ => {}
        }
    }

    if let Some(location) = &rec.location {
        if let Some(sunrise) = location.sunrise_at() {
            let _ = writeln!(out, "Sunrise:     {}", format_time(sunrise));
        }
        if let Some(sunset) = location.sunset_at() {
            let _ = writeln!(out, "Sunset:      {}", format_time(sunset));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decoded(json: &str) -> DecodeOutcome {
        weather_core::decode(json.as_bytes()).expect("valid response")
    }

    #[test]
    fn renders_full_record() {
        let outcome = decoded(
            r#"[{"name":"London","dt":1610000000,"cod":200,
                "main":{"temp":7.4,"pressure":1012.0,"humidity":87},
                "wind":{"deg":200.0,"speed":3.1},
                "sys":{"country":"GB","sunrise":1609999000,"sunset":1610030000},
                "weather":[{"id":800,"main":"Clear","description":"clear sky","icon":"01d"}]}]"#,
        );

        let text = render(&outcome, Units::Metric);
        assert!(text.starts_with("London, GB\n"));
        assert!(text.contains("Observed:    2021-01-07 06:13 UTC"));
        assert!(text.contains("Conditions:  Clear (clear sky)"));
        assert!(text.contains("Temperature: 7.4 °C"));
        assert!(text.contains("Humidity:    87%"));
        assert!(text.contains("Wind:        3.1 m/s from 200°"));
        assert!(text.contains("Sunset:      2021-01-07 14:33 UTC"));
    }

    #[test]
    fn renders_no_data() {
        assert_eq!(render(&DecodeOutcome::NoData, Units::Standard), "No weather data found.\n");
    }

    #[test]
    fn renders_error_response() {
        let outcome = decoded(r#"[{"name":"Nowhere","dt":0,"cod":404,"message":"city not found"}]"#);
        let text = render(&outcome, Units::Standard);
        assert_eq!(text, "Weather service returned error 404: city not found\n");
    }

    #[test]
    fn skips_unset_sections() {
        let outcome = decoded(r#"[{"name":"Kyiv","dt":0,"cod":200}]"#);
        let text = render(&outcome, Units::Standard);
        assert_eq!(text, "Kyiv\nObserved:    1970-01-01 00:00 UTC\n");
    }
}
