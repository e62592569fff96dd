use serde::de::{IgnoredAny, MapAccess};

use crate::model::{Atmosphere, Condition, LocationInfo, WeatherRecord, WindInfo};

use super::{ListSeed, Record, RecordSeed, Tracker};

#[derive(Debug, Default)]
pub(super) struct WeatherRecordBuilder {
    name: Option<String>,
    date: Option<i64>,
    response_code: Option<i64>,
    message: Option<String>,
    location: Option<LocationInfo>,
    atmosphere: Option<Atmosphere>,
    wind: Option<WindInfo>,
    conditions: Option<Vec<Condition>>,
}

impl Record for WeatherRecord {
    const NAME: &'static str = "weather record";
    const FIELDS: &'static [&'static str] =
        &["name", "dt", "cod", "message", "sys", "main", "wind", "weather"];

    type Builder = WeatherRecordBuilder;

    fn read_field<'de, A: MapAccess<'de>>(
        b: &mut Self::Builder,
        field: &'static str,
        map: &mut A,
        tracker: &Tracker,
    ) -> Result<(), A::Error> {
        match field {
            "name" => b.name = Some(map.next_value()?),
            "dt" => b.date = Some(map.next_value()?),
            "cod" => b.response_code = Some(map.next_value()?),
            "message" => b.message = Some(map.next_value()?),
            "sys" => b.location = Some(map.next_value_seed(RecordSeed::new(tracker))?),
            "main" => b.atmosphere = Some(map.next_value_seed(RecordSeed::new(tracker))?),
            "wind" => b.wind = Some(map.next_value_seed(RecordSeed::new(tracker))?),
            "weather" => b.conditions = Some(map.next_value_seed(ListSeed::new(tracker))?),
            _ => {
                map.next_value::<IgnoredAny>()?;
            }
        }
        Ok(())
    }

    /// `name`, `dt` and `cod` are required, error responses included.
    fn freeze(b: Self::Builder) -> Result<Self, &'static str> {
        let name = b.name.ok_or("name")?;
        let date = b.date.ok_or("dt")?;
        let response_code = b.response_code.ok_or("cod")?;

        Ok(WeatherRecord {
            name,
            date,
            response_code,
            message: b.message,
            location: b.location,
            atmosphere: b.atmosphere,
            wind: b.wind,
            conditions: b.conditions,
        })
    }
}

impl Record for LocationInfo {
    const NAME: &'static str = "sys";
    const FIELDS: &'static [&'static str] = &["country", "message", "sunrise", "sunset"];

    type Builder = Self;

    fn read_field<'de, A: MapAccess<'de>>(
        b: &mut Self::Builder,
        field: &'static str,
        map: &mut A,
        _tracker: &Tracker,
    ) -> Result<(), A::Error> {
        match field {
            "country" => b.country_code = Some(map.next_value()?),
            "message" => b.diagnostic_code = Some(map.next_value()?),
            "sunrise" => b.sunrise = Some(map.next_value()?),
            "sunset" => b.sunset = Some(map.next_value()?),
            _ => {
                map.next_value::<IgnoredAny>()?;
            }
        }
        Ok(())
    }

    fn freeze(b: Self::Builder) -> Result<Self, &'static str> {
        Ok(b)
    }
}

impl Record for Atmosphere {
    const NAME: &'static str = "main";
    const FIELDS: &'static [&'static str] = &["temp", "pressure", "humidity"];

    type Builder = Self;

    fn read_field<'de, A: MapAccess<'de>>(
        b: &mut Self::Builder,
        field: &'static str,
        map: &mut A,
        _tracker: &Tracker,
    ) -> Result<(), A::Error> {
        match field {
            "temp" => b.temperature = Some(map.next_value()?),
            "pressure" => b.pressure = Some(map.next_value()?),
            "humidity" => b.humidity = Some(map.next_value()?),
            _ => {
                map.next_value::<IgnoredAny>()?;
            }
        }
        Ok(())
    }

    fn freeze(b: Self::Builder) -> Result<Self, &'static str> {
        Ok(b)
    }
}

impl Record for WindInfo {
    const NAME: &'static str = "wind";
    const FIELDS: &'static [&'static str] = &["deg", "speed"];

    type Builder = Self;

    fn read_field<'de, A: MapAccess<'de>>(
        b: &mut Self::Builder,
        field: &'static str,
        map: &mut A,
        _tracker: &Tracker,
    ) -> Result<(), A::Error> {
        match field {
            "deg" => b.degree = Some(map.next_value()?),
            "speed" => b.speed = Some(map.next_value()?),
            _ => {
                map.next_value::<IgnoredAny>()?;
            }
        }
        Ok(())
    }

    fn freeze(b: Self::Builder) -> Result<Self, &'static str> {
        Ok(b)
    }
}

impl Record for Condition {
    const NAME: &'static str = "weather condition";
    const FIELDS: &'static [&'static str] = &["id", "main", "description", "icon"];

    type Builder = Self;

    fn read_field<'de, A: MapAccess<'de>>(
        b: &mut Self::Builder,
        field: &'static str,
        map: &mut A,
        _tracker: &Tracker,
    ) -> Result<(), A::Error> {
        match field {
            "id" => b.id = Some(map.next_value()?),
            "main" => b.category = Some(map.next_value()?),
            "description" => b.description = Some(map.next_value()?),
            "icon" => b.icon_code = Some(map.next_value()?),
            _ => {
                map.next_value::<IgnoredAny>()?;
            }
        }
        Ok(())
    }

    fn freeze(b: Self::Builder) -> Result<Self, &'static str> {
        Ok(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_tables_have_no_duplicates() {
        for fields in [
            WeatherRecord::FIELDS,
            LocationInfo::FIELDS,
            Atmosphere::FIELDS,
            WindInfo::FIELDS,
            Condition::FIELDS,
        ] {
            let mut sorted = fields.to_vec();
            sorted.sort_unstable();
            sorted.dedup();
            assert_eq!(sorted.len(), fields.len());
        }
    }

    #[test]
    fn freeze_requires_name_date_and_code() {
        let err = WeatherRecord::freeze(WeatherRecordBuilder::default()).unwrap_err();
        assert_eq!(err, "name");

        let b = WeatherRecordBuilder { name: Some("Oslo".into()), ..Default::default() };
        assert_eq!(WeatherRecord::freeze(b).unwrap_err(), "dt");

        let b = WeatherRecordBuilder { name: Some("Oslo".into()), date: Some(1), ..Default::default() };
        assert_eq!(WeatherRecord::freeze(b).unwrap_err(), "cod");
    }

    #[test]
    fn freeze_rejects_bare_error_response() {
        let b = WeatherRecordBuilder {
            response_code: Some(401),
            message: Some("Invalid API key".into()),
            ..Default::default()
        };
        assert_eq!(WeatherRecord::freeze(b).unwrap_err(), "name");
    }

    #[test]
    fn freeze_keeps_error_message() {
        let b = WeatherRecordBuilder {
            name: Some("Oslo".into()),
            date: Some(1),
            response_code: Some(401),
            message: Some("Invalid API key".into()),
            ..Default::default()
        };
        let rec = WeatherRecord::freeze(b).expect("all required fields present");
        assert_eq!(rec.message.as_deref(), Some("Invalid API key"));
    }
}
