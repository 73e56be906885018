use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{self, Deserializer};
use thiserror::Error;

/// A date string from the API that matched none of the known layouts.
#[derive(Debug, Error)]
#[error("failed to parse `{0}` as a date or date-time")]
pub struct ParseDateError(String);

/// Parses `2024-05-01`, or any of the date-time layouts [`parse_timestamp`]
/// accepts, keeping only the date. Blank strings are `None`.
pub fn parse_date(text: &str) -> Result<Option<NaiveDate>, ParseDateError> {
    let text = text.trim();

    if text.is_empty() {
        return Ok(None);
    }

    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Ok(Some(date));
    }

    Ok(parse_timestamp(text)?.map(|timestamp| timestamp.date_naive()))
}

/// Parses RFC 3339, a naive `T` or space separated date-time (taken as UTC),
/// or a bare date (taken as UTC midnight). Blank strings are `None`.
pub fn parse_timestamp(text: &str) -> Result<Option<DateTime<Utc>>, ParseDateError> {
    let text = text.trim();

    if text.is_empty() {
        return Ok(None);
    }

    if let Ok(timestamp) = DateTime::parse_from_rfc3339(text) {
        return Ok(Some(timestamp.to_utc()));
    }

    for layout in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(timestamp) = NaiveDateTime::parse_from_str(text, layout) {
            return Ok(Some(timestamp.and_utc()));
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Ok(Some(date.and_time(NaiveTime::MIN).and_utc()));
    }

    Err(ParseDateError(text.to_owned()))
}

pub fn optional_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;

    impl<'de> serde::de::Visitor<'de> for Visitor {
        type Value = Option<NaiveDate>;

        fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("null or a string containing a date")
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(None)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(None)
        }

        fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
        where
            D: Deserializer<'de>,
        {
            deserializer.deserialize_str(self)
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            parse_date(v).map_err(E::custom)
        }
    }

    deserializer.deserialize_option(Visitor)
}

pub fn optional_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;

    impl<'de> serde::de::Visitor<'de> for Visitor {
        type Value = Option<DateTime<Utc>>;

        fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("null or a string containing a date-time")
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(None)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(None)
        }

        fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
        where
            D: Deserializer<'de>,
        {
            deserializer.deserialize_str(self)
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            parse_timestamp(v).map_err(E::custom)
        }
    }

    deserializer.deserialize_option(Visitor)
}
