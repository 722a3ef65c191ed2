//! RFC 3339 timestamps on the wire.
//!
//! Messages, records and stats all carry `SystemTime`s as RFC 3339 strings
//! (`2024-05-01T10:00:00.000Z` from browsers, nanosecond precision when we
//! write them). Use with `#[serde(with = "...")]`.

use std::time::SystemTime;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

/// Nanosecond-precision UTC form, so formatting then parsing is lossless.
#[must_use]
pub fn format(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Accepts any RFC 3339 offset; the result is normalized to UTC.
pub fn parse(raw: &str) -> Result<SystemTime, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|parsed| SystemTime::from(parsed.with_timezone(&Utc)))
}

pub fn serialize<S: Serializer>(time: &SystemTime, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format(*time))
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SystemTime, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse(&raw).map_err(|e| D::Error::custom(format_args!("invalid timestamp {raw:?}: {e}")))
}

/// `Option<SystemTime>` variant; pair with `default` on the field.
pub mod option {
    use std::time::SystemTime;

    use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(
        time: &Option<SystemTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match time {
            Some(time) => serializer.serialize_str(&super::format(*time)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<SystemTime>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|raw| {
                super::parse(&raw)
                    .map_err(|e| D::Error::custom(format_args!("invalid timestamp {raw:?}: {e}")))
            })
            .transpose()
    }
}
