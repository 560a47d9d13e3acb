//! `HH:MM` serialization for times of day
//!
//! Time columns are written as `HH:MM`. Reading also accepts `HH:MM:SS`,
//! which is what SQL `time` columns hand back, as long as the seconds are
//! zero. Anything finer than a minute would not survive being written back.

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Deserializer, Serializer};

use crate::{Error, Result};

/// Parse a time of day written as `HH:MM` or `HH:MM:00`
pub fn parse_time(s: &str) -> Result<NaiveTime> {
    let trimmed = s.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
        .ok()
        .filter(|t| t.second() == 0 && t.nanosecond() == 0)
        .ok_or_else(|| Error::InvalidTime(s.to_string()))
}

/// Format a time of day as `HH:MM`
pub fn format_time(time: &NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_time(time))
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<NaiveTime, D::Error> {
    let s = String::deserialize(deserializer)?;
    parse_time(&s).map_err(serde::de::Error::custom)
}

/// Same format for `Option<NaiveTime>` fields
pub mod option {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        time: &Option<NaiveTime>,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        match time {
            Some(t) => serializer.serialize_some(&super::format_time(t)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Option<NaiveTime>, D::Error> {
        let s: Option<String> = Option::deserialize(deserializer)?;
        match s.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(value) => super::parse_time(value)
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}
