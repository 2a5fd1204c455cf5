//! The `start` field of an event document: a date with an optional time.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::MeetupError;

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// When an event starts, as written in its document.
///
/// Events written with a date only have no time here; the default start
/// time is applied when the event is loaded into the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventStart {
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
}

impl EventStart {
    /// A start with both date and time.
    pub fn at(date: NaiveDate, time: NaiveTime) -> Self {
        Self {
            date,
            time: Some(time),
        }
    }

    /// A start with a date only.
    pub fn on(date: NaiveDate) -> Self {
        Self { date, time: None }
    }

    /// Full timestamp, filling a missing time with `default_time`.
    pub fn resolve(&self, default_time: NaiveTime) -> NaiveDateTime {
        self.date.and_time(self.time.unwrap_or(default_time))
    }
}

impl FromStr for EventStart {
    type Err = MeetupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        for format in DATETIME_FORMATS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
                return Ok(Self::at(dt.date(), dt.time()));
            }
        }
        NaiveDate::parse_from_str(s, DATE_FORMAT)
            .map(Self::on)
            .map_err(|_| MeetupError::InvalidDate(format!("cannot parse event start '{}'", s)))
    }
}

impl fmt::Display for EventStart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.time {
            Some(time) => write!(f, "{} {}", self.date.format(DATE_FORMAT), time.format("%H:%M:%S")),
            None => write!(f, "{}", self.date.format(DATE_FORMAT)),
        }
    }
}

impl Serialize for EventStart {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EventStart {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
