use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::ClockError;

/// Wall-clock time of day without a date, written as `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay {
    hour: u32,
    minute: u32,
}

impl TimeOfDay {
    pub fn new(hour: u32, minute: u32) -> Result<Self, ClockError> {
        if hour > 23 || minute > 59 {
            return Err(ClockError::OutOfRange { hour, minute });
        }
        Ok(Self { hour, minute })
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn minute(&self) -> u32 {
        self.minute
    }

    fn as_naive(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour, self.minute, 0).unwrap_or_default()
    }
}

impl FromStr for TimeOfDay {
    type Err = ClockError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let malformed = || ClockError::Malformed(input.to_string());
        let (hour, minute) = input.trim().split_once(':').ok_or_else(malformed)?;
        if hour.len() != 2 || minute.len() != 2 {
            return Err(malformed());
        }
        if !hour.bytes().chain(minute.bytes()).all(|byte| byte.is_ascii_digit()) {
            return Err(malformed());
        }

        let hour = hour.parse::<u32>().map_err(|_| malformed())?;
        let minute = minute.parse::<u32>().map_err(|_| malformed())?;
        Self::new(hour, minute)
    }
}

impl Display for TimeOfDay {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl From<NaiveDateTime> for TimeOfDay {
    fn from(value: NaiveDateTime) -> Self {
        Self {
            hour: value.hour(),
            minute: value.minute(),
        }
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Resolves a wall-clock time against the calendar date it belongs to.
pub fn to_instant(time: TimeOfDay, anchor: NaiveDate) -> NaiveDateTime {
    anchor.and_time(time.as_naive())
}

/// Resolves the end of a session; overnight sessions end on the day after `anchor`.
pub fn end_instant(end: TimeOfDay, anchor: NaiveDate, ends_next_day: bool) -> NaiveDateTime {
    let instant = to_instant(end, anchor);
    if ends_next_day {
        instant + Duration::days(1)
    } else {
        instant
    }
}
