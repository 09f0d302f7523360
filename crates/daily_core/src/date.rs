use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Days, Local, NaiveDate, TimeZone};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

const DAY_KEY_FORMAT: &str = "%Y-%m-%d";

/// Canonical `YYYY-MM-DD` address of one local calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DayKey(NaiveDate);

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("`{0}` is not a YYYY-MM-DD calendar date")]
pub struct DayKeyError(pub String);

impl DayKey {
    pub fn from_date(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// Strict parse: exactly four digits, dash, two digits, dash, two digits,
    /// and the result must name a real calendar date.
    pub fn parse(input: &str) -> Option<Self> {
        let bytes = input.as_bytes();
        if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
            return None;
        }
        let digits_ok = bytes
            .iter()
            .enumerate()
            .all(|(idx, b)| idx == 4 || idx == 7 || b.is_ascii_digit());
        if !digits_ok {
            return None;
        }
        let year: i32 = input[0..4].parse().ok()?;
        let month: u32 = input[5..7].parse().ok()?;
        let day: u32 = input[8..10].parse().ok()?;
        Self::from_ymd(year, month, day)
    }

    pub fn day_of_month(&self) -> u32 {
        self.0.day()
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DAY_KEY_FORMAT))
    }
}

impl FromStr for DayKey {
    type Err = DayKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| DayKeyError(s.to_string()))
    }
}

impl Serialize for DayKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DayKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Day key of the calendar date `at` falls on in its own time zone.
pub fn day_key<Tz: TimeZone>(at: &DateTime<Tz>) -> DayKey {
    DayKey(at.date_naive())
}

pub fn today() -> DayKey {
    day_key(&Local::now())
}

/// Monday on or before `day`.
pub fn week_start(day: DayKey) -> DayKey {
    let weekday = day.0.weekday().num_days_from_sunday() as i64;
    add_days(day, -((weekday + 6) % 7))
}

/// Calendar arithmetic on whole days. Saturates at the representable range
/// instead of panicking.
pub fn add_days(day: DayKey, n: i64) -> DayKey {
    let shifted = if n >= 0 {
        day.0.checked_add_days(Days::new(n.unsigned_abs()))
    } else {
        day.0.checked_sub_days(Days::new(n.unsigned_abs()))
    };
    match shifted {
        Some(date) => DayKey(clamp_to_four_digit_years(date)),
        None if n >= 0 => DayKey(last_day()),
        None => DayKey(first_day()),
    }
}

/// The seven day keys of the week beginning at `start`.
pub fn week_days(start: DayKey) -> [DayKey; 7] {
    let mut days = [start; 7];
    for (offset, slot) in days.iter_mut().enumerate() {
        *slot = add_days(start, offset as i64);
    }
    days
}

// Keys outside 0000..=9999 would not survive a round trip through the
// four-digit text form.
fn clamp_to_four_digit_years(date: NaiveDate) -> NaiveDate {
    date.clamp(first_day(), last_day())
}

fn first_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(0, 1, 1).unwrap_or(NaiveDate::MIN)
}

fn last_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(9999, 12, 31).unwrap_or(NaiveDate::MAX)
}
