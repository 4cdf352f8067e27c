use std::fmt::Display;

use time::format_description::FormatItem;
use time::macros::format_description;
use time::{Date, Time};
use vodca::{AsRefln, Fromln};

static DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");
static TIME_FORMAT: &[FormatItem<'static>] = format_description!("[hour]:[minute]");

/// Departure day, wire format `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Fromln, AsRefln)]
pub struct RideDate(Date);

impl RideDate {
    pub fn new(date: impl Into<Date>) -> Self {
        Self(date.into())
    }

    pub fn parse(input: &str) -> Result<Self, time::error::Parse> {
        Date::parse(input, DATE_FORMAT).map(Self)
    }
}

impl Display for RideDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0.format(DATE_FORMAT) {
            Ok(formatted) => write!(f, "{formatted}"),
            Err(_) => Err(std::fmt::Error),
        }
    }
}

/// Departure wall-clock time, wire format `HH:MM` (24h).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Fromln, AsRefln)]
pub struct RideTime(Time);

impl RideTime {
    pub fn new(time: impl Into<Time>) -> Self {
        Self(time.into())
    }

    pub fn parse(input: &str) -> Result<Self, time::error::Parse> {
        Time::parse(input, TIME_FORMAT).map(Self)
    }
}

impl Display for RideTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0.format(TIME_FORMAT) {
            Ok(formatted) => write!(f, "{formatted}"),
            Err(_) => Err(std::fmt::Error),
        }
    }
}
