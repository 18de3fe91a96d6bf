//! Date-range parsing for `DD/MM a DD/MM` style replies

use std::fmt;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Reprompt shown whenever a date reply cannot be understood
pub const DATE_FORMAT_HELP: &str = "Por favor, informe as datas no formato: *DD/MM a DD/MM* (ex.: *10/07 a 18/07*).";

/// `DD/MM <connector> DD/MM`
static FULL_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b([0-9]{1,2})[/\-.]([0-9]{1,2})\s*(?:a|até|ate|—|–|-)\s*([0-9]{1,2})[/\-.]([0-9]{1,2})\b")
        .expect("valid full date range regex")
});

/// `DD <connector> DD/MM`, both ends in the same month
static SHORT_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b([0-9]{1,2})\s*(?:a|até|ate|—|–|-)\s*([0-9]{1,2})[/\-.]([0-9]{1,2})\b")
        .expect("valid short date range regex")
});

/// A day of a month, bounds checked but not calendar checked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayMonth {
    pub day: u8,
    pub month: u8,
}

impl DayMonth {
    /// Day in 1..=31 and month in 1..=12. `31/02` is accepted.
    pub fn new(day: u8, month: u8) -> Option<Self> {
        if (1..=31).contains(&day) && (1..=12).contains(&month) {
            Some(Self { day, month })
        } else {
            None
        }
    }
}

impl fmt::Display for DayMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}/{:02}", self.day, self.month)
    }
}

/// Parsed travel period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: DayMonth,
    pub end: DayMonth,
}

impl DateRange {
    /// Canonical zero-padded rendering, `DD/MM a DD/MM`
    pub fn canonical(&self) -> String {
        format!("{} a {}", self.start, self.end)
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical())
    }
}

fn number(caps: &Captures<'_>, idx: usize) -> Option<u8> {
    caps.get(idx)?.as_str().parse().ok()
}

/// Parse a date range from free text.
///
/// The full `DD/MM a DD/MM` form is tried first. The short `DD a DD/MM` form is
/// only consulted when the full form does not appear at all, so an out-of-range
/// full match rejects the whole reply.
pub fn parse_date_range(text: &str) -> Option<DateRange> {
    let text = text.trim();
    debug!(%text, "parse_date_range: called");

    if let Some(caps) = FULL_RANGE.captures(text) {
        let start = DayMonth::new(number(&caps, 1)?, number(&caps, 2)?);
        let end = DayMonth::new(number(&caps, 3)?, number(&caps, 4)?);
        debug!(?start, ?end, "parse_date_range: full form matched");
        return Some(DateRange { start: start?, end: end? });
    }

    if let Some(caps) = SHORT_RANGE.captures(text) {
        let month = number(&caps, 3)?;
        let start = DayMonth::new(number(&caps, 1)?, month);
        let end = DayMonth::new(number(&caps, 2)?, month);
        debug!(?start, ?end, "parse_date_range: short form matched");
        return Some(DateRange { start: start?, end: end? });
    }

    debug!("parse_date_range: no match");
    None
}
