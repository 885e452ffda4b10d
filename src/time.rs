//! Partial date/time values.
//!
//! Language understanding rarely yields a complete timestamp: "December 11th"
//! has no year, "week 5" has no day, "at 3pm" has no date at all. A
//! [`PartialDateTime`] keeps every component optional and renders itself in
//! an ISO-8601-like text form where absent components become `X` placeholders:
//!
//! ```text
//! XXXX-12-11          calendar date without year
//! 2024-W05-X          ISO week date without day
//! T15:XX:XX           time only
//! 1987-12-11T03:22:55+01:00
//! ```
//!
//! Parsing is positional and deliberately permissive: values are not range
//! checked, so `T99:00:00` decodes to hour 99.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::error::{KnowledgeError, KnowledgeResult};

const PLACEHOLDER: char = 'X';

// Components are signed: years before the common era format as `-044`.
static CALENDAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<year>-?\d+|X+)(?:-(?P<month>-?\d+|X+)(?:-(?P<day>-?\d+|X+))?)?$")
        .expect("Invalid calendar regex")
});

static WEEK_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<year>-?\d+|X+)-W(?P<week>-?\d+|X+)(?:-(?P<dow>-?\d+|X+))?$")
        .expect("Invalid week regex")
});

static TIME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:(?P<hour>-?\d+|X+)(?::(?P<minute>-?\d+|X+)(?::(?P<second>-?\d+|X+))?)?)?(?P<offset>Z|[+-]\d{2}(?::?\d{2})?)?$",
    )
    .expect("Invalid time regex")
});

/// A date and/or time whose components are independently optional.
///
/// Week-date fields (`week`, `day_of_week`) and calendar fields (`month`,
/// `day_of_month`) are alternative renderings of the date part; when either
/// week field is present the week form wins.
///
/// # Examples
///
/// ```
/// use knowledge_context::PartialDateTime;
///
/// let birthday = PartialDateTime {
///     month: Some(12),
///     day_of_month: Some(11),
///     ..PartialDateTime::default()
/// };
/// assert_eq!(birthday.format(), "XXXX-12-11");
///
/// let parsed = PartialDateTime::parse("XXXX-12-11").unwrap();
/// assert_eq!(parsed, birthday);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartialDateTime {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub month: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub day_of_month: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub hour: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub minute: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub second: Option<i32>,

    /// ISO-8601 week of year.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub week: Option<i32>,

    /// ISO day of week, Monday = 0.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day_of_week: Option<i32>,

    /// UTC offset as written, e.g. `Z` or `+05:30`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<String>,
}

impl PartialDateTime {
    /// Returns true if no component is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.has_date() && !self.has_time()
    }

    /// Returns true if any date component (calendar or week) is set.
    #[must_use]
    pub const fn has_date(&self) -> bool {
        self.year.is_some()
            || self.month.is_some()
            || self.day_of_month.is_some()
            || self.uses_week_date()
    }

    /// Returns true if any time component or the offset is set.
    #[must_use]
    pub const fn has_time(&self) -> bool {
        self.hour.is_some() || self.minute.is_some() || self.second.is_some() || self.offset.is_some()
    }

    /// Returns true if the date part renders in ISO week form.
    #[must_use]
    pub const fn uses_week_date(&self) -> bool {
        self.week.is_some() || self.day_of_week.is_some()
    }

    /// Renders the value in its ISO-8601-like text form.
    #[must_use]
    pub fn format(&self) -> String {
        let mut out = String::new();

        if self.uses_week_date() {
            push_component(&mut out, self.year, 4);
            out.push_str("-W");
            push_component(&mut out, self.week, 2);
            out.push('-');
            push_component(&mut out, self.day_of_week.map(|d| i64::from(d) + 1), 1);
        } else if self.has_date() {
            push_component(&mut out, self.year, 4);
            out.push('-');
            push_component(&mut out, self.month, 2);
            out.push('-');
            push_component(&mut out, self.day_of_month, 2);
        }

        if self.has_time() {
            out.push('T');
            push_component(&mut out, self.hour, 2);
            out.push(':');
            push_component(&mut out, self.minute, 2);
            out.push(':');
            push_component(&mut out, self.second, 2);
            if let Some(offset) = &self.offset {
                out.push_str(offset);
            }
        }

        out
    }

    /// Parses the text form produced by [`format`](Self::format).
    ///
    /// The input is split on the first `T`; the left side is a calendar or
    /// week date, the right side a time with optional offset. Component values
    /// are not range checked.
    ///
    /// # Errors
    ///
    /// Returns `KnowledgeError::InvalidData` if a segment does not match the
    /// expected shape or a component overflows `i32`.
    pub fn parse(text: &str) -> KnowledgeResult<Self> {
        let text = text.trim();
        let (date_part, time_part) = match text.split_once('T') {
            Some((date, time)) => (date, Some(time)),
            None => (text, None),
        };

        let mut value = Self::default();

        if !date_part.is_empty() {
            if let Some(caps) = WEEK_PATTERN.captures(date_part) {
                value.year = component(&caps, "year")?;
                value.week = component(&caps, "week")?;
                value.day_of_week = day_of_week(&caps)?;
            } else if let Some(caps) = CALENDAR_PATTERN.captures(date_part) {
                value.year = component(&caps, "year")?;
                value.month = component(&caps, "month")?;
                value.day_of_month = component(&caps, "day")?;
            } else {
                return Err(KnowledgeError::invalid_data(format!(
                    "malformed date segment '{date_part}' in '{text}'"
                )));
            }
        }

        if let Some(time_part) = time_part {
            let caps = TIME_PATTERN.captures(time_part).ok_or_else(|| {
                KnowledgeError::invalid_data(format!(
                    "malformed time segment '{time_part}' in '{text}'"
                ))
            })?;
            value.hour = component(&caps, "hour")?;
            value.minute = component(&caps, "minute")?;
            value.second = component(&caps, "second")?;
            value.offset = caps.name("offset").map(|m| m.as_str().to_string());
        }

        Ok(value)
    }

    /// Converts the date part to a calendar date, if it is fully specified and valid.
    #[must_use]
    pub fn to_naive_date(&self) -> Option<NaiveDate> {
        let year = self.year?;
        if self.uses_week_date() {
            let week = u32::try_from(self.week?).ok()?;
            let weekday = u8::try_from(self.day_of_week?)
                .ok()
                .and_then(|d| Weekday::try_from(d).ok())?;
            NaiveDate::from_isoywd_opt(year, week, weekday)
        } else {
            let month = u32::try_from(self.month?).ok()?;
            let day = u32::try_from(self.day_of_month?).ok()?;
            NaiveDate::from_ymd_opt(year, month, day)
        }
    }

    /// Converts the time part to a wall-clock time. Missing seconds count as zero.
    #[must_use]
    pub fn to_naive_time(&self) -> Option<NaiveTime> {
        let hour = u32::try_from(self.hour?).ok()?;
        let minute = u32::try_from(self.minute?).ok()?;
        let second = u32::try_from(self.second.unwrap_or(0)).ok()?;
        NaiveTime::from_hms_opt(hour, minute, second)
    }

    /// Converts to a full timestamp when both parts are fully specified.
    #[must_use]
    pub fn to_naive_date_time(&self) -> Option<NaiveDateTime> {
        Some(NaiveDateTime::new(self.to_naive_date()?, self.to_naive_time()?))
    }
}

fn push_component(out: &mut String, value: Option<impl Into<i64>>, width: usize) {
    match value {
        Some(v) => {
            let v: i64 = v.into();
            out.push_str(&format!("{v:0width$}"));
        }
        None => out.extend(std::iter::repeat(PLACEHOLDER).take(width)),
    }
}

fn raw_component(caps: &Captures<'_>, name: &str) -> KnowledgeResult<Option<i64>> {
    let Some(m) = caps.name(name) else {
        return Ok(None);
    };
    let raw = m.as_str();
    if raw.starts_with(PLACEHOLDER) {
        return Ok(None);
    }
    raw.parse::<i64>()
        .map(Some)
        .map_err(|e| KnowledgeError::invalid_data(format!("bad {name} component '{raw}': {e}")))
}

fn narrow(name: &str, value: i64) -> KnowledgeResult<i32> {
    i32::try_from(value)
        .map_err(|_| KnowledgeError::invalid_data(format!("{name} component {value} overflows i32")))
}

fn component(caps: &Captures<'_>, name: &str) -> KnowledgeResult<Option<i32>> {
    raw_component(caps, name)?
        .map(|v| narrow(name, v))
        .transpose()
}

/// The text form counts weekdays from 1, the field from 0.
fn day_of_week(caps: &Captures<'_>) -> KnowledgeResult<Option<i32>> {
    raw_component(caps, "dow")?
        .map(|d| narrow("dow", d.saturating_sub(1)))
        .transpose()
}

impl fmt::Display for PartialDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format())
    }
}

impl FromStr for PartialDateTime {
    type Err = KnowledgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<NaiveDate> for PartialDateTime {
    #[allow(clippy::cast_possible_wrap)]
    fn from(date: NaiveDate) -> Self {
        Self {
            year: Some(date.year()),
            month: Some(date.month() as i32),
            day_of_month: Some(date.day() as i32),
            ..Self::default()
        }
    }
}

impl From<NaiveTime> for PartialDateTime {
    #[allow(clippy::cast_possible_wrap)]
    fn from(time: NaiveTime) -> Self {
        Self {
            hour: Some(time.hour() as i32),
            minute: Some(time.minute() as i32),
            second: Some(time.second() as i32),
            ..Self::default()
        }
    }
}

impl From<NaiveDateTime> for PartialDateTime {
    fn from(value: NaiveDateTime) -> Self {
        let date = Self::from(value.date());
        let time = Self::from(value.time());
        Self {
            hour: time.hour,
            minute: time.minute,
            second: time.second,
            ..date
        }
    }
}
