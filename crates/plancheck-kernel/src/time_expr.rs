//! Clock-time extraction from free text.
//!
//! Tokens look like `5 PM`, `5:30pm`, `10 AM` or a bare 24-hour `14:05`.
//! Every token resolves against a [`TimeAnchor`]: midnight of the first
//! schedule item's start, in that item's UTC offset. All other timestamps are
//! converted into the anchor offset before they are compared.

use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::schedule::ScheduleItem;

static TIME_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:[01]?\d|2[0-3])(?::[0-5]\d)?\s?(?:am|pm)\b|\b(?:[01]?\d|2[0-3]):[0-5]\d\b",
    )
    .expect("time token pattern is valid")
});

/// Reference date and offset for resolving bare clock times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeAnchor {
    pub date: NaiveDate,
    pub offset: FixedOffset,
}

impl TimeAnchor {
    /// Anchor on the first item's start. `None` for an empty schedule.
    pub fn from_schedule(items: &[ScheduleItem]) -> Option<Self> {
        let first = items.first()?;
        Some(Self {
            date: first.start_time.date_naive(),
            offset: *first.start_time.offset(),
        })
    }

    /// Express any timestamp in the anchor's offset.
    pub fn align(&self, value: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
        value.with_timezone(&self.offset)
    }

    /// The anchor date at `hour:minute` in the anchor offset.
    pub fn at(&self, hour: u32, minute: u32) -> Option<DateTime<FixedOffset>> {
        let naive = self.date.and_hms_opt(hour, minute, 0)?;
        self.offset.from_local_datetime(&naive).single()
    }

    /// Resolve a raw token such as `5:30 PM`.
    pub fn resolve(&self, token: &str) -> Option<DateTime<FixedOffset>> {
        let (hour, minute) = parse_clock(token)?;
        self.at(hour, minute)
    }
}

/// All clock-time tokens in `text`, in order of appearance.
pub fn extract_time_tokens(text: &str) -> Vec<&str> {
    TIME_TOKEN.find_iter(text).map(|m| m.as_str()).collect()
}

/// Parse a clock token into `(hour, minute)` on a 24-hour clock.
///
/// Tokens with an am/pm suffix use a 12-hour clock (hour 1-12); tokens
/// without one must be `HH:MM` on a 24-hour clock. Anything else is `None`.
pub fn parse_clock(token: &str) -> Option<(u32, u32)> {
    let cleaned = token.trim().to_ascii_lowercase();
    if cleaned.is_empty() {
        return None;
    }

    let meridiem = if cleaned.ends_with("am") {
        Some(false)
    } else if cleaned.ends_with("pm") {
        Some(true)
    } else {
        None
    };

    match meridiem {
        Some(is_pm) => {
            let digits = cleaned[..cleaned.len() - 2].trim_end();
            let (hour, minute) = split_hour_minute(digits)?;
            if !(1..=12).contains(&hour) || minute > 59 {
                return None;
            }
            let hour = match (hour, is_pm) {
                (12, false) => 0,
                (12, true) => 12,
                (h, true) => h + 12,
                (h, false) => h,
            };
            Some((hour, minute))
        }
        None => {
            if !cleaned.contains(':') {
                return None;
            }
            let (hour, minute) = split_hour_minute(&cleaned)?;
            if hour > 23 || minute > 59 {
                return None;
            }
            Some((hour, minute))
        }
    }
}

fn split_hour_minute(text: &str) -> Option<(u32, u32)> {
    match text.split_once(':') {
        Some((h, m)) => {
            if m.len() != 2 {
                return None;
            }
            Some((h.parse().ok()?, m.parse().ok()?))
        }
        None => Some((text.parse().ok()?, 0)),
    }
}

/// Short human label such as `5:00 PM -05:00`.
pub fn format_clock(value: &DateTime<FixedOffset>) -> String {
    value.format("%-I:%M %p %:z").to_string()
}
