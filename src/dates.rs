//! Date helpers for dated note types: natural-language date input, leading filename dates and
//! date ranges.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use once_cell::sync::Lazy;
use regex::Regex;

pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

static LEADING_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4}-\d{2}-\d{2})(?:\s|$)").expect("static leading date regex compiles")
});

static RELATIVE_DAYS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:in\s+(\d+)\s+days?|(\d+)\s+days?\s+ago)$")
        .expect("static relative day regex compiles")
});

static RANGE_SEPARATOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(.+?)\s*(?:\.\.|\s+to\s+|\s+-\s+|\s*–\s*|\s*—\s*)\s*(.+?)\s*$")
        .expect("static range regex compiles")
});

fn parse_weekday(word: &str) -> Option<Weekday> {
    match word {
        "monday" | "mon" => Some(Weekday::Mon),
        "tuesday" | "tue" => Some(Weekday::Tue),
        "wednesday" | "wed" => Some(Weekday::Wed),
        "thursday" | "thu" => Some(Weekday::Thu),
        "friday" | "fri" => Some(Weekday::Fri),
        "saturday" | "sat" => Some(Weekday::Sat),
        "sunday" | "sun" => Some(Weekday::Sun),
        _ => None,
    }
}

/// Parses user date input relative to `today`.
///
/// Accepts ISO dates, `today`, `yesterday`, `tomorrow`, `in N days`, `N days ago`,
/// `next <weekday>`, `last <weekday>` and a bare weekday (the next one, today included).
pub fn parse_natural_date(input: &str, today: NaiveDate) -> Option<NaiveDate> {
    let normalized = input.trim().to_lowercase();
    if normalized.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(&normalized, ISO_DATE_FORMAT) {
        return Some(date);
    }
    match normalized.as_str() {
        "today" | "now" => return Some(today),
        "yesterday" => return today.pred_opt(),
        "tomorrow" => return today.succ_opt(),
        _ => {}
    }
    if let Some(captures) = RELATIVE_DAYS.captures(&normalized) {
        if let Some(ahead) = captures.get(1) {
            let days: i64 = ahead.as_str().parse().ok()?;
            return today.checked_add_signed(Duration::try_days(days)?);
        }
        if let Some(behind) = captures.get(2) {
            let days: i64 = behind.as_str().parse().ok()?;
            return today.checked_sub_signed(Duration::try_days(days)?);
        }
    }

    let words: Vec<&str> = normalized.split_whitespace().collect();
    let (direction, weekday) = match words.as_slice() {
        [word] => (0, parse_weekday(word)?),
        ["next", word] => (1, parse_weekday(word)?),
        ["last", word] => (-1, parse_weekday(word)?),
        _ => return None,
    };
    let current = today.weekday().num_days_from_monday() as i64;
    let target = weekday.num_days_from_monday() as i64;
    let offset = match direction {
        1 => {
            let ahead = (target - current).rem_euclid(7);
            if ahead == 0 {
                7
            } else {
                ahead
            }
        }
        -1 => {
            let behind = (current - target).rem_euclid(7);
            -(if behind == 0 { 7 } else { behind })
        }
        _ => (target - current).rem_euclid(7),
    };
    today.checked_add_signed(Duration::days(offset))
}

/// The `YYYY-MM-DD` date a file name or title starts with, if any.
pub fn leading_date(name: &str) -> Option<NaiveDate> {
    LEADING_DATE
        .captures(name)
        .and_then(|captures| captures.get(1))
        .and_then(|date| NaiveDate::parse_from_str(date.as_str(), ISO_DATE_FORMAT).ok())
}

/// Parses a single ISO date string as stored in frontmatter; empty means unset.
pub fn parse_iso_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(value, ISO_DATE_FORMAT)
        .ok()
        .or_else(|| {
            // Accept datetime stamps by their date part
            value
                .get(..10)
                .and_then(|prefix| NaiveDate::parse_from_str(prefix, ISO_DATE_FORMAT).ok())
        })
}

/// An inclusive date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Canonical `YYYY-MM-DD..YYYY-MM-DD` form.
    pub fn normalized(&self) -> String {
        format!(
            "{}..{}",
            self.start.format(ISO_DATE_FORMAT),
            self.end.format(ISO_DATE_FORMAT)
        )
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// Parses a date range such as `2024-01-01 to 2024-01-07`, `monday..friday` or
/// `2024-01-01 - 2024-01-07`. Each side goes through [parse_natural_date]. A single date is a
/// one-day range. Ranges ending before they start are rejected.
pub fn parse_date_range(input: &str, today: NaiveDate) -> Option<DateRange> {
    let (start, end) = match RANGE_SEPARATOR.captures(input) {
        Some(captures) => (
            parse_natural_date(captures.get(1)?.as_str(), today)?,
            parse_natural_date(captures.get(2)?.as_str(), today)?,
        ),
        None => {
            let single = parse_natural_date(input, today)?;
            (single, single)
        }
    };
    if end < start {
        return None;
    }
    Some(DateRange { start, end })
}
