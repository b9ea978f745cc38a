//! Creation-time parsing for tag cells
//!
//! The listing shows when a tag was created in several human-readable forms,
//! depending on how long ago that was:
//! - `created just now`, `created 5 mins ago`, `created 2 hours ago`
//! - `created yesterday`, `created 3 days ago`
//! - `created Mar 5 at 14:22` (current year), `created Mar 5, 2019 at 14:22`,
//!   `created Mar 5 '19 at 14:22`
//!
//! Hover titles carry absolute stamps such as `2024-03-05 14:22:07Z`.
//! All times are taken as UTC.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};

/// Parses a creation-time string into an absolute UTC timestamp
///
/// Relative forms are resolved against `now`. A leading `created ` is
/// ignored, as is letter case and repeated whitespace.
///
/// # Returns
///
/// * `Some(DateTime<Utc>)` - The creation instant
/// * `None` - The text is not a recognised time format
pub fn parse_created(text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let text = match collapsed.get(..8) {
        Some(prefix) if prefix.eq_ignore_ascii_case("created ") => &collapsed[8..],
        _ => collapsed.as_str(),
    };

    if text.is_empty() {
        return None;
    }

    if let Some(stamp) = parse_absolute(text) {
        return Some(stamp);
    }

    let lower = text.to_lowercase();
    match lower.as_str() {
        "just now" | "now" | "today" => return Some(now),
        "yesterday" => return now.checked_sub_signed(Duration::days(1)),
        _ => {}
    }

    if let Some(amount) = lower.strip_suffix(" ago") {
        return parse_relative(amount).and_then(|elapsed| now.checked_sub_signed(elapsed));
    }

    parse_month_day(&lower, now)
}

/// Parses ISO-like absolute stamps
fn parse_absolute(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(stamp) = DateTime::parse_from_rfc3339(text) {
        return Some(stamp.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%d %H:%M:%SZ", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Parses `<amount> <unit>[, <amount> <unit>...]` into a duration
///
/// Ages too large to represent yield `None`.
fn parse_relative(text: &str) -> Option<Duration> {
    let mut total_secs: i64 = 0;

    for part in text.split(',') {
        let mut words = part.split_whitespace();
        let amount: i64 = match words.next()? {
            "a" | "an" => 1,
            number => number.parse().ok()?,
        };
        let unit = unit_seconds(words.next()?)?;
        if words.next().is_some() {
            return None;
        }

        total_secs = total_secs.checked_add(amount.checked_mul(unit)?)?;
    }

    Duration::try_seconds(total_secs)
}

fn unit_seconds(unit: &str) -> Option<i64> {
    let secs = match unit {
        "s" | "sec" | "secs" | "second" | "seconds" => 1,
        "min" | "mins" | "minute" | "minutes" => 60,
        "h" | "hr" | "hrs" | "hour" | "hours" => 60 * 60,
        "day" | "days" => 24 * 60 * 60,
        "week" | "weeks" => 7 * 24 * 60 * 60,
        "month" | "months" => 30 * 24 * 60 * 60,
        "year" | "years" => 365 * 24 * 60 * 60,
        _ => return None,
    };
    Some(secs)
}

/// Parses `mon d[, yyyy| 'yy][ at hh:mm]`
///
/// Without a year the most recent such date not after `now` is used.
fn parse_month_day(text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let (date_part, time_part) = match text.split_once(" at ") {
        Some((date, time)) => (date, Some(time.trim())),
        None => (text, None),
    };

    let time = match time_part {
        Some(time) => NaiveTime::parse_from_str(time, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(time, "%H:%M:%S"))
            .ok()?,
        None => NaiveTime::from_hms_opt(0, 0, 0)?,
    };

    let cleaned = date_part.replace(',', " ");
    let mut words = cleaned.split_whitespace();
    let month = month_number(words.next()?)?;
    let day: u32 = words.next()?.parse().ok()?;
    let year = match words.next() {
        Some(word) => Some(parse_year(word)?),
        None => None,
    };
    if words.next().is_some() {
        return None;
    }

    let at = |year: i32| {
        NaiveDate::from_ymd_opt(year, month, day).map(|date| date.and_time(time).and_utc())
    };

    match year {
        Some(year) => at(year),
        None => at(now.year())
            .filter(|stamp| *stamp <= now)
            .or_else(|| at(now.year() - 1)),
    }
}

fn parse_year(word: &str) -> Option<i32> {
    if let Some(short) = word.strip_prefix('\'') {
        if short.len() != 2 {
            return None;
        }
        return short.parse::<i32>().ok().map(|yy| 2000 + yy);
    }

    let year: i32 = word.parse().ok()?;
    (1000..=9999).contains(&year).then_some(year)
}

fn month_number(word: &str) -> Option<u32> {
    const MONTHS: [&str; 12] = [
        "january",
        "february",
        "march",
        "april",
        "may",
        "june",
        "july",
        "august",
        "september",
        "october",
        "november",
        "december",
    ];

    let word = word.trim_end_matches('.');
    if word.len() < 3 {
        return None;
    }

    MONTHS
        .iter()
        .position(|month| month.starts_with(word))
        .map(|index| index as u32 + 1)
}
