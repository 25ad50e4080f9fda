//! Best-effort parsing of the time strings shown on timeline pages.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

static RELATIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(\d+)\s*(s|secs?|seconds?|m|mins?|minutes?|h|hrs?|hours?|d|days?)(?:\s+ago)?$")
        .expect("static regex")
});

const DATE_TIME_FORMATS: &[&str] = &["%b %d, %Y · %I:%M %p", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];
const DATE_FORMATS: &[&str] = &["%b %d, %Y", "%d %b %Y", "%Y-%m-%d"];

/// Parse a displayed post time. `now` anchors relative forms and year-less
/// dates. Returns `None` when no known form matches; callers fall back to the
/// fetch time.
pub fn parse_display_time(raw: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if s.bytes().all(|b| b.is_ascii_digit()) {
        return parse_epoch(s);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }

    if s.eq_ignore_ascii_case("now") || s.eq_ignore_ascii_case("just now") {
        return Some(now);
    }
    if let Some(ago) = parse_relative(s) {
        return Some(now - ago);
    }

    let without_zone = s.trim_end_matches("UTC").trim_end();
    for format in DATE_TIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(without_zone, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return date.and_hms_opt(0, 0, 0).map(|naive| Utc.from_utc_datetime(&naive));
        }
    }

    parse_month_day(s, now)
}

fn parse_epoch(digits: &str) -> Option<DateTime<Utc>> {
    let value: i64 = digits.parse().ok()?;
    match digits.len() {
        13 => Utc.timestamp_millis_opt(value).single(),
        9..=11 => Utc.timestamp_opt(value, 0).single(),
        _ => None,
    }
}

fn parse_relative(s: &str) -> Option<Duration> {
    let caps = RELATIVE.captures(s)?;
    let amount: i64 = caps[1].parse().ok()?;
    let unit = caps[2].to_ascii_lowercase();
    match unit.chars().next()? {
        's' => Some(Duration::seconds(amount)),
        'm' => Some(Duration::minutes(amount)),
        'h' => Some(Duration::hours(amount)),
        'd' => Some(Duration::days(amount)),
        _ => None,
    }
}

// "Oct 14": the current year, or last year if that would lie in the future
fn parse_month_day(s: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let with_year = format!("{} {}", s, now.year());
    let date = NaiveDate::parse_from_str(&with_year, "%b %d %Y").ok()?;
    let date = if date > now.date_naive() {
        date.with_year(now.year() - 1)?
    } else {
        date
    };
    date.and_hms_opt(0, 0, 0).map(|naive| Utc.from_utc_datetime(&naive))
}
