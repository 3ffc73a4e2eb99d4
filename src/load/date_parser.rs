// src/load/date_parser.rs
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

use crate::load::utils::clean_str;

/// Formats tried on the whole token when it names the month in English.
const NAMED_MONTH_FORMATS: &[&str] = &[
    "%d %b %Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%b %d %Y",
    "%B %d %Y",
    "%d-%b-%Y",
    "%d-%B-%Y",
    "%Y-%b-%d",
];

const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M:%S", "%H:%M"];

/// Coerce a raw cell into a timestamp. `None` means "not a date"; the caller
/// treats that as a missing value.
pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let s = clean_str(raw);
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(&s) {
        return Some(dt.naive_local());
    }

    for fmt in NAMED_MONTH_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(&s, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }

    // "<date>[ T]<time>"
    let (date_part, time_part) = match s.find([' ', 'T']) {
        Some(idx) => (&s[..idx], s[idx + 1..].trim()),
        None => (s.as_str(), ""),
    };

    let date = parse_numeric_date(date_part)?;
    if time_part.is_empty() {
        return date.and_hms_opt(0, 0, 0);
    }
    let time = TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(time_part, fmt).ok())?;
    Some(date.and_time(time))
}

/// `YYYY-MM-DD`, `YYYY/MM/DD`, `YYYY.MM.DD`, `YYYYMMDD`, and `a/b/YYYY`
/// (month first unless that is impossible, then day first).
fn parse_numeric_date(s: &str) -> Option<NaiveDate> {
    if s.len() == 8 && s.bytes().all(|b| b.is_ascii_digit()) {
        let year: i32 = s[0..4].parse().ok()?;
        let month: u32 = s[4..6].parse().ok()?;
        let day: u32 = s[6..8].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    let sep = s.chars().find(|c| matches!(c, '-' | '/' | '.'))?;
    let parts: Vec<&str> = s.split(sep).collect();
    if parts.len() != 3
        || parts
            .iter()
            .any(|p| p.is_empty() || p.len() > 4 || !p.bytes().all(|b| b.is_ascii_digit()))
    {
        return None;
    }

    let nums: Vec<u32> = parts
        .iter()
        .map(|p| p.parse::<u32>())
        .collect::<Result<_, _>>()
        .ok()?;

    if parts[0].len() == 4 {
        return NaiveDate::from_ymd_opt(nums[0] as i32, nums[1], nums[2]);
    }

    let year = match parts[2].len() {
        4 => nums[2] as i32,
        2 if nums[2] >= 69 => 1900 + nums[2] as i32,
        2 => 2000 + nums[2] as i32,
        _ => return None,
    };
    NaiveDate::from_ymd_opt(year, nums[0], nums[1])
        .or_else(|| NaiveDate::from_ymd_opt(year, nums[1], nums[0]))
}
