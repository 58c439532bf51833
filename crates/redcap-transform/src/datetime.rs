//! Date parsing, formatting, and offset arithmetic for the date transform.
//!
//! REDCap exports dates in a handful of layouts depending on the field
//! validation. All of them parse into a [`NaiveDateTime`]; date-only and
//! year-only values land on midnight (and January 1st for a bare year).

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use redcap_model::DateGranularity;

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];

/// Parses a REDCap date or datetime value. Returns `None` for blank or
/// unrecognized input.
pub fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, fmt) {
            return Some(date.and_time(NaiveTime::MIN));
        }
    }
    parse_year(trimmed)
}

fn parse_year(value: &str) -> Option<NaiveDateTime> {
    if value.len() != 4 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year: i32 = value.parse().ok()?;
    NaiveDate::from_ymd_opt(year, 1, 1).map(|date| date.and_time(NaiveTime::MIN))
}

/// Formats a value at the precision the field map asks for.
pub fn format_granularity(value: NaiveDateTime, granularity: DateGranularity) -> String {
    value.format(granularity.format_str()).to_string()
}

/// Whole seconds from `value` to `anchor` (positive when `value` is earlier).
pub fn seconds_until(anchor: NaiveDateTime, value: NaiveDateTime) -> i64 {
    (anchor - value).num_seconds()
}

/// Whole-day offset that moves a date of birth onto the anchor date.
pub fn dob_offset(anchor: NaiveDate, dob: NaiveDateTime) -> Duration {
    Duration::days((anchor - dob.date()).num_days())
}

/// Adds `offset` to `value`, `None` when the result leaves chrono's range.
pub fn shift(value: NaiveDateTime, offset: Duration) -> Option<NaiveDateTime> {
    value.checked_add_signed(offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_redcap_layouts() {
        let expected = ymd(2020, 6, 1).and_hms_opt(14, 30, 0).unwrap();
        assert_eq!(parse_datetime("2020-06-01 14:30"), Some(expected));
        assert_eq!(parse_datetime("2020-06-01T14:30:00"), Some(expected));
        assert_eq!(parse_datetime(" 2020-06-01 14:30:00 "), Some(expected));

        let midnight = ymd(2020, 6, 1).and_time(NaiveTime::MIN);
        assert_eq!(parse_datetime("2020-06-01"), Some(midnight));
        assert_eq!(parse_datetime("06/01/2020"), Some(midnight));
        assert_eq!(
            parse_datetime("1990"),
            Some(ymd(1990, 1, 1).and_time(NaiveTime::MIN))
        );
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_datetime(""), None);
        assert_eq!(parse_datetime("   "), None);
        assert_eq!(parse_datetime("unknown"), None);
        assert_eq!(parse_datetime("2020-13-01"), None);
        assert_eq!(parse_datetime("19900"), None);
    }

    #[test]
    fn formats_each_granularity() {
        let value = ymd(2080, 2, 1).and_hms_opt(9, 5, 7).unwrap();
        assert_eq!(format_granularity(value, DateGranularity::Year), "2080");
        assert_eq!(format_granularity(value, DateGranularity::Date), "2080-02-01");
        assert_eq!(
            format_granularity(value, DateGranularity::DateTimeMinute),
            "2080-02-01 09:05"
        );
        assert_eq!(
            format_granularity(value, DateGranularity::DateTimeSeconds),
            "2080-02-01 09:05:07"
        );
    }

    #[test]
    fn dob_offset_counts_calendar_days() {
        let dob = parse_datetime("1990-05-02").unwrap();
        let offset = dob_offset(ymd(2050, 1, 1), dob);
        assert_eq!(offset.num_days(), 21794);

        let visit = parse_datetime("2020-06-01").unwrap();
        let shifted = shift(visit, offset).unwrap();
        assert_eq!(format_granularity(shifted, DateGranularity::Date), "2080-02-01");
    }

    #[test]
    fn seconds_until_anchor() {
        let anchor = ymd(2050, 1, 1).and_time(NaiveTime::MIN);
        let value = ymd(2049, 12, 31).and_time(NaiveTime::MIN);
        assert_eq!(seconds_until(anchor, value), 86_400);
        assert_eq!(seconds_until(value, anchor), -86_400);
    }
}
