//! Lenient parsing for the date strings carried on orders and audit rows.
//!
//! Upstream systems supply dates in a mix of RFC 3339 and bare
//! `YYYY-MM-DD` forms, and occasionally garbage. Parse failures are
//! reported as `None` so callers can fall back instead of erroring.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Parse a timestamp string: RFC 3339 first, then the common naive forms
/// (interpreted as UTC), then a bare date at midnight.
pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(DateTime::from_naive_utc_and_offset(ndt, Utc));
        }
    }
    parse_date(s).and_then(start_of_day)
}

/// Parse a bare `YYYY-MM-DD` date.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

fn start_of_day(date: NaiveDate) -> Option<DateTime<Utc>> {
    date.and_hms_opt(0, 0, 0)
        .map(|ndt| DateTime::from_naive_utc_and_offset(ndt, Utc))
}

fn end_of_day(date: NaiveDate) -> Option<DateTime<Utc>> {
    date.and_hms_opt(23, 59, 59)
        .map(|ndt| DateTime::from_naive_utc_and_offset(ndt, Utc))
}

/// Resolve a period start: the datetime field wins when present and
/// parseable; a date-only value means the start of that day (UTC).
pub fn resolve_start(datetime: Option<&str>, date: Option<&str>) -> Option<DateTime<Utc>> {
    if let Some(dt) = datetime.and_then(parse_datetime) {
        return Some(dt);
    }
    date.and_then(parse_date).and_then(start_of_day)
}

/// Resolve a period end: the datetime field wins when present and
/// parseable; a date-only value means the end of that day (UTC), so an
/// order is not late until the whole end date has passed.
pub fn resolve_end(datetime: Option<&str>, date: Option<&str>) -> Option<DateTime<Utc>> {
    if let Some(dt) = datetime.and_then(parse_datetime) {
        return Some(dt);
    }
    date.and_then(parse_date).and_then(end_of_day)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn rfc3339_roundtrip() {
        let dt = parse_datetime("2026-03-01T10:30:00Z").unwrap();
        assert_eq!(dt.hour(), 10);
    }

    #[test]
    fn naive_forms_are_utc() {
        assert!(parse_datetime("2026-03-01T10:30:00").is_some());
        assert!(parse_datetime("2026-03-01 10:30:00").is_some());
    }

    #[test]
    fn garbage_is_none() {
        assert!(parse_datetime("not a date").is_none());
        assert!(parse_date("01/03/2026").is_none());
    }

    #[test]
    fn datetime_field_wins_over_date() {
        let end = resolve_end(Some("2026-03-01T18:00:00Z"), Some("2026-03-05")).unwrap();
        assert_eq!(end.hour(), 18);
    }

    #[test]
    fn unparseable_datetime_falls_back_to_date() {
        let end = resolve_end(Some("garbage"), Some("2026-03-05")).unwrap();
        assert_eq!(end.hour(), 23);
        assert_eq!(end.minute(), 59);
    }

    #[test]
    fn date_only_end_means_end_of_day() {
        let end = resolve_end(None, Some("2026-03-05")).unwrap();
        let just_before = parse_datetime("2026-03-05T12:00:00Z").unwrap();
        assert!(just_before < end);
    }
}
