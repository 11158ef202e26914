use chrono::{
    DateTime, Datelike, Duration, FixedOffset, Months, NaiveDate, NaiveDateTime, TimeZone, Weekday,
};
use chrono_tz::Tz;
use std::fmt::Write;
use tracing::warn;

use super::models::ViewMode;

/// Parse a machine-readable datetime literal, keeping the offset it was
/// written with. Literals without an offset are taken as UTC.
pub fn parse_zone(literal: &str) -> Option<DateTime<FixedOffset>> {
    let literal = literal.trim();
    if literal.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(literal) {
        return Some(dt);
    }
    if let Ok(dt) = DateTime::parse_from_str(literal, "%Y-%m-%dT%H:%M%:z") {
        return Some(dt);
    }

    let utc = FixedOffset::east_opt(0)?;
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(literal, format) {
            return utc.from_local_datetime(&naive).single();
        }
    }

    let date = NaiveDate::parse_from_str(literal, "%Y-%m-%d").ok()?;
    utc.from_local_datetime(&date.and_hms_opt(0, 0, 0)?).single()
}

/// Look up an IANA timezone name
pub fn parse_timezone(name: &str) -> Option<Tz> {
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    match name.parse::<Tz>() {
        Ok(tz) => Some(tz),
        Err(_) => {
            warn!("Ignoring unknown timezone '{}'", name);
            None
        }
    }
}

/// Convert a timestamp into `tz`, keeping a fixed-offset representation
pub fn to_timezone(dt: DateTime<FixedOffset>, tz: Tz) -> DateTime<FixedOffset> {
    dt.with_timezone(&tz).fixed_offset()
}

/// Read a stored or URL-provided date. Accepts plain dates and full
/// timestamps, of which only the date part is kept.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_zone(value).map(|dt| dt.date_naive()))
}

/// First day of the week containing `date`
pub fn week_start(date: NaiveDate, first_day: Weekday) -> NaiveDate {
    let offset = (7 + date.weekday().num_days_from_sunday() - first_day.num_days_from_sunday()) % 7;
    date - Duration::days(offset as i64)
}

/// Visible date range `[start, end)` of a view around `date`.
/// Month views always span six full weeks.
pub fn visible_range(date: NaiveDate, view: ViewMode, first_day: Weekday) -> (NaiveDate, NaiveDate) {
    if view.is_day() {
        return (date, date + Duration::days(1));
    }
    if view.is_week() {
        let start = week_start(date, first_day);
        return (start, start + Duration::days(7));
    }
    let first_of_month = date.with_day(1).unwrap_or(date);
    let start = week_start(first_of_month, first_day);
    (start, start + Duration::days(42))
}

/// Move `date` one view step forward or back
pub fn step(date: NaiveDate, view: ViewMode, forward: bool) -> NaiveDate {
    if view.is_day() {
        return date + Duration::days(if forward { 1 } else { -1 });
    }
    if view.is_week() {
        return date + Duration::days(if forward { 7 } else { -7 });
    }
    let moved = if forward {
        date.checked_add_months(Months::new(1))
    } else {
        date.checked_sub_months(Months::new(1))
    };
    moved.unwrap_or(date)
}

/// Midnight of `date` in `tz`, or in UTC when no timezone is set
pub fn start_of_day(date: NaiveDate, tz: Option<Tz>) -> Option<DateTime<FixedOffset>> {
    let naive = date.and_hms_opt(0, 0, 0)?;
    match tz {
        Some(tz) => tz
            .from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.fixed_offset()),
        None => Some(naive.and_utc().fixed_offset()),
    }
}

/// Format `date` with a strftime pattern. Invalid patterns are logged and
/// fall back to ISO dates.
pub fn format_date(date: NaiveDate, pattern: &str) -> String {
    let mut out = String::new();
    if write!(out, "{}", date.format(pattern)).is_err() {
        warn!("Invalid date format '{}'", pattern);
        return date.format("%Y-%m-%d").to_string();
    }
    out
}

/// Map the pattern's two-letter day names to a weekday
pub fn parse_first_day(value: &str) -> Option<Weekday> {
    match value {
        "su" => Some(Weekday::Sun),
        "mo" => Some(Weekday::Mon),
        "tu" => Some(Weekday::Tue),
        "we" => Some(Weekday::Wed),
        "th" => Some(Weekday::Thu),
        "fr" => Some(Weekday::Fri),
        "sa" => Some(Weekday::Sat),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_zone_keeps_offset() {
        let dt = parse_zone("2024-03-01T09:30:00+02:00").unwrap();
        assert_eq!(dt.offset().local_minus_utc(), 2 * 3600);
        assert_eq!(dt.to_rfc3339(), "2024-03-01T09:30:00+02:00");

        let naive = parse_zone("2024-03-01T09:30").unwrap();
        assert_eq!(naive.to_rfc3339(), "2024-03-01T09:30:00+00:00");

        let day = parse_zone("2024-03-01").unwrap();
        assert_eq!(day.to_rfc3339(), "2024-03-01T00:00:00+00:00");

        assert!(parse_zone("").is_none());
        assert!(parse_zone("next tuesday").is_none());
    }

    #[test]
    fn test_to_timezone() {
        let dt = parse_zone("2024-03-01T12:00:00Z").unwrap();
        let tz = parse_timezone("Europe/Helsinki").unwrap();
        assert_eq!(to_timezone(dt, tz).to_rfc3339(), "2024-03-01T14:00:00+02:00");
        assert!(parse_timezone("Mars/Olympus").is_none());
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2024-03-01"), Some(date(2024, 3, 1)));
        assert_eq!(parse_date("2024-03-01T23:00:00-05:00"), Some(date(2024, 3, 1)));
        assert_eq!(parse_date("yesterday"), None);
    }

    #[test]
    fn test_visible_range() {
        // Friday
        let d = date(2024, 3, 1);
        assert_eq!(visible_range(d, ViewMode::AgendaDay, Weekday::Sun), (d, date(2024, 3, 2)));
        assert_eq!(
            visible_range(d, ViewMode::AgendaWeek, Weekday::Sun),
            (date(2024, 2, 25), date(2024, 3, 3))
        );
        assert_eq!(
            visible_range(d, ViewMode::BasicWeek, Weekday::Mon),
            (date(2024, 2, 26), date(2024, 3, 4))
        );
        assert_eq!(
            visible_range(date(2024, 3, 20), ViewMode::Month, Weekday::Sun),
            (date(2024, 2, 25), date(2024, 4, 7))
        );
    }

    #[test]
    fn test_step() {
        assert_eq!(step(date(2024, 1, 31), ViewMode::Month, true), date(2024, 2, 29));
        assert_eq!(step(date(2024, 3, 1), ViewMode::AgendaWeek, false), date(2024, 2, 23));
        assert_eq!(step(date(2024, 3, 1), ViewMode::BasicDay, true), date(2024, 3, 2));
    }

    #[test]
    fn test_format_date() {
        assert_eq!(format_date(date(2024, 3, 1), "%B %Y"), "March 2024");
        assert_eq!(format_date(date(2024, 3, 1), "%A, %b %-d, %Y"), "Friday, Mar 1, 2024");
        assert_eq!(format_date(date(2024, 3, 1), "%Q"), "2024-03-01");
    }

    #[test]
    fn test_parse_first_day() {
        assert_eq!(parse_first_day("mo"), Some(Weekday::Mon));
        assert_eq!(parse_first_day("0"), None);
    }
}
