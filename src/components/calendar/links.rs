use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::Serialize;
use url::Url;

use super::models::EventRecord;

pub const EVENT_DROP_PARAM: &str = "pat-calendar-event-drop";

/// Append `key=value` to a URL's query. Relative URLs are handled too.
pub fn add_query_parameter(url: &str, key: &str, value: &str) -> String {
    if let Ok(mut parsed) = Url::parse(url) {
        parsed.query_pairs_mut().append_pair(key, value);
        return parsed.to_string();
    }

    let (base, fragment) = match url.split_once('#') {
        Some((base, fragment)) => (base, Some(fragment)),
        None => (url, None),
    };
    let separator = if base.contains('?') { '&' } else { '?' };
    let mut out = format!(
        "{}{}{}={}",
        base,
        separator,
        urlencoding::encode(key),
        urlencoding::encode(value)
    );
    if let Some(fragment) = fragment {
        out.push('#');
        out.push_str(fragment);
    }
    out
}

/// A tooltip to open after a click on a day cell
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TooltipRequest {
    pub url: String,
    /// Tooltip configuration without the `url` entry
    pub options: String,
}

/// Build the tooltip for a click on `date` from the calendar's tooltip
/// configuration (`url: /path; other: options`). Nothing happens when the
/// configuration has no url.
pub fn tooltip_request(tooltip: &str, date: NaiveDate) -> Option<TooltipRequest> {
    let start = tooltip.find("url: ")?;
    let value_start = start + "url: ".len();
    let (value, entry_end) = match tooltip[value_start..].find(';') {
        Some(offset) => (
            &tooltip[value_start..value_start + offset],
            value_start + offset + 1,
        ),
        None => (&tooltip[value_start..], tooltip.len()),
    };

    let options = format!("{}{}", &tooltip[..start], &tooltip[entry_end..]);
    Some(TooltipRequest {
        url: add_query_parameter(value, "date", &date.format("%Y-%m-%d").to_string()),
        options: options.trim().to_string(),
    })
}

/// URL to call when `record` is dropped onto a new time slot
pub fn event_drop_url(
    record: &EventRecord,
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
) -> Option<String> {
    if record.url.is_empty() {
        return None;
    }
    let url = add_query_parameter(&record.url, "start", &start.to_rfc3339());
    let url = add_query_parameter(&url, "end", &end.to_rfc3339());
    Some(add_query_parameter(&url, EVENT_DROP_PARAM, "true"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_query_parameter() {
        assert_eq!(add_query_parameter("/day", "date", "2024-03-01"), "/day?date=2024-03-01");
        assert_eq!(add_query_parameter("/day?x=1#top", "a b", "c&d"), "/day?x=1&a%20b=c%26d#top");
        assert_eq!(
            add_query_parameter("https://example.org/day?x=1", "date", "2024-03-01"),
            "https://example.org/day?x=1&date=2024-03-01"
        );
    }

    #[test]
    fn test_tooltip_request() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let request = tooltip_request("url: /new-event; position: lt", date).unwrap();
        assert_eq!(request.url, "/new-event?date=2024-03-01");
        assert_eq!(request.options, "position: lt");

        let request = tooltip_request("trigger: click; url: /new", date).unwrap();
        assert_eq!(request.url, "/new?date=2024-03-01");
        assert_eq!(request.options, "trigger: click;");

        assert!(tooltip_request("position: lt", date).is_none());
    }

    #[test]
    fn test_event_drop_url() {
        let at = |s: &str| DateTime::parse_from_rfc3339(s).unwrap();
        let record = EventRecord {
            url: "/events/1".to_string(),
            ..Default::default()
        };
        let url = event_drop_url(&record, at("2024-03-01T09:00:00+02:00"), at("2024-03-01T10:00:00+02:00")).unwrap();
        assert_eq!(
            url,
            "/events/1?start=2024-03-01T09%3A00%3A00%2B02%3A00&end=2024-03-01T10%3A00%3A00%2B02%3A00&pat-calendar-event-drop=true"
        );
        assert!(event_drop_url(&EventRecord::default(), at("2024-03-01T09:00:00Z"), at("2024-03-01T10:00:00Z")).is_none());
    }
}
