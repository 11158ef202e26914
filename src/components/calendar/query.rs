use chrono::NaiveDate;
use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

use super::time::parse_date;

/// A query-string value: plain text, or JSON when it looks like an array
/// or object
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    Text(String),
    Json(Value),
}

impl QueryValue {
    fn parse(raw: &str) -> Self {
        let decoded = match urlencoding::decode(raw) {
            Ok(decoded) => decoded.into_owned(),
            Err(e) => {
                warn!("Could not decode query value '{}': {}", raw, e);
                raw.to_string()
            }
        };

        let looks_like_json = (decoded.starts_with('[') && decoded.ends_with(']'))
            || (decoded.starts_with('{') && decoded.ends_with('}'));
        if looks_like_json {
            match serde_json::from_str(&decoded) {
                Ok(value) => return QueryValue::Json(value),
                Err(e) => warn!("Query value '{}' is not valid JSON: {}", decoded, e),
            }
        }
        QueryValue::Text(decoded)
    }

    /// Text value, if non-empty
    pub fn as_text(&self) -> Option<&str> {
        match self {
            QueryValue::Text(text) if !text.is_empty() => Some(text),
            QueryValue::Json(Value::String(text)) if !text.is_empty() => Some(text),
            _ => None,
        }
    }

    /// Interpret the value as a date. JSON dates use zero-based months:
    /// `[2024, 2, 1]` or `{"year": 2024, "month": 2, "day": 1}`.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            QueryValue::Text(text) => parse_date(text),
            QueryValue::Json(Value::Array(parts)) => {
                let number = |i: usize, default: i64| {
                    parts.get(i).map_or(Some(default), Value::as_i64)
                };
                json_date(number(0, 0)?, number(1, 0)?, number(2, 1)?)
            }
            QueryValue::Json(Value::Object(fields)) => {
                let number = |keys: &[&str], default: i64| {
                    keys.iter()
                        .find_map(|key| fields.get(*key))
                        .map_or(Some(default), Value::as_i64)
                };
                json_date(
                    number(&["year", "y"], 0)?,
                    number(&["month", "M"], 0)?,
                    number(&["day", "date", "d"], 1)?,
                )
            }
            QueryValue::Json(Value::String(text)) => parse_date(text),
            QueryValue::Json(_) => None,
        }
    }
}

fn json_date(year: i64, month0: i64, day: i64) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(
        i32::try_from(year).ok()?,
        u32::try_from(month0 + 1).ok()?,
        u32::try_from(day).ok()?,
    )
}

/// Parameters of a query string, with or without the leading `?`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams {
    values: HashMap<String, QueryValue>,
}

impl QueryParams {
    /// Split on `&`, then on `=`. Only the text between the first and second
    /// `=` is kept as the value; a missing value reads as empty text.
    pub fn parse(search: &str) -> Self {
        let search = search.strip_prefix('?').unwrap_or(search);
        let values = search
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| {
                let mut parts = pair.split('=');
                let key = parts.next().unwrap_or_default().to_string();
                let value = QueryValue::parse(parts.next().unwrap_or_default());
                (key, value)
            })
            .collect();
        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<&QueryValue> {
        self.values.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_text_and_json() {
        let params = QueryParams::parse("?default-view=agendaWeek&tags=%5B%22a%22%2C%22b%22%5D&q=a%20b");
        assert_eq!(params.get("default-view").and_then(QueryValue::as_text), Some("agendaWeek"));
        assert_eq!(
            params.get("tags"),
            Some(&QueryValue::Json(serde_json::json!(["a", "b"])))
        );
        assert_eq!(params.get("q").and_then(QueryValue::as_text), Some("a b"));
        assert!(params.get("missing").is_none());
    }

    #[test]
    fn test_plus_is_not_a_space() {
        let params = QueryParams::parse("q=a+b");
        assert_eq!(params.get("q").and_then(QueryValue::as_text), Some("a+b"));
    }

    #[test]
    fn test_empty_and_broken_values() {
        let params = QueryParams::parse("a=&b&&c={not json}");
        assert_eq!(params.get("a").and_then(QueryValue::as_text), None);
        assert_eq!(params.get("b"), Some(&QueryValue::Text(String::new())));
        assert_eq!(params.get("c").and_then(QueryValue::as_text), Some("{not json}"));
        assert!(QueryParams::parse("").is_empty());
    }

    #[test]
    fn test_dates() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 1);
        let params = QueryParams::parse(
            "a=2024-03-01&b=%5B2024%2C2%2C1%5D&c=%7B%22year%22%3A2024%2C%22month%22%3A2%2C%22day%22%3A1%7D&d=soon",
        );
        assert_eq!(params.get("a").and_then(QueryValue::as_date), expected);
        assert_eq!(params.get("b").and_then(QueryValue::as_date), expected);
        assert_eq!(params.get("c").and_then(QueryValue::as_date), expected);
        assert_eq!(params.get("d").and_then(QueryValue::as_date), None);
    }
}
