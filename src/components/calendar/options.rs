//! Options of the calendar pattern, read from `data-pat-calendar`.
//!
//! The attribute holds `key: value` pairs separated by `;`, for example
//! `data-pat-calendar="default-view: agendaWeek; store: local"`.

use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use super::models::ViewMode;
use super::time::{parse_date, parse_first_day};
use crate::components::store_service::StoreScope;

pub const OPTIONS_ATTRIBUTE: &str = "data-pat-calendar";
pub const TOOLTIP_ATTRIBUTE: &str = "data-pat-calendar-tooltip";

/// Calendar height: fit content, or a fixed number of pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Height {
    #[default]
    Auto,
    Pixels(u32),
}

/// Typed calendar options with the pattern defaults applied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarOptions {
    pub height: Height,
    pub start_date: Option<NaiveDate>,
    pub time_format: String,
    pub title_month: String,
    pub title_week: String,
    pub title_day: String,
    pub column_month: String,
    pub column_week: String,
    pub column_day: String,
    pub first_day: Weekday,
    pub first_hour: u32,
    pub calendar_controls: Option<String>,
    pub category_controls: Option<String>,
    pub default_view: ViewMode,
    pub store: StoreScope,
    pub ignore_url: bool,
    pub tooltip: Option<String>,
}

impl Default for CalendarOptions {
    fn default() -> Self {
        Self {
            height: Height::Auto,
            start_date: None,
            time_format: "%H:%M".to_string(),
            title_month: "%B %Y".to_string(),
            title_week: "%b %-d %Y".to_string(),
            title_day: "%A, %b %-d, %Y".to_string(),
            column_month: "%a".to_string(),
            column_week: "%a %-m/%-d".to_string(),
            column_day: "%A %-m/%-d".to_string(),
            first_day: Weekday::Sun,
            first_hour: 6,
            calendar_controls: None,
            category_controls: None,
            default_view: ViewMode::Month,
            store: StoreScope::None,
            ignore_url: false,
            tooltip: None,
        }
    }
}

/// Split `key: value; key: value` into pairs. Keys are lowercased; pairs
/// without a colon are skipped.
pub fn parse_arguments(input: &str) -> HashMap<String, String> {
    input
        .split(';')
        .filter_map(|part| {
            let (key, value) = part.split_once(':')?;
            let key = key.trim().to_ascii_lowercase();
            if key.is_empty() {
                return None;
            }
            Some((key, value.trim().to_string()))
        })
        .collect()
}

fn choice<T>(key: &str, value: &str, default: T) -> T
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match value.parse::<T>() {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!("Invalid value for calendar option '{}': {}", key, e);
            default
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    Some(value.to_string()).filter(|v| !v.is_empty())
}

impl CalendarOptions {
    /// Options from the raw `data-pat-calendar` and tooltip attributes
    pub fn parse(arguments: Option<&str>, tooltip: Option<&str>) -> Self {
        let mut options = Self::default();
        let defaults = Self::default();

        for (key, value) in parse_arguments(arguments.unwrap_or_default()) {
            match key.as_str() {
                "height" => {
                    options.height = if value == "auto" {
                        Height::Auto
                    } else {
                        value
                            .trim_end_matches("px")
                            .parse::<u32>()
                            .map(Height::Pixels)
                            .unwrap_or_else(|_| {
                                warn!("Invalid value for calendar option 'height': {}", value);
                                Height::Auto
                            })
                    }
                }
                "start-date" => {
                    options.start_date = parse_date(&value);
                    if options.start_date.is_none() && !value.is_empty() {
                        warn!("Invalid value for calendar option 'start-date': {}", value);
                    }
                }
                "time-format" => options.time_format = value,
                "title-month" => options.title_month = value,
                "title-week" => options.title_week = value,
                "title-day" => options.title_day = value,
                "column-month" => options.column_month = value,
                "column-week" => options.column_week = value,
                "column-day" => options.column_day = value,
                // Anything but a two-letter day name keeps the renderer default
                "first-day" => options.first_day = parse_first_day(&value).unwrap_or(defaults.first_day),
                "first-hour" => options.first_hour = choice(&key, &value, defaults.first_hour),
                "calendar-controls" => options.calendar_controls = non_empty(&value),
                "category-controls" => options.category_controls = non_empty(&value),
                "default-view" => options.default_view = choice(&key, &value, defaults.default_view),
                "store" => options.store = choice(&key, &value, defaults.store),
                "ignore-url" => options.ignore_url = choice(&key, &value, defaults.ignore_url),
                other => warn!("Unknown calendar option '{}'", other),
            }
        }

        options.tooltip = tooltip.and_then(non_empty);
        options
    }
}
