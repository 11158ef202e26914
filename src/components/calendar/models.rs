use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// One calendar event as handed to the renderer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EventRecord {
    pub title: String,
    /// Bare `.title` text, without the location suffix; searches run on it
    #[serde(skip)]
    pub search_text: String,
    pub start: Option<DateTime<FixedOffset>>,
    pub end: Option<DateTime<FixedOffset>>,
    pub all_day: bool,
    pub url: String,
    pub categories: BTreeSet<String>,
    pub attributes: BTreeMap<String, String>,
    pub editable: bool,
}

impl EventRecord {
    /// Title, start and url are all present
    pub fn is_well_formed(&self) -> bool {
        !self.title.is_empty() && self.start.is_some() && !self.url.is_empty()
    }

    /// Whether the event touches the half-open window `[from, to)`.
    /// Events without a start are always considered inside.
    pub fn overlaps(&self, from: DateTime<FixedOffset>, to: DateTime<FixedOffset>) -> bool {
        let Some(start) = self.start else {
            return true;
        };
        let end = self.end.unwrap_or(start);
        start < to && (end > from || start >= from)
    }
}

/// Search text and enabled categories, as set by the filter controls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FilterState {
    pub search_text: Option<String>,
    pub active_categories: BTreeSet<String>,
}

impl FilterState {
    pub fn new<I, S>(search_text: Option<&str>, active_categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            search_text: search_text.map(str::to_string),
            active_categories: active_categories.into_iter().map(Into::into).collect(),
        }
    }

    pub fn set_category(&mut self, category: &str, active: bool) {
        if active {
            self.active_categories.insert(category.to_string());
        } else {
            self.active_categories.remove(category);
        }
    }
}

/// Calendar display modes, named as the renderer knows them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ViewMode {
    #[default]
    #[serde(rename = "month")]
    Month,
    #[serde(rename = "basicWeek")]
    BasicWeek,
    #[serde(rename = "basicDay")]
    BasicDay,
    #[serde(rename = "agendaWeek")]
    AgendaWeek,
    #[serde(rename = "agendaDay")]
    AgendaDay,
}

impl ViewMode {
    pub const ALL: [ViewMode; 5] = [
        ViewMode::Month,
        ViewMode::BasicWeek,
        ViewMode::BasicDay,
        ViewMode::AgendaWeek,
        ViewMode::AgendaDay,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ViewMode::Month => "month",
            ViewMode::BasicWeek => "basicWeek",
            ViewMode::BasicDay => "basicDay",
            ViewMode::AgendaWeek => "agendaWeek",
            ViewMode::AgendaDay => "agendaDay",
        }
    }

    pub fn is_week(&self) -> bool {
        matches!(self, ViewMode::BasicWeek | ViewMode::AgendaWeek)
    }

    pub fn is_day(&self) -> bool {
        matches!(self, ViewMode::BasicDay | ViewMode::AgendaDay)
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ViewMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ViewMode::ALL
            .into_iter()
            .find(|mode| mode.name() == s)
            .ok_or_else(|| format!("Unknown view '{}'", s))
    }
}

/// Position of the calendar that survives reloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ViewState {
    pub date: Option<NaiveDate>,
    pub view: ViewMode,
}

/// Lifecycle of one calendar instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Lifecycle {
    Init,
    Ready,
    Destroyed,
}

/// What the calendar currently shows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarSnapshot {
    pub id: String,
    pub lifecycle: Lifecycle,
    pub view_state: ViewState,
    pub title: String,
    pub timezone: Option<String>,
    pub events: Vec<EventRecord>,
}
