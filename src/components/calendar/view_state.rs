use chrono::NaiveDate;
use tracing::{debug, warn};

use super::models::{ViewMode, ViewState};
use super::query::{QueryParams, QueryValue};
use super::time::parse_date;
use crate::components::store_service::ScopedStore;

pub const DATE_KEY: &str = "date";
pub const VIEW_KEY: &str = "view";
pub const DATE_PARAM: &str = "default-date";
pub const VIEW_PARAM: &str = "default-view";

/// Keeps a calendar's date and view in its scoped store
#[derive(Debug, Clone)]
pub struct ViewStateStore {
    store: ScopedStore,
}

impl ViewStateStore {
    pub fn new(store: ScopedStore) -> Self {
        Self { store }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.store.get(key)
    }

    pub fn set(&self, key: &str, value: &str) {
        self.store.set(key, value)
    }

    /// Initial view state: `defaults`, overridden by stored values, then by
    /// URL parameters unless `ignore_url` is set.
    pub fn resolve(&self, defaults: ViewState, query: Option<&QueryParams>, ignore_url: bool) -> ViewState {
        let mut state = defaults;

        if let Some(date) = self.get(DATE_KEY).as_deref().and_then(stored_date) {
            state.date = Some(date);
        }
        if let Some(view) = self.get(VIEW_KEY).as_deref().and_then(|v| known_view(v, "store")) {
            state.view = view;
        }

        if !ignore_url {
            if let Some(query) = query {
                if let Some(date) = query.get(DATE_PARAM).and_then(url_date) {
                    state.date = Some(date);
                }
                if let Some(view) = query
                    .get(VIEW_PARAM)
                    .and_then(QueryValue::as_text)
                    .and_then(|v| known_view(v, "URL"))
                {
                    state.view = view;
                }
            }
        }

        debug!("Resolved view state {:?}", state);
        state
    }

    /// Write the current position back
    pub fn persist(&self, state: &ViewState) {
        if let Some(date) = state.date {
            self.set(DATE_KEY, &date.format("%Y-%m-%d").to_string());
        }
        self.set(VIEW_KEY, state.view.name());
    }
}

fn stored_date(value: &str) -> Option<NaiveDate> {
    if value.is_empty() {
        return None;
    }
    let date = parse_date(value);
    if date.is_none() {
        warn!("Ignoring stored date '{}'", value);
    }
    date
}

fn url_date(value: &QueryValue) -> Option<NaiveDate> {
    if matches!(value, QueryValue::Text(text) if text.is_empty()) {
        return None;
    }
    let date = value.as_date();
    if date.is_none() {
        warn!("Ignoring URL date {:?}", value);
    }
    date
}

fn known_view(value: &str, source: &str) -> Option<ViewMode> {
    if value.is_empty() {
        return None;
    }
    match value.parse() {
        Ok(view) => Some(view),
        Err(e) => {
            warn!("Ignoring view from {}: {}", source, e);
            None
        }
    }
}
