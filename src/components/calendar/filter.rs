use regex::{Regex, RegexBuilder};
use std::collections::BTreeSet;
use tracing::{debug, warn};

use super::extractor::known_categories;
use super::models::{EventRecord, FilterState};
use crate::markup::{Compound, Element, Selector};

/// Compiled form of a [`FilterState`]
#[derive(Debug, Clone)]
pub struct EventFilter {
    search: Option<SearchPattern>,
    active_categories: BTreeSet<String>,
}

#[derive(Debug, Clone)]
enum SearchPattern {
    Pattern(Regex),
    Literal(String),
}

impl SearchPattern {
    // Search text is a case-insensitive pattern; text that does not
    // compile is matched literally.
    fn compile(text: &str) -> Self {
        match RegexBuilder::new(text).case_insensitive(true).build() {
            Ok(pattern) => SearchPattern::Pattern(pattern),
            Err(e) => {
                warn!("Search text '{}' is not a valid pattern, matching literally: {}", text, e);
                SearchPattern::Literal(text.to_lowercase())
            }
        }
    }

    fn is_match(&self, title: &str) -> bool {
        match self {
            SearchPattern::Pattern(pattern) => pattern.is_match(title),
            SearchPattern::Literal(text) => title.to_lowercase().contains(text.as_str()),
        }
    }
}

impl EventFilter {
    pub fn new(state: &FilterState) -> Self {
        let search = state
            .search_text
            .as_deref()
            .filter(|text| !text.is_empty())
            .map(SearchPattern::compile);

        Self {
            search,
            active_categories: state.active_categories.clone(),
        }
    }

    /// A record passes when one of its categories is active and, if a
    /// search is set, its bare title (without location) matches.
    pub fn matches(&self, record: &EventRecord) -> bool {
        if let Some(search) = &self.search {
            if !search.is_match(&record.search_text) {
                debug!("remove due to search-text: {}", record.title);
                return false;
            }
        }

        record
            .categories
            .iter()
            .any(|category| self.active_categories.contains(category))
    }

    pub fn apply(&self, records: &[EventRecord]) -> Vec<EventRecord> {
        records
            .iter()
            .filter(|record| self.matches(record))
            .cloned()
            .collect()
    }
}

/// Narrow `records` to what `state` lets through
pub fn filter(records: &[EventRecord], state: &FilterState) -> Vec<EventRecord> {
    EventFilter::new(state).apply(records)
}

/// Read the filter controls of a calendar.
///
/// The search text is the `value` of `.filter .search-text` under
/// `calendar`. A known category is active when a checked checkbox under
/// `category_root` carries its class, either on the checkbox itself or on
/// one of its ancestors.
pub fn read_filter_state(calendar: &Element, category_root: &Element) -> FilterState {
    let search_text = calendar
        .select_first(&Selector::chain(vec![
            Compound::class("filter"),
            Compound::class("search-text"),
        ]))
        .and_then(|input| input.attr("value"))
        .filter(|value| !value.is_empty())
        .map(str::to_string);

    let checkbox: Selector = Compound::tag("input")
        .with_attr("type", Some("checkbox"))
        .with_attr("checked", None)
        .into();
    let mut checked_classes = BTreeSet::new();
    for (control, ancestors) in category_root.select_with_ancestors(&checkbox) {
        checked_classes.extend(control.classes().map(str::to_string));
        for ancestor in ancestors {
            checked_classes.extend(ancestor.classes().map(str::to_string));
        }
    }

    let active_categories = known_categories(calendar)
        .into_iter()
        .filter(|category| checked_classes.contains(category))
        .collect();

    FilterState {
        search_text,
        active_categories,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::parse_document;

    fn record(title: &str, categories: &[&str]) -> EventRecord {
        EventRecord {
            title: title.to_string(),
            search_text: title.to_string(),
            categories: categories.iter().map(|c| c.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_no_active_categories_shows_nothing() {
        let records = vec![record("Foobar", &["A"]), record("bar", &["B"])];
        assert!(filter(&records, &FilterState::default()).is_empty());
        assert!(filter(&records, &FilterState::new(Some("foo"), Vec::<String>::new())).is_empty());
    }

    #[test]
    fn test_category_inclusion() {
        let state = FilterState::new(None, ["A"]);
        assert!(filter(&[record("x", &["B"])], &state).is_empty());
        assert_eq!(filter(&[record("x", &["A", "B"])], &state).len(), 1);
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let state = FilterState::new(Some("foo"), ["A"]);
        let out = filter(&[record("Foobar", &["A"]), record("bar", &["A"])], &state);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].title, "Foobar");
    }

    #[test]
    fn test_search_text_is_a_pattern() {
        let state = FilterState::new(Some("st.nd"), ["A"]);
        let out = filter(&[record("Standup", &["A"]), record("st.nd", &["A"]), record("stand", &["A"])], &state);
        assert_eq!(out.len(), 3);

        let anchored = FilterState::new(Some("^up"), ["A"]);
        assert!(filter(&[record("Standup", &["A"])], &anchored).is_empty());
    }

    #[test]
    fn test_search_ignores_location() {
        let dentist = EventRecord {
            title: "Dentist (Town)".to_string(),
            search_text: "Dentist".to_string(),
            categories: ["A".to_string()].into_iter().collect(),
            ..Default::default()
        };

        assert!(filter(&[dentist.clone()], &FilterState::new(Some("Town"), ["A"])).is_empty());
        assert_eq!(filter(&[dentist], &FilterState::new(Some("Dentist$"), ["A"])).len(), 1);
    }

    #[test]
    fn test_invalid_pattern_matches_literally() {
        let state = FilterState::new(Some("(lunch"), ["A"]);
        let out = filter(&[record("Team (Lunch)", &["A"]), record("lunch", &["A"])], &state);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].title, "Team (Lunch)");
    }

    #[test]
    fn test_filter_does_not_touch_input() {
        let records = vec![record("Foobar", &["A"])];
        let state = FilterState::new(Some("foo"), ["A"]);
        let before = (records.clone(), state.clone());
        let _ = filter(&records, &state);
        assert_eq!((records, state), before);
    }

    #[test]
    fn test_read_filter_state() {
        let root = parse_document(
            r#"<div class="pat-calendar">
                <form class="filter">
                    <input class="search-text" type="search" value="stand"/>
                </form>
                <fieldset class="cal-cat-work">
                    <input type="checkbox" checked="checked"/>
                </fieldset>
                <input type="checkbox" class="cal-cat-home"/>
                <input type="checkbox" class="cal-cat-gym" checked="checked"/>
                <ul class="cal-events">
                    <li class="cal-event cal-cat-work"/>
                    <li class="cal-event cal-cat-home"/>
                </ul>
            </div>"#,
        )
        .unwrap();

        let state = read_filter_state(&root, &root);
        assert_eq!(state.search_text.as_deref(), Some("stand"));
        // cal-cat-gym is checked but no event uses it
        assert_eq!(
            state.active_categories.into_iter().collect::<Vec<_>>(),
            vec!["cal-cat-work".to_string()]
        );
    }

    #[test]
    fn test_missing_controls_activate_nothing() {
        let root = parse_document(
            r#"<div><ul class="cal-events"><li class="cal-event cal-cat-work"/></ul></div>"#,
        )
        .unwrap();
        let state = read_filter_state(&root, &root);
        assert_eq!(state, FilterState::default());
    }
}
