//! Turns event markup into [`EventRecord`]s.
//!
//! Expected shape of one event:
//!
//! ```html
//! <li class="cal-event cal-cat-work all-day">
//!   <a href="/events/1" class="editable" data-event-id="1">
//!     <span class="title">Standup</span>
//!     <span class="location">Room 2</span>
//!     <time class="start" datetime="2024-03-01T09:00:00+02:00"/>
//!     <time class="end" datetime="2024-03-01T09:15:00+02:00"/>
//!   </a>
//! </li>
//! ```

use chrono::{DateTime, FixedOffset};
use chrono_tz::Tz;
use std::collections::{BTreeMap, BTreeSet};
use tracing::error;

use super::models::EventRecord;
use super::time::{parse_zone, to_timezone};
use crate::markup::{Compound, Element, Selector};

/// Marker class of an event node; never reported as a category
pub const EVENT_CLASS: &str = "cal-event";
/// Class of the container holding the event nodes
pub const EVENTS_CLASS: &str = "cal-events";
/// Prefix of category classes
pub const CATEGORY_PREFIX: &str = "cal-cat";

const ALL_DAY_CLASS: &str = "all-day";
const DATA_PREFIX: &str = "data-";

/// Extracts event records, optionally moving timestamps into one zone
#[derive(Debug, Clone, Default)]
pub struct EventExtractor {
    timezone: Option<Tz>,
}

impl EventExtractor {
    pub fn new(timezone: Option<Tz>) -> Self {
        Self { timezone }
    }

    /// One record per `.cal-event` node under `container`, in document order
    pub fn extract(&self, container: &Element) -> Vec<EventRecord> {
        container
            .select(&Selector::class(EVENT_CLASS))
            .into_iter()
            .map(|node| self.extract_one(node))
            .collect()
    }

    /// Extract from every `.cal-events` container under `root`
    pub fn extract_from(&self, root: &Element) -> Vec<EventRecord> {
        root.select(&Selector::class(EVENTS_CLASS))
            .into_iter()
            .flat_map(|container| self.extract(container))
            .collect()
    }

    fn extract_one(&self, node: &Element) -> EventRecord {
        let anchor = node.select_first(&Compound::tag("a").into());

        let mut categories: BTreeSet<String> = node
            .classes()
            .filter(|class| *class != EVENT_CLASS)
            .map(str::to_string)
            .collect();
        let mut attributes = BTreeMap::new();
        if let Some(anchor) = anchor {
            categories.extend(anchor.classes().map(str::to_string));
            for (name, value) in &anchor.attributes {
                if name.starts_with(DATA_PREFIX) {
                    attributes.insert(name.clone(), value.clone());
                }
            }
        }

        let location = node
            .select_first(&Selector::class("location"))
            .map(|el| el.inner_html().trim().to_string())
            .unwrap_or_default();
        let bare_title = node
            .select_first(&Selector::class("title"))
            .map(|el| el.text().trim().to_string())
            .unwrap_or_default();
        let title = if location.is_empty() {
            bare_title.clone()
        } else {
            format!("{} ({})", bare_title, location)
        };

        let record = EventRecord {
            title,
            search_text: bare_title,
            start: self.timestamp(node, "start"),
            end: self.timestamp(node, "end"),
            all_day: node.has_class(ALL_DAY_CLASS),
            url: anchor
                .and_then(|a| a.attr("href"))
                .unwrap_or_default()
                .to_string(),
            categories,
            attributes,
            editable: true,
        };

        if record.title.is_empty() {
            error!("No event title for: {}", describe(node));
        }
        if record.start.is_none() {
            error!("No event start for: {}", describe(node));
        }
        if record.url.is_empty() {
            error!("No event url for: {}", describe(node));
        }

        record
    }

    fn timestamp(&self, node: &Element, class: &str) -> Option<DateTime<FixedOffset>> {
        let literal = node.select_first(&Selector::class(class))?.attr("datetime")?;
        let dt = parse_zone(literal)?;
        Some(match self.timezone {
            Some(tz) => to_timezone(dt, tz),
            None => dt,
        })
    }
}

/// Categories (`cal-cat*` classes) used by any event under `root`
pub fn known_categories(root: &Element) -> BTreeSet<String> {
    root.select(&Selector::chain(vec![
        Compound::class(EVENTS_CLASS),
        Compound::class(EVENT_CLASS),
    ]))
    .into_iter()
    .flat_map(|event| {
        event
            .classes()
            .filter(|class| class.starts_with(CATEGORY_PREFIX))
            .map(str::to_string)
            .collect::<Vec<_>>()
    })
    .collect()
}

fn describe(node: &Element) -> String {
    let text = node.text();
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    format!("<{} class=\"{}\"> {}", node.tag, node.attr("class").unwrap_or(""), text)
}
