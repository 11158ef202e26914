use crate::components::store_service::Storage;
use crate::config::Config;
use crate::error::PatternResult;
use crate::markup::Element;
use chrono::{DateTime, FixedOffset, NaiveDate};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use super::actor::{CalendarActor, CalendarActorHandle, Navigation};
use super::links::{self, TooltipRequest};
use super::models::{CalendarSnapshot, EventRecord, ViewMode, ViewState};
use super::renderer::CalendarRenderer;

/// Handle for interacting with one calendar instance
#[derive(Clone)]
pub struct CalendarHandle {
    actor_handle: CalendarActorHandle,
    _actor_task: Arc<JoinHandle<()>>,
}

impl CalendarHandle {
    /// Create a new CalendarHandle and spawn the actor for `calendar`
    pub fn new(
        config: Arc<RwLock<Config>>,
        storage: &Storage,
        document: Arc<Element>,
        calendar: Element,
        renderer: Box<dyn CalendarRenderer>,
    ) -> Self {
        let (mut actor, handle) = CalendarActor::new(config, storage, document, calendar, renderer);

        let actor_task = tokio::spawn(async move {
            actor.run().await;
        });

        Self {
            actor_handle: handle,
            _actor_task: Arc::new(actor_task),
        }
    }

    pub async fn next(&self) -> PatternResult<ViewState> {
        self.actor_handle.navigate(Navigation::Next).await
    }

    pub async fn prev(&self) -> PatternResult<ViewState> {
        self.actor_handle.navigate(Navigation::Prev).await
    }

    pub async fn today(&self) -> PatternResult<ViewState> {
        self.actor_handle.navigate(Navigation::Today).await
    }

    pub async fn change_view(&self, view: ViewMode) -> PatternResult<ViewState> {
        self.actor_handle.change_view(view).await
    }

    /// Events for `[start, end)` as the renderer would request them
    pub async fn fetch_events(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        timezone: Option<&str>,
    ) -> PatternResult<Vec<EventRecord>> {
        self.actor_handle
            .fetch_events(start, end, timezone.map(str::to_string))
            .await
    }

    /// Update the search text; the refetch runs after the debounce delay
    pub async fn search(&self, text: &str) -> PatternResult<()> {
        self.actor_handle.search(text.to_string()).await
    }

    pub async fn set_category(&self, category: &str, active: bool) -> PatternResult<Vec<EventRecord>> {
        self.actor_handle
            .set_category(category.to_string(), active)
            .await
    }

    pub async fn update_document(&self, document: Arc<Element>) -> PatternResult<()> {
        self.actor_handle.update_document(document).await
    }

    pub async fn change_timezone(&self, timezone: Option<&str>) -> PatternResult<ViewState> {
        self.actor_handle
            .change_timezone(timezone.map(str::to_string))
            .await
    }

    pub async fn day_click(&self, date: NaiveDate) -> PatternResult<Option<TooltipRequest>> {
        self.actor_handle.day_click(date).await
    }

    pub fn event_drop_url(
        &self,
        record: &EventRecord,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Option<String> {
        links::event_drop_url(record, start, end)
    }

    pub async fn snapshot(&self) -> PatternResult<CalendarSnapshot> {
        self.actor_handle.snapshot().await
    }

    /// Shutdown the actor
    pub async fn destroy(&self) -> PatternResult<()> {
        self.actor_handle.destroy().await
    }
}
