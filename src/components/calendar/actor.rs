use crate::components::store_service::Storage;
use crate::config::Config;
use crate::error::{calendar_error, PatternResult};
use crate::markup::{Compound, Element, Selector};
use crate::utils::scheduler::Debouncer;
use chrono::{Local, NaiveDate};
use chrono_tz::Tz;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

use super::extractor::EventExtractor;
use super::filter::{read_filter_state, EventFilter};
use super::links::{tooltip_request, TooltipRequest};
use super::models::{CalendarSnapshot, EventRecord, FilterState, Lifecycle, ViewMode, ViewState};
use super::options::{CalendarOptions, OPTIONS_ATTRIBUTE, TOOLTIP_ATTRIBUTE};
use super::query::QueryParams;
use super::renderer::{CalendarRenderer, RenderOptions};
use super::time::{parse_timezone, start_of_day};
use super::view_state::ViewStateStore;

/// Name used for store namespaces and logs
pub const PATTERN_NAME: &str = "calendar";
/// Class marking a calendar element
pub const CALENDAR_CLASS: &str = "pat-calendar";

/// Navigation buttons of the calendar controls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Next,
    Prev,
    Today,
}

/// The calendar actor that processes messages
pub struct CalendarActor {
    config: Arc<RwLock<Config>>,
    document: Arc<Element>,
    calendar: Element,
    id: String,
    /// Index among the document's calendars, used to find one without an id
    position: usize,
    options: CalendarOptions,
    view_store: ViewStateStore,
    renderer: Box<dyn CalendarRenderer>,
    filter_state: FilterState,
    timezone: Option<Tz>,
    lifecycle: Lifecycle,
    debouncer: Option<Debouncer>,
    command_rx: mpsc::Receiver<CalendarCommand>,
    refetch_tx: mpsc::WeakSender<CalendarCommand>,
}

/// Commands that can be sent to the calendar actor
pub enum CalendarCommand {
    Navigate(Navigation, mpsc::Sender<PatternResult<ViewState>>),
    ChangeView(ViewMode, mpsc::Sender<PatternResult<ViewState>>),
    FetchEvents(NaiveDate, NaiveDate, Option<String>, mpsc::Sender<PatternResult<Vec<EventRecord>>>),
    Search(String),
    SetCategory(String, bool, mpsc::Sender<PatternResult<Vec<EventRecord>>>),
    UpdateDocument(Arc<Element>, mpsc::Sender<PatternResult<()>>),
    ChangeTimezone(Option<String>, mpsc::Sender<PatternResult<ViewState>>),
    DayClick(NaiveDate, mpsc::Sender<PatternResult<Option<TooltipRequest>>>),
    Snapshot(mpsc::Sender<PatternResult<CalendarSnapshot>>),
    Refetch,
    Destroy,
}

/// Handle for communicating with the calendar actor
#[derive(Clone)]
pub struct CalendarActorHandle {
    command_tx: mpsc::Sender<CalendarCommand>,
}

impl CalendarActorHandle {
    async fn request<T>(
        &self,
        make: impl FnOnce(mpsc::Sender<PatternResult<T>>) -> CalendarCommand,
    ) -> PatternResult<T> {
        let (response_tx, mut response_rx) = mpsc::channel(1);
        self.command_tx
            .send(make(response_tx))
            .await
            .map_err(|_| calendar_error("Calendar has been destroyed"))?;

        response_rx
            .recv()
            .await
            .ok_or_else(|| calendar_error("Response channel closed"))?
    }

    pub async fn navigate(&self, navigation: Navigation) -> PatternResult<ViewState> {
        self.request(|tx| CalendarCommand::Navigate(navigation, tx)).await
    }

    pub async fn change_view(&self, view: ViewMode) -> PatternResult<ViewState> {
        self.request(|tx| CalendarCommand::ChangeView(view, tx)).await
    }

    pub async fn fetch_events(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        timezone: Option<String>,
    ) -> PatternResult<Vec<EventRecord>> {
        self.request(|tx| CalendarCommand::FetchEvents(start, end, timezone, tx))
            .await
    }

    pub async fn search(&self, text: String) -> PatternResult<()> {
        self.command_tx
            .send(CalendarCommand::Search(text))
            .await
            .map_err(|_| calendar_error("Calendar has been destroyed"))
    }

    pub async fn set_category(&self, category: String, active: bool) -> PatternResult<Vec<EventRecord>> {
        self.request(|tx| CalendarCommand::SetCategory(category, active, tx))
            .await
    }

    pub async fn update_document(&self, document: Arc<Element>) -> PatternResult<()> {
        self.request(|tx| CalendarCommand::UpdateDocument(document, tx))
            .await
    }

    pub async fn change_timezone(&self, timezone: Option<String>) -> PatternResult<ViewState> {
        self.request(|tx| CalendarCommand::ChangeTimezone(timezone, tx))
            .await
    }

    pub async fn day_click(&self, date: NaiveDate) -> PatternResult<Option<TooltipRequest>> {
        self.request(|tx| CalendarCommand::DayClick(date, tx)).await
    }

    pub async fn snapshot(&self) -> PatternResult<CalendarSnapshot> {
        self.request(CalendarCommand::Snapshot).await
    }

    /// Destroy the calendar; later commands fail
    pub async fn destroy(&self) -> PatternResult<()> {
        self.command_tx
            .send(CalendarCommand::Destroy)
            .await
            .map_err(|_| calendar_error("Calendar has been destroyed"))?;
        self.command_tx.closed().await;
        Ok(())
    }
}

impl CalendarActor {
    /// Create a new actor and return its handle
    pub fn new(
        config: Arc<RwLock<Config>>,
        storage: &Storage,
        document: Arc<Element>,
        calendar: Element,
        renderer: Box<dyn CalendarRenderer>,
    ) -> (Self, CalendarActorHandle) {
        let (command_tx, command_rx) = mpsc::channel(32);

        let id = calendar.id().unwrap_or_default().to_string();
        let position = calendar_elements(&document)
            .iter()
            .position(|element| **element == calendar)
            .unwrap_or_default();
        let options = CalendarOptions::parse(calendar.attr(OPTIONS_ATTRIBUTE), calendar.attr(TOOLTIP_ATTRIBUTE));
        let view_store = ViewStateStore::new(storage.scoped(options.store, &format!("{}{}", PATTERN_NAME, id)));

        let actor = Self {
            config,
            document,
            calendar,
            id,
            position,
            options,
            view_store,
            renderer,
            filter_state: FilterState::default(),
            timezone: None,
            lifecycle: Lifecycle::Init,
            debouncer: None,
            command_rx,
            refetch_tx: command_tx.downgrade(),
        };

        let handle = CalendarActorHandle { command_tx };

        (actor, handle)
    }

    /// Start the actor's processing loop
    pub async fn run(&mut self) {
        let (query, default_timezone, debounce) = {
            let config = self.config.read().await;
            (
                config
                    .query
                    .as_deref()
                    .map(QueryParams::parse)
                    .filter(|query| !query.is_empty()),
                config.timezone.clone(),
                config.debounce(),
            )
        };
        self.debouncer = Some(Debouncer::new(debounce));

        let control_root = self.control_root(self.options.calendar_controls.as_deref());
        let timezone = selected_timezone(&control_root)
            .or(default_timezone)
            .as_deref()
            .and_then(parse_timezone);
        let category_root = self.control_root(self.options.category_controls.as_deref());
        self.filter_state = read_filter_state(&self.calendar, &category_root);
        self.init(query.as_ref(), timezone, self.options.ignore_url);
        info!("Calendar '{}' ready", self.id);

        while let Some(cmd) = self.command_rx.recv().await {
            match cmd {
                CalendarCommand::Navigate(navigation, response_tx) => {
                    match navigation {
                        Navigation::Next => self.renderer.next(),
                        Navigation::Prev => self.renderer.prev(),
                        Navigation::Today => self.renderer.today(),
                    }
                    let _ = response_tx.send(Ok(self.view_changed())).await;
                }
                CalendarCommand::ChangeView(view, response_tx) => {
                    self.renderer.change_view(view);
                    let _ = response_tx.send(Ok(self.view_changed())).await;
                }
                CalendarCommand::FetchEvents(start, end, timezone, response_tx) => {
                    let timezone = timezone.as_deref().and_then(parse_timezone);
                    let _ = response_tx.send(Ok(self.events(start, end, timezone))).await;
                }
                CalendarCommand::Search(text) => {
                    self.filter_state.search_text = Some(text).filter(|t| !t.is_empty());
                    self.schedule_refetch();
                }
                CalendarCommand::SetCategory(category, active, response_tx) => {
                    self.filter_state.set_category(&category, active);
                    self.refetch();
                    let _ = response_tx.send(Ok(self.renderer.events().to_vec())).await;
                }
                CalendarCommand::UpdateDocument(document, response_tx) => {
                    let result = self.update_document(document);
                    let _ = response_tx.send(result).await;
                }
                CalendarCommand::ChangeTimezone(timezone, response_tx) => {
                    self.teardown();
                    let timezone = timezone.as_deref().and_then(parse_timezone);
                    self.init(None, timezone, true);
                    let _ = response_tx.send(Ok(self.view_state())).await;
                }
                CalendarCommand::DayClick(date, response_tx) => {
                    let request = self
                        .options
                        .tooltip
                        .as_deref()
                        .and_then(|tooltip| tooltip_request(tooltip, date));
                    let _ = response_tx.send(Ok(request)).await;
                }
                CalendarCommand::Snapshot(response_tx) => {
                    let _ = response_tx.send(Ok(self.snapshot())).await;
                }
                CalendarCommand::Refetch => {
                    self.refetch();
                }
                CalendarCommand::Destroy => {
                    info!("Calendar '{}' shutting down", self.id);
                    self.teardown();
                    self.lifecycle = Lifecycle::Destroyed;
                    self.command_rx.close();
                    break;
                }
            }
        }

        info!("Calendar '{}' destroyed", self.id);
    }

    /// Resolve the starting position and render. Filters are kept as they are.
    fn init(&mut self, query: Option<&QueryParams>, timezone: Option<Tz>, ignore_url: bool) {
        let defaults = ViewState {
            date: self.options.start_date,
            view: self.options.default_view,
        };
        let state = self.view_store.resolve(defaults, query, ignore_url);
        self.timezone = timezone;

        let date = state.date.unwrap_or_else(|| Local::now().date_naive());
        self.renderer.render(RenderOptions::new(&self.options, date, state.view, self.timezone));
        self.refetch();
        self.lifecycle = Lifecycle::Ready;
    }

    fn teardown(&mut self) {
        if let Some(debouncer) = self.debouncer.as_mut() {
            debouncer.cancel();
        }
        self.renderer.destroy();
    }

    /// Element matched by a configured selector, or the calendar itself
    fn control_root(&self, selector: Option<&str>) -> Element {
        let Some(selector) = selector else {
            return self.calendar.clone();
        };
        match Selector::parse(selector) {
            Ok(parsed) => match self.document.select_first(&parsed) {
                Some(element) => element.clone(),
                None => {
                    warn!("No element for controls selector '{}'", selector);
                    Element::default()
                }
            },
            Err(e) => {
                warn!("Invalid controls selector '{}': {}", selector, e);
                Element::default()
            }
        }
    }

    fn view_state(&self) -> ViewState {
        ViewState {
            date: Some(self.renderer.date()),
            view: self.renderer.view(),
        }
    }

    /// Store the new position after a navigation and load its events
    fn view_changed(&mut self) -> ViewState {
        let state = self.view_state();
        self.view_store.persist(&state);
        self.refetch();
        debug!("Calendar '{}' moved to {:?} ({})", self.id, state, self.renderer.title());
        state
    }

    /// Events for the dates `[start, end)`: extracted, filtered and cut to
    /// the window.
    fn events(&self, start: NaiveDate, end: NaiveDate, timezone: Option<Tz>) -> Vec<EventRecord> {
        let records = EventExtractor::new(timezone).extract_from(&self.calendar);
        let filtered = EventFilter::new(&self.filter_state).apply(&records);

        match (start_of_day(start, timezone), start_of_day(end, timezone)) {
            (Some(from), Some(to)) => filtered
                .into_iter()
                .filter(|record| record.overlaps(from, to))
                .collect(),
            _ => filtered,
        }
    }

    fn refetch(&mut self) {
        let (start, end) = self.renderer.visible_range();
        let events = self.events(start, end, self.timezone);
        debug!("Calendar '{}' showing {} events", self.id, events.len());
        self.renderer.set_events(events);
    }

    fn schedule_refetch(&mut self) {
        let Some(debouncer) = self.debouncer.as_mut() else {
            self.refetch();
            return;
        };
        let refetch_tx = self.refetch_tx.clone();
        debouncer.schedule(async move {
            if let Some(tx) = refetch_tx.upgrade() {
                let _ = tx.send(CalendarCommand::Refetch).await;
            }
        });
    }

    fn update_document(&mut self, document: Arc<Element>) -> PatternResult<()> {
        let calendars = calendar_elements(&document);
        let calendar = if self.id.is_empty() {
            calendars.get(self.position)
        } else {
            calendars
                .iter()
                .find(|element| element.id() == Some(self.id.as_str()))
        }
        .map(|element| (*element).clone())
        .ok_or_else(|| calendar_error(&format!("Calendar '{}' is no longer in the document", self.id)))?;

        self.document = document;
        self.calendar = calendar;
        let category_root = self.control_root(self.options.category_controls.as_deref());
        self.filter_state = read_filter_state(&self.calendar, &category_root);
        self.refetch();
        Ok(())
    }

    fn snapshot(&self) -> CalendarSnapshot {
        CalendarSnapshot {
            id: self.id.clone(),
            lifecycle: self.lifecycle,
            view_state: self.view_state(),
            title: self.renderer.title(),
            timezone: self.timezone.map(|tz| tz.name().to_string()),
            events: self.renderer.events().to_vec(),
        }
    }
}

/// Every calendar element of `document` in document order, the root included
fn calendar_elements(document: &Element) -> Vec<&Element> {
    let selector = Selector::class(CALENDAR_CLASS);
    let mut elements = document.select(&selector);
    if selector.matches(document, &[]) {
        elements.insert(0, document);
    }
    elements
}

/// Value of the `select.timezone` control: the selected option, else the
/// select's own `value`.
fn selected_timezone(control_root: &Element) -> Option<String> {
    let select = control_root.select_first(&Compound::tag("select").with_class("timezone").into())?;
    let selected: Selector = Compound::tag("option").with_attr("selected", None).into();
    select
        .select_first(&selected)
        .map(|option| option.attr("value").map(str::to_string).unwrap_or_else(|| option.text().trim().to_string()))
        .or_else(|| select.attr("value").map(str::to_string))
        .filter(|value| !value.is_empty())
}
