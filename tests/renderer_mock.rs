use chrono::NaiveDate;
use patcal::components::calendar::{
    CalendarPattern, CalendarRenderer, EventRecord, HeadlessRenderer, RenderOptions, ViewMode,
    PATTERN_NAME,
};
use patcal::components::store_service::{MemoryBackend, Storage};
use patcal::components::PatternRegistry;
use patcal::config::Config;
use patcal::markup::parse_document;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::RwLock;

/// Mock renderer that records every call the calendar makes
#[derive(Debug, Clone)]
pub struct MockRenderer {
    inner: HeadlessRenderer,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockRenderer {
    /// Create a new mock renderer writing its calls to `calls`
    pub fn new(calls: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            inner: HeadlessRenderer::with_today(NaiveDate::from_ymd_opt(2024, 3, 14).unwrap()),
            calls,
        }
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

impl CalendarRenderer for MockRenderer {
    fn render(&mut self, options: RenderOptions) {
        self.record(format!("render {} {}", options.view, options.date));
        self.inner.render(options);
    }

    fn next(&mut self) {
        self.record("next".to_string());
        self.inner.next();
    }

    fn prev(&mut self) {
        self.record("prev".to_string());
        self.inner.prev();
    }

    fn today(&mut self) {
        self.record("today".to_string());
        self.inner.today();
    }

    fn change_view(&mut self, view: ViewMode) {
        self.record(format!("change_view {}", view));
        self.inner.change_view(view);
    }

    fn date(&self) -> NaiveDate {
        self.inner.date()
    }

    fn view(&self) -> ViewMode {
        self.inner.view()
    }

    fn title(&self) -> String {
        self.inner.title()
    }

    fn visible_range(&self) -> (NaiveDate, NaiveDate) {
        self.inner.visible_range()
    }

    fn set_events(&mut self, events: Vec<EventRecord>) {
        self.record(format!("set_events {}", events.len()));
        self.inner.set_events(events);
    }

    fn events(&self) -> &[EventRecord] {
        self.inner.events()
    }

    fn destroy(&mut self) {
        self.record("destroy".to_string());
        self.inner.destroy();
    }
}

const DOCUMENT: &str = r#"
<html><body>
  <select class="timezone"><option value="UTC"/><option value="Europe/Helsinki" selected="selected"/></select>
  <div id="first" class="pat-calendar" data-pat-calendar="start-date: 2024-03-01; calendar-controls: body">
    <label class="cal-cat-work"><input type="checkbox" checked="checked"/></label>
    <ul class="cal-events">
      <li class="cal-event cal-cat-work">
        <a href="/events/1"><span class="title">Standup</span>
          <time class="start" datetime="2024-03-04T09:00:00Z"/></a>
      </li>
    </ul>
  </div>
  <div id="second" class="pat-calendar" data-pat-calendar="default-view: agendaDay; start-date: 2024-03-04"/>
</body></html>
"#;

async fn scan(calls: Arc<Mutex<Vec<String>>>) -> PatternRegistry {
    let config = Arc::new(RwLock::new(Config::default()));
    let storage = Storage::with_backends(Arc::new(MemoryBackend::new()), Arc::new(MemoryBackend::new()));
    let mut registry = PatternRegistry::new(config, storage);
    registry.register(CalendarPattern::with_renderer(move || {
        Box::new(MockRenderer::new(Arc::clone(&calls)))
    }));

    let document = Arc::new(parse_document(DOCUMENT).unwrap());
    assert_eq!(registry.scan(document).await.unwrap(), 2);
    registry
}

fn calendars(registry: &PatternRegistry) -> &CalendarPattern {
    registry
        .get_pattern_by_name(PATTERN_NAME)
        .and_then(|pattern| pattern.as_any().downcast_ref::<CalendarPattern>())
        .unwrap()
}

fn take(calls: &Arc<Mutex<Vec<String>>>) -> Vec<String> {
    std::mem::take(&mut *calls.lock().unwrap())
}

#[tokio::test]
async fn test_registry_initialises_every_calendar() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let registry = scan(Arc::clone(&calls)).await;

    let handles = calendars(&registry).get_handles().await;
    assert_eq!(handles.len(), 2);
    let first = handles[0].snapshot().await.unwrap();
    let second = handles[1].snapshot().await.unwrap();
    assert_eq!(first.id, "first");
    assert_eq!(first.timezone.as_deref(), Some("Europe/Helsinki"));
    assert_eq!(first.events.len(), 1);
    assert_eq!(second.view_state.view, ViewMode::AgendaDay);
    assert!(second.events.is_empty());

    let mut recorded = take(&calls);
    recorded.sort();
    assert_eq!(
        recorded,
        vec![
            "render agendaDay 2024-03-04",
            "render month 2024-03-01",
            "set_events 0",
            "set_events 1",
        ]
    );

    registry.shutdown_all().await.unwrap();
    assert_eq!(take(&calls), vec!["destroy", "destroy"]);
    assert!(calendars(&registry).get_handles().await.is_empty());
}

#[tokio::test]
async fn test_timezone_change_rerenders() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let registry = scan(Arc::clone(&calls)).await;
    let first = calendars(&registry).get_handles().await.remove(0);
    first.snapshot().await.unwrap();
    take(&calls);

    first.next().await.unwrap();
    first.change_timezone(None).await.unwrap();

    // No store configured, so the calendar starts over from its defaults
    assert_eq!(
        take(&calls),
        vec!["next", "set_events 0", "destroy", "render month 2024-03-01", "set_events 1"]
    );
    assert_eq!(first.snapshot().await.unwrap().timezone, None);
}

#[tokio::test(start_paused = true)]
async fn test_searches_collapse_into_one_refetch() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let registry = scan(Arc::clone(&calls)).await;
    let first = calendars(&registry).get_handles().await.remove(0);
    first.snapshot().await.unwrap();
    take(&calls);

    for text in ["s", "st", "sta", "stand"] {
        first.search(text).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(take(&calls).is_empty());

    tokio::time::sleep(Duration::from_millis(400)).await;
    first.snapshot().await.unwrap();
    assert_eq!(take(&calls), vec!["set_events 1"]);
}
