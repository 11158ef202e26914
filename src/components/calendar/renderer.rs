use chrono::{Duration, Local, NaiveDate, Weekday};
use chrono_tz::Tz;

use super::models::{EventRecord, ViewMode};
use super::options::{CalendarOptions, Height};
use super::time::{format_date, step, visible_range};

/// What the renderer is initialised with
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    pub date: NaiveDate,
    pub view: ViewMode,
    pub timezone: Option<Tz>,
    pub first_day: Weekday,
    pub first_hour: u32,
    pub time_format: String,
    pub title_month: String,
    pub title_week: String,
    pub title_day: String,
    pub column_month: String,
    pub column_week: String,
    pub column_day: String,
    pub height: Height,
    pub editable: bool,
    pub droppable: bool,
}

impl RenderOptions {
    pub fn new(options: &CalendarOptions, date: NaiveDate, view: ViewMode, timezone: Option<Tz>) -> Self {
        Self {
            date,
            view,
            timezone,
            first_day: options.first_day,
            first_hour: options.first_hour,
            time_format: options.time_format.clone(),
            title_month: options.title_month.clone(),
            title_week: options.title_week.clone(),
            title_day: options.title_day.clone(),
            column_month: options.column_month.clone(),
            column_week: options.column_week.clone(),
            column_day: options.column_day.clone(),
            height: options.height,
            editable: true,
            droppable: true,
        }
    }

    fn title_format(&self, view: ViewMode) -> &str {
        if view.is_day() {
            &self.title_day
        } else if view.is_week() {
            &self.title_week
        } else {
            &self.title_month
        }
    }

    fn column_format(&self, view: ViewMode) -> &str {
        if view.is_day() {
            &self.column_day
        } else if view.is_week() {
            &self.column_week
        } else {
            &self.column_month
        }
    }
}

/// The calendar widget the pattern drives. Implementations draw the
/// events they are given; the pattern owns navigation state changes.
pub trait CalendarRenderer: Send + 'static {
    fn render(&mut self, options: RenderOptions);
    fn next(&mut self);
    fn prev(&mut self);
    fn today(&mut self);
    fn change_view(&mut self, view: ViewMode);
    fn date(&self) -> NaiveDate;
    fn view(&self) -> ViewMode;
    fn title(&self) -> String;
    /// Visible dates, end exclusive
    fn visible_range(&self) -> (NaiveDate, NaiveDate);
    fn set_events(&mut self, events: Vec<EventRecord>);
    fn events(&self) -> &[EventRecord];
    fn destroy(&mut self);
}

/// Renderer without output: tracks position, title and events
#[derive(Debug, Clone, Default)]
pub struct HeadlessRenderer {
    options: Option<RenderOptions>,
    date: NaiveDate,
    view: ViewMode,
    today: Option<NaiveDate>,
    events: Vec<EventRecord>,
}

impl HeadlessRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a fixed date as "today"
    pub fn with_today(today: NaiveDate) -> Self {
        Self {
            today: Some(today),
            ..Self::default()
        }
    }

    pub fn is_rendered(&self) -> bool {
        self.options.is_some()
    }

    /// Column headers of the current view. Month views label weekdays,
    /// so only their first week is used.
    pub fn column_headers(&self) -> Vec<String> {
        let Some(options) = &self.options else {
            return Vec::new();
        };
        let format = options.column_format(self.view);
        let (start, end) = self.visible_range();
        let columns = (end - start).num_days().min(7);
        (0..columns)
            .map(|offset| format_date(start + Duration::days(offset), format))
            .collect()
    }

    fn current_day(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }

    fn first_day(&self) -> Weekday {
        self.options
            .as_ref()
            .map_or(Weekday::Sun, |options| options.first_day)
    }
}

impl CalendarRenderer for HeadlessRenderer {
    fn render(&mut self, options: RenderOptions) {
        self.date = options.date;
        self.view = options.view;
        self.options = Some(options);
    }

    fn next(&mut self) {
        self.date = step(self.date, self.view, true);
    }

    fn prev(&mut self) {
        self.date = step(self.date, self.view, false);
    }

    fn today(&mut self) {
        self.date = self.current_day();
    }

    fn change_view(&mut self, view: ViewMode) {
        self.view = view;
    }

    fn date(&self) -> NaiveDate {
        self.date
    }

    fn view(&self) -> ViewMode {
        self.view
    }

    fn title(&self) -> String {
        let Some(options) = &self.options else {
            return String::new();
        };
        let format = options.title_format(self.view);
        if self.view.is_week() {
            let (start, end) = self.visible_range();
            return format!(
                "{} - {}",
                format_date(start, format),
                format_date(end - Duration::days(1), format)
            );
        }
        format_date(self.date, format)
    }

    fn visible_range(&self) -> (NaiveDate, NaiveDate) {
        visible_range(self.date, self.view, self.first_day())
    }

    fn set_events(&mut self, events: Vec<EventRecord>) {
        self.events = events;
    }

    fn events(&self) -> &[EventRecord] {
        &self.events
    }

    fn destroy(&mut self) {
        self.options = None;
        self.events.clear();
    }
}
