mod actor;
pub mod extractor;
pub mod filter;
mod handle;
pub mod links;
pub mod models;
pub mod options;
pub mod query;
pub mod renderer;
pub mod time;
pub mod view_state;

pub use actor::{Navigation, PATTERN_NAME};
pub use extractor::EventExtractor;
pub use filter::EventFilter;
pub use handle::CalendarHandle;
pub use models::{CalendarSnapshot, EventRecord, FilterState, Lifecycle, ViewMode, ViewState};
pub use renderer::{CalendarRenderer, HeadlessRenderer, RenderOptions};
pub use view_state::ViewStateStore;

use crate::error::PatternResult;
use crate::markup::Element;
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{error, info};

use super::PatternContext;

type RendererFactory = Box<dyn Fn() -> Box<dyn CalendarRenderer> + Send + Sync>;

/// The calendar pattern: one actor per `.pat-calendar` element
pub struct CalendarPattern {
    handles: RwLock<Vec<CalendarHandle>>,
    renderer_factory: RendererFactory,
}

impl Default for CalendarPattern {
    fn default() -> Self {
        Self::new()
    }
}

impl CalendarPattern {
    /// Create a calendar pattern drawing with the headless renderer
    pub fn new() -> Self {
        Self::with_renderer(|| Box::new(HeadlessRenderer::new()))
    }

    /// Create a calendar pattern with a custom renderer per instance
    pub fn with_renderer<F>(factory: F) -> Self
    where
        F: Fn() -> Box<dyn CalendarRenderer> + Send + Sync + 'static,
    {
        Self {
            handles: RwLock::new(Vec::new()),
            renderer_factory: Box::new(factory),
        }
    }

    /// Handles of every initialised calendar, in document order
    pub async fn get_handles(&self) -> Vec<CalendarHandle> {
        self.handles.read().await.clone()
    }
}

#[async_trait]
impl super::Pattern for CalendarPattern {
    fn name(&self) -> &'static str {
        PATTERN_NAME
    }

    fn trigger(&self) -> &'static str {
        ".pat-calendar"
    }

    async fn init(&self, element: &Element, context: &PatternContext) -> PatternResult<()> {
        let handle = CalendarHandle::new(
            context.config.clone(),
            &context.storage,
            context.document.clone(),
            element.clone(),
            (self.renderer_factory)(),
        );
        info!("Calendar '{}' initialised", element.id().unwrap_or_default());
        self.handles.write().await.push(handle);
        Ok(())
    }

    async fn shutdown(&self) -> PatternResult<()> {
        let handles = std::mem::take(&mut *self.handles.write().await);
        for handle in handles {
            if let Err(e) = handle.destroy().await {
                error!("Error destroying calendar: {:?}", e);
            }
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
