use crate::components::store_service::Storage;
use crate::config::Config;
use crate::error::PatternResult;
use crate::markup::{Element, Selector};
use async_trait::async_trait;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info};

// Export components
pub mod calendar;
pub mod store_service;

pub use calendar::{CalendarHandle, CalendarPattern};

/// Everything a pattern instance gets at initialisation
#[derive(Clone)]
pub struct PatternContext {
    pub config: Arc<RwLock<Config>>,
    pub storage: Storage,
    pub document: Arc<Element>,
}

/// Pattern trait that all patterns must implement
#[async_trait]
pub trait Pattern: Send + Sync + Any {
    /// Get the name of the pattern
    fn name(&self) -> &'static str;

    /// Selector of the elements the pattern is initialised on
    fn trigger(&self) -> &'static str;

    /// Initialize the pattern on one matching element
    async fn init(&self, element: &Element, context: &PatternContext) -> PatternResult<()>;

    /// Shutdown every instance of the pattern
    async fn shutdown(&self) -> PatternResult<()>;

    /// Convert to Any for downcasting
    fn as_any(&self) -> &dyn Any;
}

/// Registry of all patterns
pub struct PatternRegistry {
    patterns: Vec<Box<dyn Pattern>>,
    config: Arc<RwLock<Config>>,
    storage: Storage,
}

impl fmt::Debug for PatternRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternRegistry")
            .field("pattern_count", &self.patterns.len())
            .field("config", &self.config)
            .field("storage", &self.storage)
            .finish()
    }
}

impl PatternRegistry {
    /// Create a new pattern registry
    pub fn new(config: Arc<RwLock<Config>>, storage: Storage) -> Self {
        Self {
            patterns: Vec::new(),
            config,
            storage,
        }
    }

    /// Register a pattern
    pub fn register<T: Pattern + 'static>(&mut self, pattern: T) {
        info!("Registering pattern: {}", pattern.name());
        self.patterns.push(Box::new(pattern));
    }

    /// Initialize every registered pattern on the elements of `document`
    /// matching its trigger. Returns the number of initialised instances.
    pub async fn scan(&self, document: Arc<Element>) -> PatternResult<usize> {
        let context = PatternContext {
            config: Arc::clone(&self.config),
            storage: self.storage.clone(),
            document: Arc::clone(&document),
        };
        let mut count = 0;

        for pattern in &self.patterns {
            let trigger = Selector::parse(pattern.trigger())?;
            let root = document.as_ref();
            let mut elements = root.select(&trigger);
            if trigger.matches(root, &[]) {
                elements.insert(0, root);
            }

            for element in elements {
                info!("Initializing pattern: {}", pattern.name());

                if let Err(e) = pattern.init(element, &context).await {
                    // Log error but continue with other elements
                    error!("Error initializing pattern {}: {:?}", pattern.name(), e);
                    continue;
                }
                count += 1;
            }
        }

        Ok(count)
    }

    /// Shutdown all patterns
    pub async fn shutdown_all(&self) -> PatternResult<()> {
        info!("Shutting down all patterns");

        for pattern in &self.patterns {
            info!("Shutting down pattern: {}", pattern.name());

            if let Err(e) = pattern.shutdown().await {
                // Log error but continue with other patterns
                error!("Error shutting down pattern {}: {:?}", pattern.name(), e);
            }
        }

        Ok(())
    }

    /// Get a pattern by name
    pub fn get_pattern_by_name(&self, name: &str) -> Option<&dyn Pattern> {
        self.patterns
            .iter()
            .find(|p| p.name() == name)
            .map(|p| p.as_ref())
    }
}
