use patcal::components::store_service::Storage;
use patcal::components::{CalendarPattern, PatternRegistry};
use patcal::config::Config;
use patcal::error::{other_error, Error};
use patcal::markup::parse_document;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Initialize logging with environment-based configuration
pub fn init_logging() -> miette::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| Error::Other(format!("Failed to set up logging: {}", e)))?;

    Ok(())
}

/// Load and initialize the application config
pub async fn load_config() -> miette::Result<Arc<RwLock<Config>>> {
    match Config::load() {
        Ok(config) => Ok(Arc::new(RwLock::new(config))),
        Err(e) => {
            error!("Failed to load configuration: {:?}", e);
            Err(e.into())
        }
    }
}

/// Load the document, initialise its calendars and print their snapshots
/// as JSON.
pub async fn run(config: Arc<RwLock<Config>>, document_arg: Option<String>) -> miette::Result<()> {
    let (path, storage_dir) = {
        let config_read = config.read().await;
        (
            document_arg.map(PathBuf::from).or_else(|| config_read.document.clone()),
            config_read.storage_dir.clone(),
        )
    };
    let path = path.ok_or_else(|| other_error("No document given; pass a path or set PATCAL_DOCUMENT"))?;

    info!("Loading document {}", path.display());
    let markup = tokio::fs::read_to_string(&path).await.map_err(Error::from)?;
    let document = Arc::new(parse_document(&markup)?);

    let mut registry = PatternRegistry::new(Arc::clone(&config), Storage::new(&storage_dir));
    registry.register(CalendarPattern::new());
    let count = registry.scan(Arc::clone(&document)).await?;
    info!("Initialised {} pattern instances", count);

    let mut snapshots = Vec::new();
    if let Some(calendars) = registry
        .get_pattern_by_name(patcal::components::calendar::PATTERN_NAME)
        .and_then(|pattern| pattern.as_any().downcast_ref::<CalendarPattern>())
    {
        for handle in calendars.get_handles().await {
            snapshots.push(handle.snapshot().await?);
        }
    }

    let output = serde_json::to_string_pretty(&snapshots).map_err(Error::from)?;
    println!("{}", output);

    registry.shutdown_all().await?;
    Ok(())
}
