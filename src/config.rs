use crate::error::{config_error, env_error, PatternResult};
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Default delay before a search refetch runs
pub const DEFAULT_DEBOUNCE_MS: u64 = 400;

/// Location of the optional configuration file
pub const CONFIG_FILE: &str = "config/patcal.toml";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the persistent ("local") store
    pub storage_dir: PathBuf,
    /// Delay in milliseconds before a search refetch runs
    pub debounce_ms: u64,
    /// Timezone used when the document has no timezone selector
    pub timezone: Option<String>,
    /// Document to load when none is given on the command line
    pub document: Option<PathBuf>,
    /// Query string (without the leading `?`) the document was opened with
    pub query: Option<String>,
}

/// Values from `config/patcal.toml`; every field is optional
#[derive(Debug, Default, Deserialize)]
struct FileOverrides {
    storage_dir: Option<PathBuf>,
    debounce_ms: Option<u64>,
    timezone: Option<String>,
    document: Option<PathBuf>,
    query: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_dir: default_storage_dir(),
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            timezone: None,
            document: None,
            query: None,
        }
    }
}

fn default_storage_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("patcal")
}

impl Config {
    /// Load configuration from environment and config file
    pub fn load() -> PatternResult<Self> {
        // Load .env file if it exists
        dotenv().ok();

        let mut config = Config::default();

        if let Ok(dir) = env::var("PATCAL_STORAGE_DIR") {
            config.storage_dir = PathBuf::from(dir);
        }

        if let Ok(ms) = env::var("PATCAL_DEBOUNCE_MS") {
            config.debounce_ms = ms
                .parse::<u64>()
                .map_err(|_| env_error("PATCAL_DEBOUNCE_MS"))?;
        }

        config.timezone = env::var("PATCAL_TIMEZONE").ok().filter(|s| !s.is_empty());
        config.document = env::var("PATCAL_DOCUMENT").ok().map(PathBuf::from);
        config.query = env::var("PATCAL_QUERY").ok();

        let path = Path::new(CONFIG_FILE);
        if path.exists() {
            config.apply_file(path)?;
        }

        Ok(config)
    }

    /// Merge values from a TOML file over the current configuration
    pub fn apply_file(&mut self, path: &Path) -> PatternResult<()> {
        let content = fs::read_to_string(path)?;
        let overrides: FileOverrides = toml::from_str(&content)
            .map_err(|e| config_error(&format!("{}: {}", path.display(), e)))?;

        if let Some(dir) = overrides.storage_dir {
            self.storage_dir = dir;
        }
        if let Some(ms) = overrides.debounce_ms {
            self.debounce_ms = ms;
        }
        if overrides.timezone.is_some() {
            self.timezone = overrides.timezone;
        }
        if overrides.document.is_some() {
            self.document = overrides.document;
        }
        if overrides.query.is_some() {
            self.query = overrides.query;
        }

        Ok(())
    }

    /// Debounce delay as a `Duration`
    pub fn debounce(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.debounce_ms)
    }
}
