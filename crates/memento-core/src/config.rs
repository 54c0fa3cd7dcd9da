//! Engine configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use memento_api::NoteClient;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{Error, Result};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration of the note engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Root URL of the note API.
    pub api_base_url: String,
    /// Location of the local database.
    pub database_path: PathBuf,
    /// Timeout applied by the HTTP transport to each request.
    pub request_timeout: Duration,
    /// When set, `load(false)` may serve a cache younger than this.
    pub cache_max_age: Option<Duration>,
}

impl EngineConfig {
    /// Creates a configuration with defaults for everything but the API URL.
    #[must_use]
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self::builder(api_base_url).build()
    }

    /// Creates a configuration builder.
    #[must_use]
    pub fn builder(api_base_url: impl Into<String>) -> EngineConfigBuilder {
        EngineConfigBuilder::new(api_base_url)
    }

    /// Default database location: `<data_dir>/memento/memento.db`.
    #[must_use]
    pub fn default_database_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("memento")
            .join("memento.db")
    }

    /// Build the HTTP client for this configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the API URL is invalid or the client cannot be built.
    pub fn note_client(&self) -> Result<NoteClient> {
        Ok(NoteClient::new(&self.api_base_url)?.with_timeout(self.request_timeout)?)
    }

    /// Load configuration from a JSON file. Missing fields take defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = tokio::fs::read_to_string(path.as_ref()).await?;
        let file: ConfigFile = serde_json::from_str(&contents)?;
        Ok(file.into())
    }

    /// Save configuration to a JSON file, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let contents = serde_json::to_string_pretty(&ConfigFile::from(self))?;
        tokio::fs::write(path, contents).await?;

        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    pub(crate) fn database_path_str(&self) -> Result<&str> {
        self.database_path.to_str().ok_or_else(|| {
            Error::Config(format!(
                "database path is not valid UTF-8: {}",
                self.database_path.display()
            ))
        })
    }
}

/// Builder for [`EngineConfig`].
#[derive(Debug, Clone)]
pub struct EngineConfigBuilder {
    api_base_url: String,
    database_path: Option<PathBuf>,
    request_timeout: Duration,
    cache_max_age: Option<Duration>,
}

impl EngineConfigBuilder {
    /// Creates a new builder for the given API URL.
    #[must_use]
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            database_path: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            cache_max_age: None,
        }
    }

    /// Sets the database location.
    #[must_use]
    pub fn database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = Some(path.into());
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Lets `load(false)` serve a cache younger than `max_age`.
    #[must_use]
    pub const fn cache_max_age(mut self, max_age: Duration) -> Self {
        self.cache_max_age = Some(max_age);
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> EngineConfig {
        EngineConfig {
            api_base_url: self.api_base_url,
            database_path: self
                .database_path
                .unwrap_or_else(EngineConfig::default_database_path),
            request_timeout: self.request_timeout,
            cache_max_age: self.cache_max_age,
        }
    }
}

/// On-disk form, with durations in whole seconds.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    api_base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    database_path: Option<PathBuf>,
    #[serde(default = "default_timeout_secs")]
    request_timeout_secs: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cache_max_age_secs: Option<u64>,
}

const fn default_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT.as_secs()
}

impl From<ConfigFile> for EngineConfig {
    fn from(file: ConfigFile) -> Self {
        let mut builder = Self::builder(file.api_base_url)
            .request_timeout(Duration::from_secs(file.request_timeout_secs));
        if let Some(path) = file.database_path {
            builder = builder.database_path(path);
        }
        if let Some(secs) = file.cache_max_age_secs {
            builder = builder.cache_max_age(Duration::from_secs(secs));
        }
        builder.build()
    }
}

impl From<&EngineConfig> for ConfigFile {
    fn from(config: &EngineConfig) -> Self {
        Self {
            api_base_url: config.api_base_url.clone(),
            database_path: Some(config.database_path.clone()),
            request_timeout_secs: config.request_timeout.as_secs(),
            cache_max_age_secs: config.cache_max_age.map(|age| age.as_secs()),
        }
    }
}
