//! Configuration module for picsync.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.
//! Every section is optional in the file; missing keys take their defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::RemoteId;

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for picsync.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub transform: TransformConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

/// What the engine does when a single file fails to download.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Log, record the error and continue with the next file.
    #[default]
    Skip,
    /// Abort the cycle without advancing the cursor.
    Abort,
}

impl std::fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailurePolicy::Skip => write!(f, "skip"),
            FailurePolicy::Abort => write!(f, "abort"),
        }
    }
}

/// Synchronization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Local directory downloaded images are written to.
    pub download_dir: PathBuf,
    /// Seconds between two cycle triggers.
    pub poll_interval: u64,
    /// Seconds before the first cycle.
    pub initial_delay: u64,
    /// Entries requested per listing page.
    pub page_size: u32,
    /// MIME allow-list for the listing filter.
    pub mime_types: Vec<String>,
    /// Only list files modified since the last successful cycle.
    pub enable_incremental: bool,
    /// Move downloaded files into the dated backup folder.
    pub enable_backup: bool,
    /// Per-file download failure handling.
    pub failure_policy: FailurePolicy,
    /// Persist the sync context across restarts.
    pub persist_cursor: bool,
    /// SQLite database used when `persist_cursor` is on.
    pub state_db: PathBuf,
}

/// Remote store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Container to pull from. The alias `root` is resolved at startup.
    pub root_id: String,
}

/// Resize / convert settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    pub enabled: bool,
    /// Directory the converted PNGs are written to.
    pub convert_dir: PathBuf,
    /// Target width in pixels; height keeps the aspect ratio.
    pub resize_width: u32,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Output format: `text` or `json`.
    pub format: String,
}

/// Authentication / OAuth settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// OAuth client id. Takes precedence over `client_secret_file`.
    pub client_id: Option<String>,
    /// OAuth client secret; Google installed apps ship one.
    pub client_secret: Option<String>,
    /// Path to a downloaded Google `client_secret.json`.
    pub client_secret_file: Option<PathBuf>,
    /// Loopback port for the OAuth redirect.
    pub callback_port: u16,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/picsync/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("picsync")
            .join("config.yaml")
    }

    /// Serialize to YAML, as written by `picsync config init`.
    pub fn to_yaml(&self) -> anyhow::Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

/// Expands a leading `~` to the user's home directory.
///
/// Paths without a leading tilde are returned unchanged.
pub fn expand_tilde(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Default MIME allow-list.
pub const DEFAULT_MIME_TYPES: &[&str] = &["image/jpeg", "image/png"];

impl Default for SyncConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("picsync");
        Self {
            download_dir: default_pictures_dir(),
            poll_interval: 60,
            initial_delay: 1,
            page_size: 10,
            mime_types: DEFAULT_MIME_TYPES.iter().map(|m| m.to_string()).collect(),
            enable_incremental: true,
            enable_backup: true,
            failure_policy: FailurePolicy::Skip,
            persist_cursor: true,
            state_db: data_dir.join("state.db"),
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            root_id: RemoteId::ROOT_ALIAS.to_string(),
        }
    }
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            convert_dir: default_pictures_dir().join("converted"),
            resize_width: 300,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            client_secret_file: None,
            callback_port: 8400,
        }
    }
}

fn default_pictures_dir() -> PathBuf {
    dirs::picture_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join("Pictures")))
        .unwrap_or_else(|| PathBuf::from("~/Pictures"))
        .join("picsync")
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"sync.poll_interval"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Valid values for `logging.format`.
const VALID_LOG_FORMATS: &[&str] = &["text", "json"];

/// Upper bound the Drive API accepts for `pageSize`.
pub const MAX_PAGE_SIZE: u32 = 1000;

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- sync ---
        if self.sync.download_dir.as_os_str().is_empty() {
            errors.push(ValidationError::new("sync.download_dir", "must not be empty"));
        }
        if self.sync.poll_interval == 0 {
            errors.push(ValidationError::new(
                "sync.poll_interval",
                "must be greater than 0",
            ));
        }
        if self.sync.page_size == 0 || self.sync.page_size > MAX_PAGE_SIZE {
            errors.push(ValidationError::new(
                "sync.page_size",
                format!("must be in range 1..={MAX_PAGE_SIZE}"),
            ));
        }
        if self.sync.mime_types.is_empty() {
            errors.push(ValidationError::new("sync.mime_types", "must not be empty"));
        }
        for mime in &self.sync.mime_types {
            if !is_plausible_mime(mime) {
                errors.push(ValidationError::new(
                    "sync.mime_types",
                    format!("invalid MIME type '{mime}'"),
                ));
            }
        }
        if self.sync.persist_cursor && self.sync.state_db.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "sync.state_db",
                "must be set when persist_cursor is enabled",
            ));
        }

        // --- remote ---
        if let Err(e) = RemoteId::new(self.remote.root_id.clone()) {
            errors.push(ValidationError::new("remote.root_id", e.to_string()));
        }

        // --- transform ---
        if self.transform.resize_width == 0 {
            errors.push(ValidationError::new(
                "transform.resize_width",
                "must be greater than 0",
            ));
        }
        if self.transform.enabled && self.transform.convert_dir.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "transform.convert_dir",
                "must be set when transform is enabled",
            ));
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError::new(
                "logging.level",
                format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            ));
        }
        if !VALID_LOG_FORMATS.contains(&self.logging.format.as_str()) {
            errors.push(ValidationError::new(
                "logging.format",
                format!(
                    "invalid format '{}'; valid options: {}",
                    self.logging.format,
                    VALID_LOG_FORMATS.join(", ")
                ),
            ));
        }

        // --- auth ---
        if self.auth.callback_port == 0 {
            errors.push(ValidationError::new(
                "auth.callback_port",
                "must be greater than 0",
            ));
        }
        if matches!(&self.auth.client_id, Some(id) if id.trim().is_empty()) {
            errors.push(ValidationError::new(
                "auth.client_id",
                "must not be empty when set",
            ));
        }

        errors
    }
}

fn is_plausible_mime(mime: &str) -> bool {
    match mime.split_once('/') {
        Some((kind, sub)) => {
            !kind.is_empty() && !sub.is_empty() && !mime.contains(char::is_whitespace)
        }
        None => false,
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use picsync_core::config::ConfigBuilder;
/// use std::path::PathBuf;
///
/// let config = ConfigBuilder::new()
///     .sync_download_dir(PathBuf::from("/srv/pictures"))
///     .sync_poll_interval(300)
///     .logging_level("debug")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- sync ---

    pub fn sync_download_dir(mut self, dir: PathBuf) -> Self {
        self.config.sync.download_dir = dir;
        self
    }

    pub fn sync_poll_interval(mut self, seconds: u64) -> Self {
        self.config.sync.poll_interval = seconds;
        self
    }

    pub fn sync_initial_delay(mut self, seconds: u64) -> Self {
        self.config.sync.initial_delay = seconds;
        self
    }

    pub fn sync_page_size(mut self, size: u32) -> Self {
        self.config.sync.page_size = size;
        self
    }

    pub fn sync_mime_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.sync.mime_types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn sync_enable_incremental(mut self, enabled: bool) -> Self {
        self.config.sync.enable_incremental = enabled;
        self
    }

    pub fn sync_enable_backup(mut self, enabled: bool) -> Self {
        self.config.sync.enable_backup = enabled;
        self
    }

    pub fn sync_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.config.sync.failure_policy = policy;
        self
    }

    pub fn sync_persist_cursor(mut self, persist: bool) -> Self {
        self.config.sync.persist_cursor = persist;
        self
    }

    pub fn sync_state_db(mut self, path: PathBuf) -> Self {
        self.config.sync.state_db = path;
        self
    }

    // --- remote ---

    pub fn remote_root_id(mut self, id: impl Into<String>) -> Self {
        self.config.remote.root_id = id.into();
        self
    }

    // --- transform ---

    pub fn transform_enabled(mut self, enabled: bool) -> Self {
        self.config.transform.enabled = enabled;
        self
    }

    pub fn transform_convert_dir(mut self, dir: PathBuf) -> Self {
        self.config.transform.convert_dir = dir;
        self
    }

    pub fn transform_resize_width(mut self, width: u32) -> Self {
        self.config.transform.resize_width = width;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn logging_format(mut self, format: impl Into<String>) -> Self {
        self.config.logging.format = format.into();
        self
    }

    // --- auth ---

    pub fn auth_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.config.auth.client_id = Some(client_id.into());
        self
    }

    pub fn auth_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.config.auth.client_secret = Some(secret.into());
        self
    }

    pub fn auth_client_secret_file(mut self, path: PathBuf) -> Self {
        self.config.auth.client_secret_file = Some(path);
        self
    }

    pub fn auth_callback_port(mut self, port: u16) -> Self {
        self.config.auth.callback_port = port;
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
