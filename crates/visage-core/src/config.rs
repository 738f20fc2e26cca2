//! Environment-driven configuration for visage.
//!
//! Every setting has a default in [`crate::defaults`]; environment variables
//! (optionally loaded from a `.env` file by the binary) override them.
//!
//! # Example
//!
//! ```rust,no_run
//! use visage_core::config::VisageConfig;
//!
//! let config = VisageConfig::from_env().expect("invalid configuration");
//! println!("gallery index at {}", config.index_path().display());
//! ```

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use crate::defaults;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {message}")]
    InvalidValue { var: &'static str, message: String },

    #[error("Invalid sync backend: {0}")]
    InvalidBackend(String),

    #[error("Missing configuration for sync backend {backend}: set {var}")]
    MissingSyncSetting {
        backend: SyncBackendKind,
        var: &'static str,
    },

    #[error("Validation error: {0}")]
    Validation(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Which remote blob store mirrors the gallery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncBackendKind {
    /// No remote mirror; the local pair is the only copy.
    #[default]
    None,
    /// A shared directory (NFS mount, synced folder).
    Filesystem,
    /// An HTTP object store addressed as `{base_url}/{key}`.
    Http,
}

impl FromStr for SyncBackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "none" | "off" => Ok(Self::None),
            "fs" | "filesystem" => Ok(Self::Filesystem),
            "http" | "https" => Ok(Self::Http),
            _ => Err(ConfigError::InvalidBackend(s.to_string())),
        }
    }
}

impl fmt::Display for SyncBackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Filesystem => write!(f, "fs"),
            Self::Http => write!(f, "http"),
        }
    }
}

/// Remote sync settings.
#[derive(Debug, Clone, Default)]
pub struct SyncConfig {
    pub backend: SyncBackendKind,
    /// Directory for the filesystem backend.
    pub path: Option<PathBuf>,
    /// Base URL for the HTTP backend.
    pub url: Option<String>,
    /// Bearer token for the HTTP backend.
    pub token: Option<String>,
    /// Remote key of the index blob.
    pub index_key: String,
    /// Remote key of the metadata blob.
    pub metadata_key: String,
    /// Force a remote pull when the last one is older than this.
    pub remote_refresh_interval: Option<Duration>,
}

/// Detection sidecar settings.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::DETECTOR_URL.to_string(),
            timeout: Duration::from_secs(defaults::DETECTOR_TIMEOUT_SECS),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone)]
pub struct VisageConfig {
    pub data_dir: PathBuf,
    pub index_file: String,
    pub metadata_file: String,
    pub threshold: f32,
    pub sync: SyncConfig,
    pub detector: DetectorConfig,
}

impl Default for VisageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(defaults::DATA_DIR),
            index_file: defaults::INDEX_FILE.to_string(),
            metadata_file: defaults::METADATA_FILE.to_string(),
            threshold: defaults::RECOGNITION_THRESHOLD,
            sync: SyncConfig {
                index_key: defaults::INDEX_KEY.to_string(),
                metadata_key: defaults::METADATA_KEY.to_string(),
                ..SyncConfig::default()
            },
            detector: DetectorConfig::default(),
        }
    }
}

impl VisageConfig {
    /// Load configuration from process environment variables.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(dir) = get(defaults::ENV_DATA_DIR) {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(name) = get(defaults::ENV_INDEX_FILE) {
            config.index_file = name;
        }
        if let Some(name) = get(defaults::ENV_METADATA_FILE) {
            config.metadata_file = name;
        }
        if let Some(raw) = get(defaults::ENV_THRESHOLD) {
            config.threshold = parse_var(defaults::ENV_THRESHOLD, &raw)?;
        }

        if let Some(raw) = get(defaults::ENV_SYNC_BACKEND) {
            config.sync.backend = raw.parse()?;
        }
        config.sync.path = get(defaults::ENV_SYNC_PATH).map(PathBuf::from);
        config.sync.url = get(defaults::ENV_SYNC_URL).map(|u| u.trim_end_matches('/').to_string());
        config.sync.token = get(defaults::ENV_SYNC_TOKEN);
        if let Some(key) = get(defaults::ENV_INDEX_KEY) {
            config.sync.index_key = key;
        }
        if let Some(key) = get(defaults::ENV_METADATA_KEY) {
            config.sync.metadata_key = key;
        }
        if let Some(raw) = get(defaults::ENV_REMOTE_REFRESH_SECS) {
            let secs: u64 = parse_var(defaults::ENV_REMOTE_REFRESH_SECS, &raw)?;
            config.sync.remote_refresh_interval = (secs > 0).then(|| Duration::from_secs(secs));
        }

        if let Some(url) = get(defaults::ENV_DETECTOR_URL) {
            config.detector.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(raw) = get(defaults::ENV_DETECTOR_TIMEOUT_SECS) {
            let secs: u64 = parse_var(defaults::ENV_DETECTOR_TIMEOUT_SECS, &raw)?;
            config.detector.timeout = Duration::from_secs(secs);
        }

        config.validate()?;
        debug!(
            subsystem = "config",
            data_dir = %config.data_dir.display(),
            threshold = config.threshold,
            sync_backend = %config.sync.backend,
            detector_url = %config.detector.base_url,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if !self.threshold.is_finite() || self.threshold <= 0.0 {
            return Err(ConfigError::Validation(format!(
                "threshold must be a positive number, got {}",
                self.threshold
            )));
        }
        if self.index_file == self.metadata_file {
            return Err(ConfigError::Validation(
                "index and metadata files must differ".to_string(),
            ));
        }
        if self.sync.index_key == self.sync.metadata_key {
            return Err(ConfigError::Validation(
                "index and metadata sync keys must differ".to_string(),
            ));
        }
        if !self.detector.base_url.starts_with("http://")
            && !self.detector.base_url.starts_with("https://")
        {
            return Err(ConfigError::Validation(format!(
                "detector URL must start with http:// or https://, got: {}",
                self.detector.base_url
            )));
        }
        match self.sync.backend {
            SyncBackendKind::None => {}
            SyncBackendKind::Filesystem if self.sync.path.is_none() => {
                return Err(ConfigError::MissingSyncSetting {
                    backend: SyncBackendKind::Filesystem,
                    var: defaults::ENV_SYNC_PATH,
                });
            }
            SyncBackendKind::Http if self.sync.url.is_none() => {
                return Err(ConfigError::MissingSyncSetting {
                    backend: SyncBackendKind::Http,
                    var: defaults::ENV_SYNC_URL,
                });
            }
            _ => {}
        }
        Ok(())
    }

    pub fn index_path(&self) -> PathBuf {
        self.data_dir.join(&self.index_file)
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.data_dir.join(&self.metadata_file)
    }
}

fn parse_var<T: FromStr>(var: &'static str, raw: &str) -> ConfigResult<T>
where
    T::Err: fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidValue {
            var,
            message: format!("{} ({})", raw, e),
        })
}
