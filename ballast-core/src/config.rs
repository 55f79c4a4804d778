//! Sync configuration.
//!
//! # Sources
//!
//! ```text
//! ~/.ballast/config.yaml   (optional; or an explicit --config path)
//! BALLAST_* env vars       (override individual file settings)
//! ```
//!
//! # API pattern
//!
//! As with the rest of the workspace, loading has two forms:
//! - `load_at(home, explicit, env)`: explicit home and env lookup; used in tests
//! - `load(explicit)`: derives home from `dirs::home_dir()` and reads the
//!   process environment, delegates to `load_at`

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{io_err, ConfigError};

pub const DEFAULT_ROOT: &str = "knowledge_store";
pub const DEFAULT_PREFIX: &str = "knowledge_store";
pub const DEFAULT_REGION: &str = "auto";
pub const DEFAULT_MIN_FLUSH_INTERVAL: Duration = Duration::from_secs(30);
/// Non-forced flushes are never allowed closer together than this.
pub const MIN_FLUSH_INTERVAL_FLOOR: Duration = Duration::from_secs(5);
pub const DEFAULT_FLUSH_EVERY: Duration = Duration::from_secs(30);
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// Remote provider selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Provider {
    /// No remote configured; every sync operation is a no-op.
    #[default]
    Disabled,
    /// S3-compatible object store (Cloudflare R2, AWS S3, MinIO, ...).
    S3,
    /// Objects stored as files under a local or mounted directory.
    Directory,
}

impl FromStr for Provider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" | "local" => Ok(Self::Disabled),
            "r2" | "cloudflare" | "cloudflare-r2" | "s3" => Ok(Self::S3),
            "dir" | "directory" => Ok(Self::Directory),
            other => Err(ConfigError::UnsupportedProvider(other.to_string())),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Disabled => write!(f, "none"),
            Provider::S3 => write!(f, "s3"),
            Provider::Directory => write!(f, "dir"),
        }
    }
}

// ---------------------------------------------------------------------------
// File model
// ---------------------------------------------------------------------------

/// On-disk YAML shape. Every field is optional; env vars fill the gaps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub root: Option<PathBuf>,
    pub provider: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub bucket: Option<String>,
    pub endpoint_url: Option<String>,
    pub account_id: Option<String>,
    pub region: Option<String>,
    pub prefix: Option<String>,
    pub directory: Option<PathBuf>,
    pub min_flush_interval_secs: Option<f64>,
    pub flush_every_secs: Option<f64>,
    pub shutdown_timeout_secs: Option<f64>,
}

impl ConfigFile {
    /// Overlay `BALLAST_*` variables from `env` on top of the file values.
    pub fn apply_env(
        mut self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let text = |name: &str| env(name).filter(|v| !v.trim().is_empty());

        if let Some(v) = text("BALLAST_ROOT") {
            self.root = Some(PathBuf::from(v));
        }
        if let Some(v) = env("BALLAST_PROVIDER") {
            self.provider = Some(v);
        }
        if let Some(v) = text("BALLAST_ACCESS_KEY_ID") {
            self.access_key_id = Some(v);
        }
        if let Some(v) = text("BALLAST_SECRET_ACCESS_KEY") {
            self.secret_access_key = Some(v);
        }
        if let Some(v) = text("BALLAST_BUCKET") {
            self.bucket = Some(v);
        }
        if let Some(v) = text("BALLAST_ENDPOINT_URL") {
            self.endpoint_url = Some(v);
        }
        if let Some(v) = text("BALLAST_ACCOUNT_ID") {
            self.account_id = Some(v);
        }
        if let Some(v) = text("BALLAST_REGION") {
            self.region = Some(v);
        }
        if let Some(v) = text("BALLAST_PREFIX") {
            self.prefix = Some(v);
        }
        if let Some(v) = text("BALLAST_DIRECTORY") {
            self.directory = Some(PathBuf::from(v));
        }
        if let Some(v) = text("BALLAST_MIN_FLUSH_INTERVAL") {
            self.min_flush_interval_secs = Some(parse_seconds("min_flush_interval_secs", &v)?);
        }
        if let Some(v) = text("BALLAST_FLUSH_EVERY") {
            self.flush_every_secs = Some(parse_seconds("flush_every_secs", &v)?);
        }
        if let Some(v) = text("BALLAST_SHUTDOWN_TIMEOUT") {
            self.shutdown_timeout_secs = Some(parse_seconds("shutdown_timeout_secs", &v)?);
        }
        Ok(self)
    }
}

// ---------------------------------------------------------------------------
// Resolved model
// ---------------------------------------------------------------------------

/// Connection settings for an S3-compatible store.
#[derive(Clone, PartialEq, Eq)]
pub struct S3Settings {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket: String,
    pub endpoint_url: String,
    pub region: String,
}

impl fmt::Debug for S3Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Settings")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("bucket", &self.bucket)
            .field("endpoint_url", &self.endpoint_url)
            .field("region", &self.region)
            .finish()
    }
}

/// Which remote, if any, the local tree is mirrored to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteConfig {
    Disabled,
    S3(S3Settings),
    Directory { path: PathBuf },
}

impl RemoteConfig {
    pub fn provider(&self) -> Provider {
        match self {
            RemoteConfig::Disabled => Provider::Disabled,
            RemoteConfig::S3(_) => Provider::S3,
            RemoteConfig::Directory { .. } => Provider::Directory,
        }
    }
}

/// Fully validated configuration for one synchronized tree.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    /// Local directory mirrored to the remote.
    pub root: PathBuf,
    pub remote: RemoteConfig,
    /// Object-key namespace; never empty, no surrounding `/`.
    pub prefix: String,
    pub min_flush_interval: Duration,
    /// Daemon cadence for non-forced flushes.
    pub flush_every: Duration,
    /// Deadline for the final flush at daemon shutdown.
    pub shutdown_timeout: Duration,
}

impl SyncConfig {
    /// Configuration with sync disabled, rooted at `root`.
    pub fn disabled(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            remote: RemoteConfig::Disabled,
            prefix: DEFAULT_PREFIX.to_string(),
            min_flush_interval: DEFAULT_MIN_FLUSH_INTERVAL,
            flush_every: DEFAULT_FLUSH_EVERY,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }

    /// Validate a (file + env) model into a usable configuration.
    pub fn from_file(file: ConfigFile) -> Result<Self, ConfigError> {
        let provider = file
            .provider
            .as_deref()
            .map(Provider::from_str)
            .transpose()?
            .unwrap_or_default();

        let remote = match provider {
            Provider::Disabled => RemoteConfig::Disabled,
            Provider::S3 => RemoteConfig::S3(s3_settings(&file)?),
            Provider::Directory => RemoteConfig::Directory {
                path: file.directory.clone().ok_or(ConfigError::MissingSetting {
                    provider: "dir",
                    setting: "directory",
                })?,
            },
        };

        Ok(Self {
            root: file.root.unwrap_or_else(|| PathBuf::from(DEFAULT_ROOT)),
            remote,
            prefix: normalize_prefix(file.prefix.as_deref().unwrap_or(DEFAULT_PREFIX)),
            min_flush_interval: clamp_min_interval(duration_setting(
                "min_flush_interval_secs",
                file.min_flush_interval_secs,
                DEFAULT_MIN_FLUSH_INTERVAL,
            )?),
            flush_every: duration_setting("flush_every_secs", file.flush_every_secs, DEFAULT_FLUSH_EVERY)?,
            shutdown_timeout: duration_setting(
                "shutdown_timeout_secs",
                file.shutdown_timeout_secs,
                DEFAULT_SHUTDOWN_TIMEOUT,
            )?,
        })
    }

    /// Load from `explicit` (must exist) or `<home>/.ballast/config.yaml`
    /// (optional), then overlay `env`.
    pub fn load_at(
        home: &Path,
        explicit: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let file = match explicit {
            Some(path) if !path.exists() => {
                return Err(ConfigError::NotFound {
                    path: path.to_path_buf(),
                })
            }
            Some(path) => read_config_file(path)?,
            None => {
                let path = config_path_at(home);
                if path.exists() {
                    read_config_file(&path)?
                } else {
                    ConfigFile::default()
                }
            }
        };
        Self::from_file(file.apply_env(env)?)
    }

    /// `load_at` convenience wrapper using the real home and environment.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
        Self::load_at(&home, explicit, |name| std::env::var(name).ok())
    }
}

/// `<home>/.ballast/config.yaml`. Pure.
pub fn config_path_at(home: &Path) -> PathBuf {
    home.join(".ballast").join("config.yaml")
}

fn read_config_file(path: &Path) -> Result<ConfigFile, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    if contents.trim().is_empty() {
        return Ok(ConfigFile::default());
    }
    serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn s3_settings(file: &ConfigFile) -> Result<S3Settings, ConfigError> {
    let required = |value: &Option<String>, setting: &'static str| {
        value.clone().ok_or(ConfigError::MissingSetting {
            provider: "s3",
            setting,
        })
    };
    let access_key_id = required(&file.access_key_id, "access_key_id")?;
    let secret_access_key = required(&file.secret_access_key, "secret_access_key")?;
    let bucket = required(&file.bucket, "bucket")?;

    let endpoint_url = match (&file.endpoint_url, &file.account_id) {
        (Some(url), _) => url.clone(),
        (None, Some(account)) => format!("https://{account}.r2.cloudflarestorage.com"),
        (None, None) => {
            return Err(ConfigError::MissingSetting {
                provider: "s3",
                setting: "endpoint_url or account_id",
            })
        }
    };

    Ok(S3Settings {
        access_key_id,
        secret_access_key,
        bucket,
        endpoint_url,
        region: file
            .region
            .clone()
            .unwrap_or_else(|| DEFAULT_REGION.to_string()),
    })
}

/// Strip surrounding `/` and a legacy `.tar.gz` suffix; fall back to the
/// default namespace when nothing is left.
pub fn normalize_prefix(raw: &str) -> String {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_suffix(".tar.gz").unwrap_or(trimmed);
    let trimmed = trimmed.trim_matches('/');
    if trimmed.is_empty() {
        DEFAULT_PREFIX.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Apply the 5 s floor to a configured minimum flush interval.
pub fn clamp_min_interval(interval: Duration) -> Duration {
    interval.max(MIN_FLUSH_INTERVAL_FLOOR)
}

fn parse_seconds(setting: &'static str, raw: &str) -> Result<f64, ConfigError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| ConfigError::InvalidValue {
            setting,
            value: raw.to_string(),
        })
}

fn duration_setting(
    setting: &'static str,
    secs: Option<f64>,
    default: Duration,
) -> Result<Duration, ConfigError> {
    match secs {
        None => Ok(default),
        Some(v) => Duration::try_from_secs_f64(v).map_err(|_| ConfigError::InvalidValue {
            setting,
            value: v.to_string(),
        }),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
