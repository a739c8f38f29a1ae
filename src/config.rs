//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// Minimum number of leading bytes inspected when sniffing content.
pub const MIN_SNIFF_BYTES: usize = 2048;

/// Runtime configuration for the docflow pipeline.
#[derive(Debug, Clone)]
pub struct DocflowConfig {
    /// Path of the libSQL result log database.
    pub db_path: PathBuf,
    /// Maximum attempts for a retried action (including the first).
    pub retry_max_attempts: u32,
    /// Fixed delay between failed attempts.
    pub retry_delay: Duration,
    /// Leading bytes read when a file extension gives no format hint.
    pub sniff_bytes: usize,
    /// Directory that `upload` copies files into.
    pub upload_dir: PathBuf,
    /// Optional directory for daily rolling log files.
    pub log_dir: Option<PathBuf>,
}

impl Default for DocflowConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./data/docflow.db"),
            retry_max_attempts: 3,
            retry_delay: Duration::from_secs(2),
            sniff_bytes: MIN_SNIFF_BYTES,
            upload_dir: PathBuf::from("./uploads"),
            log_dir: None,
        }
    }
}

impl DocflowConfig {
    /// Build configuration from `DOCFLOW_*` environment variables,
    /// falling back to defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let db_path = lookup("DOCFLOW_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.db_path);

        let retry_max_attempts: u32 =
            parse_var(&lookup, "DOCFLOW_RETRY_MAX_ATTEMPTS")?.unwrap_or(defaults.retry_max_attempts);
        if retry_max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                key: "DOCFLOW_RETRY_MAX_ATTEMPTS".into(),
                message: "must be at least 1".into(),
            });
        }

        let retry_delay = parse_var::<u64, _>(&lookup, "DOCFLOW_RETRY_DELAY_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.retry_delay);

        let sniff_bytes: usize =
            parse_var(&lookup, "DOCFLOW_SNIFF_BYTES")?.unwrap_or(defaults.sniff_bytes);
        if sniff_bytes < MIN_SNIFF_BYTES {
            return Err(ConfigError::InvalidValue {
                key: "DOCFLOW_SNIFF_BYTES".into(),
                message: format!("must be at least {MIN_SNIFF_BYTES}"),
            });
        }

        let upload_dir = lookup("DOCFLOW_UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.upload_dir);

        let log_dir = lookup("DOCFLOW_LOG_DIR")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            db_path,
            retry_max_attempts,
            retry_delay,
            sniff_bytes,
            upload_dir,
            log_dir,
        })
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("{raw:?}: {e}"),
            }),
    }
}
