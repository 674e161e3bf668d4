//! Repository configuration.
//!
//! Settings come from a JSON file (`RepositoryConfig::load`) or from
//! environment variables layered over the defaults
//! (`RepositoryConfig::from_env`). Either way the result is validated before
//! it is handed back.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{RepositoryError, Result};
use crate::request::{PageRequest, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

/// Largest supported catalog. Identifiers then have at most 7 digits.
pub const MAX_ITEM_COUNT: u32 = 1_000_000;

/// Longest accepted label prefix.
pub const MAX_LABEL_PREFIX_LEN: usize = 64;

pub const ENV_ITEM_COUNT: &str = "ITEMDECK_ITEM_COUNT";
pub const ENV_LABEL_PREFIX: &str = "ITEMDECK_LABEL_PREFIX";
pub const ENV_DEFAULT_PAGE_SIZE: &str = "ITEMDECK_DEFAULT_PAGE_SIZE";
pub const ENV_MAX_PAGE_SIZE: &str = "ITEMDECK_MAX_PAGE_SIZE";
pub const ENV_AUDIT_ENABLED: &str = "ITEMDECK_AUDIT_ENABLED";
pub const ENV_LOG_DIR: &str = "ITEMDECK_LOG_DIR";
pub const ENV_LOG_RETENTION_DAYS: &str = "ITEMDECK_LOG_RETENTION_DAYS";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Number of items `N`; ids are `1..=N`.
    pub item_count: u32,
    /// Items are labelled `"{label_prefix}{id}"`.
    pub label_prefix: String,
    pub default_page_size: usize,
    pub max_page_size: usize,
    pub audit: AuditConfig,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            item_count: MAX_ITEM_COUNT,
            label_prefix: "Item #".to_string(),
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
            audit: AuditConfig::default(),
        }
    }
}

/// Settings of the JSON-lines audit and performance log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    pub enabled: bool,
    pub log_dir: PathBuf,
    /// Entries older than this many days are dropped by pruning.
    pub retention_days: u32,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            log_dir: PathBuf::from("logs"),
            retention_days: 30,
        }
    }
}

impl RepositoryConfig {
    /// Reads and validates a JSON config file. Missing fields take defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|error| {
            RepositoryError::Config(format!("unable to read {}: {error}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&contents).map_err(|error| {
            RepositoryError::Config(format!("invalid config {}: {error}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overlaid with `ITEMDECK_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::default().with_overrides(|name| std::env::var(name).ok())
    }

    /// Overlays values returned by `lookup` (keyed by env var name) and
    /// validates the result.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(value) = parse_var(&lookup, ENV_ITEM_COUNT)? {
            self.item_count = value;
        }
        if let Some(value) = lookup(ENV_LABEL_PREFIX) {
            self.label_prefix = value;
        }
        if let Some(value) = parse_var(&lookup, ENV_DEFAULT_PAGE_SIZE)? {
            self.default_page_size = value;
        }
        if let Some(value) = parse_var(&lookup, ENV_MAX_PAGE_SIZE)? {
            self.max_page_size = value;
        }
        if let Some(value) = parse_var(&lookup, ENV_AUDIT_ENABLED)? {
            self.audit.enabled = value;
        }
        if let Some(value) = lookup(ENV_LOG_DIR).filter(|value| !value.trim().is_empty()) {
            self.audit.log_dir = PathBuf::from(value);
        }
        if let Some(value) = parse_var(&lookup, ENV_LOG_RETENTION_DAYS)? {
            self.audit.retention_days = value;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.item_count == 0 || self.item_count > MAX_ITEM_COUNT {
            return Err(RepositoryError::Config(format!(
                "item_count must be between 1 and {MAX_ITEM_COUNT}, got {}",
                self.item_count
            )));
        }
        if self.label_prefix.len() > MAX_LABEL_PREFIX_LEN {
            return Err(RepositoryError::Config(format!(
                "label_prefix must be at most {MAX_LABEL_PREFIX_LEN} bytes"
            )));
        }
        if self.max_page_size == 0 || self.max_page_size > MAX_PAGE_SIZE {
            return Err(RepositoryError::Config(format!(
                "max_page_size must be between 1 and {MAX_PAGE_SIZE}, got {}",
                self.max_page_size
            )));
        }
        if self.default_page_size == 0 || self.default_page_size > self.max_page_size {
            return Err(RepositoryError::Config(format!(
                "default_page_size must be between 1 and {}, got {}",
                self.max_page_size, self.default_page_size
            )));
        }
        if self.audit.retention_days == 0 {
            return Err(RepositoryError::Config(
                "audit.retention_days must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Validates raw pagination parameters against this config's limits.
    pub fn page_request(&self, page: Option<&str>, page_size: Option<&str>) -> Result<PageRequest> {
        PageRequest::parse(page, page_size, self.default_page_size, self.max_page_size)
    }

    /// Retention window of the audit log.
    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.audit.retention_days))
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<Option<T>> {
    let Some(raw) = lookup(name) else {
        return Ok(None);
    };
    raw.trim()
        .parse()
        .map(Some)
        .map_err(|_| RepositoryError::Config(format!("{name} has an invalid value: {raw:?}")))
}
