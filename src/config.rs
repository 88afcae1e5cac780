//! Catalog configuration
//!
//! The catalog is described by up to three JSON blobs, normally taken from the
//! process environment, plus a handful of knobs for credential storage and the
//! per-plan connection pools.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;

/// Identifies one of the configuration blobs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogSource {
    Services,
    PreconfiguredPlans,
    CustomPlans,
}

impl CatalogSource {
    /// Environment variable the blob is read from
    pub fn env_var(self) -> &'static str {
        match self {
            CatalogSource::Services => "SERVICES",
            CatalogSource::PreconfiguredPlans => "PRECONFIGURED_PLANS",
            CatalogSource::CustomPlans => "CUSTOM_PLANS",
        }
    }
}

impl fmt::Display for CatalogSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.env_var())
    }
}

/// Raw configuration text for services and plans
#[derive(Debug, Clone, Default)]
pub struct CatalogSources {
    pub services: Option<String>,
    pub preconfigured_plans: Option<String>,
    pub custom_plans: Option<String>,
}

impl CatalogSources {
    /// Read all three blobs from the environment. Empty values count as absent.
    pub fn from_env() -> Self {
        Self {
            services: read_blob(CatalogSource::Services),
            preconfigured_plans: read_blob(CatalogSource::PreconfiguredPlans),
            custom_plans: read_blob(CatalogSource::CustomPlans),
        }
    }

    pub fn with_services(mut self, json: impl Into<String>) -> Self {
        self.services = non_empty(json.into());
        self
    }

    pub fn with_preconfigured_plans(mut self, json: impl Into<String>) -> Self {
        self.preconfigured_plans = non_empty(json.into());
        self
    }

    pub fn with_custom_plans(mut self, json: impl Into<String>) -> Self {
        self.custom_plans = non_empty(json.into());
        self
    }
}

fn read_blob(source: CatalogSource) -> Option<String> {
    std::env::var(source.env_var()).ok().and_then(non_empty)
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Settings for credential storage and plan connection pools
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Directory that receives the per-plan TLS files
    pub credential_dir: PathBuf,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            credential_dir: std::env::var_os("CATALOG_CREDENTIAL_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(std::env::temp_dir),
            max_connections: std::env::var("CATALOG_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse::<u32>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_MAX_CONNECTIONS),
            acquire_timeout: Duration::from_secs(
                std::env::var("CATALOG_ACQUIRE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(DEFAULT_ACQUIRE_TIMEOUT_SECS),
            ),
        }
    }
}

impl CatalogConfig {
    /// Default settings with credentials written under `dir`
    pub fn with_credential_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            credential_dir: dir.into(),
            ..Self::default()
        }
    }
}
