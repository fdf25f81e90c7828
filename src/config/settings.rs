//! Application settings loaded from config.toml
//!
//! The file describes the HTTP bind address, the quota and feature defaults for
//! each plan tier, and the superadmin account created on first start. Every
//! section is optional; missing plan tiers fall back to [`builtin_plan`].

use crate::entities::PlanTier;
use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Per-tier quota and feature overrides
    #[serde(default)]
    pub plans: Vec<PlanConfig>,
    /// Superadmin account seeded at start-up
    #[serde(default)]
    pub bootstrap: Option<BootstrapConfig>,
}

/// HTTP server settings
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Socket address the API listens on
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
        }
    }
}

fn default_bind_address() -> String {
    "0.0.0.0:8080".to_string()
}

/// Quotas and feature flags granted by a plan tier
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct PlanConfig {
    pub tier: PlanTier,
    pub max_students: i32,
    pub max_courses: i32,
    pub max_staff: i32,
    #[serde(default)]
    pub reports_enabled: bool,
    #[serde(default)]
    pub discounts_enabled: bool,
}

/// Superadmin seeded on first start
#[derive(Debug, Deserialize, Clone)]
pub struct BootstrapConfig {
    pub superadmin_email: String,
    pub superadmin_name: String,
}

/// Quotas used when config.toml does not list a tier.
#[must_use]
pub const fn builtin_plan(tier: PlanTier) -> PlanConfig {
    match tier {
        PlanTier::Free => PlanConfig {
            tier,
            max_students: 20,
            max_courses: 5,
            max_staff: 2,
            reports_enabled: false,
            discounts_enabled: false,
        },
        PlanTier::Basic => PlanConfig {
            tier,
            max_students: 100,
            max_courses: 20,
            max_staff: 5,
            reports_enabled: true,
            discounts_enabled: false,
        },
        PlanTier::Pro => PlanConfig {
            tier,
            max_students: 500,
            max_courses: 100,
            max_staff: 20,
            reports_enabled: true,
            discounts_enabled: true,
        },
        PlanTier::Enterprise => PlanConfig {
            tier,
            max_students: 100_000,
            max_courses: 10_000,
            max_staff: 1_000,
            reports_enabled: true,
            discounts_enabled: true,
        },
    }
}

impl AppConfig {
    /// Limits for `tier`, preferring the configured entry over the built-in one.
    #[must_use]
    pub fn plan(&self, tier: PlanTier) -> PlanConfig {
        self.plans
            .iter()
            .find(|plan| plan.tier == tier)
            .copied()
            .unwrap_or_else(|| builtin_plan(tier))
    }

    /// Applies `BIND_ADDRESS` from the environment, if set.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(address) = std::env::var("BIND_ADDRESS") {
            self.server.bind_address = address;
        }
        self
    }
}

/// Loads configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - Required fields are missing
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;

    parse_config(&contents)
}

/// Parses configuration from TOML text
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads configuration from `CONFIG_PATH` or ./config.toml.
///
/// A missing file is not an error: the service then runs on defaults.
pub fn load_default_config() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config = if Path::new(&path).exists() {
        load_config(&path)?
    } else {
        tracing::warn!(path = %path, "Config file not found, using defaults");
        AppConfig::default()
    };
    Ok(config.with_env_overrides())
}
