//! Configuration management for Netwarden.
//!
//! Values are layered: built-in defaults, then an optional YAML file, then
//! environment variables. Environment variables are applied one key at a time
//! and a value that is missing or does not parse leaves the previous layer in
//! place, so a typo in the environment never prevents the service from starting.

use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{NetwardenError, Result};

/// Environment variable holding the per-network request budget per minute.
pub const ENV_LIMIT_PER_MINUTE: &str = "LIMIT_PER_MINUTE";
/// Environment variable holding the cooldown length in minutes.
pub const ENV_COOLDOWN_PERIOD: &str = "COOLDOWN_PERIOD_IN_MINUTES";
/// Environment variable holding the sweep interval in minutes.
pub const ENV_CLEAN_PERIOD: &str = "CLEAN_PERIOD_IN_MINUTES";
/// Environment variable holding the network mask width.
pub const ENV_NETMASK: &str = "NETMASK";
/// Environment variable holding the HTTP listen address.
pub const ENV_LISTEN_ADDR: &str = "LISTEN_ADDR";

const MAX_NETMASK: u8 = 128;

/// Main configuration for the Netwarden service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetwardenConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Admission limits
    #[serde(default)]
    pub limits: LimitsConfig,
}

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

/// Admission limits applied to every client network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Requests per minute granted to each network; also the burst size
    #[serde(default = "default_limit_per_minute")]
    pub limit_per_minute: u32,

    /// How long a network stays rejected after exceeding its budget
    #[serde(default = "default_cooldown_minutes")]
    pub cooldown_minutes: u64,

    /// Interval between eviction sweeps
    #[serde(default = "default_clean_period_minutes")]
    pub clean_period_minutes: u64,

    /// Prefix length used to group client addresses into networks
    #[serde(default = "default_netmask")]
    pub netmask: u8,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            limit_per_minute: default_limit_per_minute(),
            cooldown_minutes: default_cooldown_minutes(),
            clean_period_minutes: default_clean_period_minutes(),
            netmask: default_netmask(),
        }
    }
}

fn default_limit_per_minute() -> u32 {
    100
}

fn default_cooldown_minutes() -> u64 {
    1
}

fn default_clean_period_minutes() -> u64 {
    1
}

fn default_netmask() -> u8 {
    24
}

impl LimitsConfig {
    /// Cooldown as a duration.
    pub fn cooldown_period(&self) -> Duration {
        Duration::from_secs(self.cooldown_minutes.saturating_mul(60))
    }

    /// Sweep interval as a duration.
    pub fn clean_period(&self) -> Duration {
        Duration::from_secs(self.clean_period_minutes.saturating_mul(60))
    }

    fn validate(&self) -> Result<()> {
        if self.limit_per_minute == 0 {
            return Err(NetwardenError::Config(
                "limit_per_minute must be non-zero".to_string(),
            ));
        }
        if self.clean_period_minutes == 0 {
            return Err(NetwardenError::Config(
                "clean_period_minutes must be non-zero".to_string(),
            ));
        }
        if self.netmask > MAX_NETMASK {
            return Err(NetwardenError::Config(format!(
                "netmask must be at most {MAX_NETMASK}, got {}",
                self.netmask
            )));
        }
        Ok(())
    }
}

impl NetwardenConfig {
    /// Load configuration from a file path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading configuration file");

        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: NetwardenConfig = serde_yaml::from_str(yaml)
            .map_err(|e| NetwardenError::Config(e.to_string()))?;
        config.limits.validate()?;
        Ok(config)
    }

    /// Load the full configuration: defaults, the optional file, then the
    /// process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_environment(config::Environment::default())?;
        Ok(config)
    }

    /// Overlay values from an environment source.
    ///
    /// Each key is applied on its own. Missing, unparseable and out-of-range
    /// values are skipped.
    pub fn apply_environment(&mut self, env: config::Environment) -> Result<()> {
        let settings = config::Config::builder()
            .add_source(env)
            .build()
            .map_err(|e| NetwardenError::Config(e.to_string()))?;

        if let Some(limit) = lookup::<u32>(&settings, ENV_LIMIT_PER_MINUTE).filter(|v| *v > 0) {
            self.limits.limit_per_minute = limit;
        }
        if let Some(cooldown) = lookup::<u64>(&settings, ENV_COOLDOWN_PERIOD) {
            self.limits.cooldown_minutes = cooldown;
        }
        if let Some(clean) = lookup::<u64>(&settings, ENV_CLEAN_PERIOD).filter(|v| *v > 0) {
            self.limits.clean_period_minutes = clean;
        }
        if let Some(netmask) = lookup::<u8>(&settings, ENV_NETMASK).filter(|v| *v <= MAX_NETMASK) {
            self.limits.netmask = netmask;
        }
        if let Some(addr) = lookup::<SocketAddr>(&settings, ENV_LISTEN_ADDR) {
            self.server.listen_addr = addr;
        }

        Ok(())
    }
}

/// Read one environment key, ignoring anything that does not parse.
fn lookup<T: FromStr>(settings: &config::Config, var: &str) -> Option<T> {
    let raw = settings.get_string(&var.to_lowercase()).ok()?;
    match raw.parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            debug!(var, value = %raw, "Ignoring unparseable environment value");
            None
        }
    }
}
