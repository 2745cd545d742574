//! Configuration for the simulator.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use sensorsim_common::{
    DeviceIdentity, HUMIDITY_RANGE, LoggingConfig, TEMPERATURE_RANGE, ValueRange, load_config,
    parse_config,
};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Load(#[from] sensorsim_common::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Complete simulator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatorConfig {
    /// Prometheus exporter settings.
    #[serde(default)]
    pub prometheus: PrometheusConfig,

    /// Reading generation settings.
    #[serde(default)]
    pub simulation: SimulationConfig,

    /// Simulated devices, one generator each.
    #[serde(default = "default_devices")]
    pub devices: Vec<DeviceIdentity>,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Prometheus HTTP endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrometheusConfig {
    /// Address to listen on (default: "0.0.0.0:10000").
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Path for metrics endpoint (default: "/metrics").
    #[serde(default = "default_path")]
    pub path: String,
}

fn default_listen() -> String {
    "0.0.0.0:10000".to_string()
}

fn default_path() -> String {
    "/metrics".to_string()
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            path: default_path(),
        }
    }
}

/// Reading generation settings shared by every device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Sampling interval in milliseconds (default: 2000).
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Base RNG seed. Device `i` is seeded with `seed + i`; OS entropy when unset.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Temperature range in degrees Celsius.
    #[serde(default = "default_temperature")]
    pub temperature: ValueRange,

    /// Relative humidity range in percent.
    #[serde(default = "default_humidity")]
    pub humidity: ValueRange,
}

fn default_interval_ms() -> u64 {
    2000
}

fn default_temperature() -> ValueRange {
    TEMPERATURE_RANGE
}

fn default_humidity() -> ValueRange {
    HUMIDITY_RANGE
}

impl SimulationConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Seed for the generator at position `index` in the device list.
    pub fn seed_for(&self, index: usize) -> Option<u64> {
        self.seed.map(|s| s.wrapping_add(index as u64))
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            seed: None,
            temperature: default_temperature(),
            humidity: default_humidity(),
        }
    }
}

fn default_devices() -> Vec<DeviceIdentity> {
    vec![
        DeviceIdentity::new("Guangdong", "Shenzhen", "Nanshan", "Site1", "DeviceA"),
        DeviceIdentity::new("Guangdong", "Shenzhen", "Nanshan", "Site1", "DeviceB"),
        DeviceIdentity::new("Beijing", "Beijing", "Haidian", "Site2", "DeviceC"),
        DeviceIdentity::new("Shanghai", "Shanghai", "Pudong", "Site3", "DeviceD"),
        DeviceIdentity::new("Shanghai", "Shanghai", "Pudong", "Site3", "DeviceE"),
    ]
}

impl SimulatorConfig {
    /// Load configuration from a JSON5 file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config: SimulatorConfig = load_config(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a JSON5 string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: SimulatorConfig = parse_config(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.simulation.interval_ms == 0 {
            return Err(ConfigError::Validation(
                "interval_ms must be > 0".to_string(),
            ));
        }

        self.simulation
            .temperature
            .validate()
            .map_err(|e| ConfigError::Validation(format!("temperature: {}", e)))?;
        self.simulation
            .humidity
            .validate()
            .map_err(|e| ConfigError::Validation(format!("humidity: {}", e)))?;

        if self
            .prometheus
            .listen
            .parse::<std::net::SocketAddr>()
            .is_err()
        {
            return Err(ConfigError::Validation(format!(
                "Invalid listen address: {}",
                self.prometheus.listen
            )));
        }

        if !self.prometheus.path.starts_with('/') {
            return Err(ConfigError::Validation(
                "Metrics path must start with /".to_string(),
            ));
        }

        Ok(())
    }

    /// Device identities that appear more than once, in first-seen order.
    ///
    /// Duplicates pass validation and share a single series.
    pub fn duplicate_devices(&self) -> Vec<&DeviceIdentity> {
        let mut seen = HashSet::new();
        let mut reported = HashSet::new();
        self.devices
            .iter()
            .filter(|d| !seen.insert(*d) && reported.insert(*d))
            .collect()
    }

    /// Number of distinct series the devices produce.
    pub fn distinct_device_count(&self) -> usize {
        self.devices.iter().collect::<HashSet<_>>().len()
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            prometheus: PrometheusConfig::default(),
            simulation: SimulationConfig::default(),
            devices: default_devices(),
            logging: LoggingConfig::default(),
        }
    }
}
