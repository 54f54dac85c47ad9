//! Configuration loading and validation

use anyhow::{bail, Result};
use greenhouse_core::{DeviceConfig, SimulatedSensors, UploadConfig, WateringRequest};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub daemon: DaemonConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub devices: DevicesConfig,
    #[serde(default)]
    pub sensors: SensorsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Bind address for web server
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Directory with the dashboard front end
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
    /// Largest accepted image upload in bytes
    #[serde(default = "default_max_upload")]
    pub max_upload_bytes: usize,
    /// TLS configuration (optional - enables HTTPS when present)
    #[serde(default)]
    pub tls: Option<TlsConfig>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            static_dir: default_static_dir(),
            max_upload_bytes: default_max_upload(),
            tls: None,
        }
    }
}

/// TLS/HTTPS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM format)
    pub cert: String,
    /// Path to private key file (PEM format)
    pub key: String,
}

fn default_bind() -> String {
    "0.0.0.0:5000".to_string()
}

fn default_static_dir() -> String {
    "./web".to_string()
}

fn default_max_upload() -> usize {
    10 * 1024 * 1024
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Simulated analysis latency in milliseconds
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    /// Fixed seed for reproducible results
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_delay_ms(),
            seed: None,
        }
    }
}

fn default_delay_ms() -> u64 {
    2000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevicesConfig {
    /// Duration of a watering started from the dashboard button
    #[serde(default = "default_watering_secs")]
    pub watering_duration_secs: u64,
    /// Sector watered by the dashboard button
    #[serde(default = "default_sector")]
    pub default_sector: u8,
    /// Initial grow light brightness (percent)
    #[serde(default = "default_brightness")]
    pub default_brightness: u8,
}

impl Default for DevicesConfig {
    fn default() -> Self {
        Self {
            watering_duration_secs: default_watering_secs(),
            default_sector: default_sector(),
            default_brightness: default_brightness(),
        }
    }
}

fn default_watering_secs() -> u64 {
    3
}

fn default_sector() -> u8 {
    1
}

fn default_brightness() -> u8 {
    100
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SensorsConfig {
    /// Fixed seed for reproducible readings
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Config {
    /// Reject values the controllers cannot honour
    pub fn validate(&self) -> Result<()> {
        WateringRequest {
            sector: self.devices.default_sector,
            duration_secs: self.devices.watering_duration_secs,
        }
        .validate()?;
        if self.devices.default_brightness > 100 {
            bail!(
                "devices.default_brightness must be 0-100, got {}",
                self.devices.default_brightness
            );
        }
        if self.daemon.max_upload_bytes == 0 {
            bail!("daemon.max_upload_bytes must be greater than zero");
        }
        Ok(())
    }

    /// Convert to UploadConfig
    pub fn to_upload_config(&self) -> UploadConfig {
        UploadConfig {
            analysis_delay: Duration::from_millis(self.analysis.delay_ms),
            seed: self.analysis.seed,
        }
    }

    /// Convert to DeviceConfig
    pub fn to_device_config(&self) -> DeviceConfig {
        DeviceConfig {
            watering_duration: Duration::from_secs(self.devices.watering_duration_secs),
            default_sector: self.devices.default_sector,
            default_brightness: self.devices.default_brightness,
        }
    }
}

impl SensorsConfig {
    pub fn to_simulator(&self) -> SimulatedSensors {
        match self.seed {
            Some(seed) => SimulatedSensors::with_seed(seed),
            None => SimulatedSensors::new(),
        }
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<Config> {
    let config = if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!(path = %path.display(), "Loaded configuration");
        config
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Config::default()
    };

    config.validate()?;
    Ok(config)
}

/// Save default configuration to file
pub fn save_default_config(path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(&Config::default())?;
    std::fs::write(path, content)?;
    info!(path = %path.display(), "Wrote default configuration");
    Ok(())
}
