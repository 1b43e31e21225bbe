//! Configuration management for the PadGrid runtime
//!
//! Loads the YAML configuration file. Read once at startup; the settings UI
//! is an external collaborator and talks to the host, not to this file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::protocol::velocity::{VelocityCurve, DEFAULT_CURVE_FACTOR, MAX_PRESSURE, MIN_PRESSURE};

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub device: DeviceConfig,
    #[serde(default)]
    pub pads: PadConfig,
    /// Periodic lighting/track-state flush interval in milliseconds.
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,
}

/// Device port configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeviceConfig {
    pub input_port: String,
    pub output_port: String,
    /// Disambiguates multiple identical units on one machine.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial: Option<String>,
}

/// Pad sensitivity configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PadConfig {
    #[serde(default = "default_curve_factor")]
    pub curve_factor: f32,
    /// Every strike at maximum velocity; aftertouch off.
    #[serde(default)]
    pub fixed_accent: bool,
    #[serde(default = "default_min_pressure")]
    pub min_pressure: u32,
    #[serde(default = "default_max_pressure")]
    pub max_pressure: u32,
}

impl Default for PadConfig {
    fn default() -> Self {
        Self {
            curve_factor: default_curve_factor(),
            fixed_accent: false,
            min_pressure: default_min_pressure(),
            max_pressure: default_max_pressure(),
        }
    }
}

fn default_flush_interval_ms() -> u64 {
    50
}

fn default_curve_factor() -> f32 {
    DEFAULT_CURVE_FACTOR
}

fn default_min_pressure() -> u32 {
    MIN_PRESSURE
}

fn default_max_pressure() -> u32 {
    MAX_PRESSURE
}

impl AppConfig {
    /// Load configuration from a YAML file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read config file: {}", path))?;
        let config: AppConfig =
            serde_yaml::from_str(&content).context("failed to parse config file")?;
        anyhow::ensure!(
            config.pads.max_pressure > config.pads.min_pressure,
            "pads.max_pressure must exceed pads.min_pressure"
        );
        Ok(config)
    }

    /// Velocity curve from the configured pad sensitivity.
    pub fn velocity_curve(&self) -> VelocityCurve {
        VelocityCurve::new(
            self.pads.min_pressure,
            self.pads.max_pressure,
            self.pads.curve_factor,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
device:
  input_port: "PadGrid"
  output_port: "PadGrid"
"#;

    #[test]
    fn test_minimal_config_gets_defaults() {
        let config: AppConfig = serde_yaml::from_str(MINIMAL).unwrap();
        assert_eq!(config.flush_interval_ms, 50);
        assert_eq!(config.pads.curve_factor, DEFAULT_CURVE_FACTOR);
        assert!(!config.pads.fixed_accent);
        assert_eq!(config.device.serial, None);
    }

    #[test]
    fn test_full_config() {
        let yaml = r#"
device:
  input_port: "PadGrid MkII"
  output_port: "PadGrid MkII"
  serial: "PG2-00417"
pads:
  curve_factor: 0.2
  fixed_accent: true
flush_interval_ms: 25
"#;
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.device.serial.as_deref(), Some("PG2-00417"));
        assert!(config.pads.fixed_accent);
        assert_eq!(config.flush_interval_ms, 25);
        // Unspecified pad fields keep factory values.
        assert_eq!(config.pads.min_pressure, MIN_PRESSURE);
        assert_eq!(config.pads.max_pressure, MAX_PRESSURE);
    }

    #[tokio::test]
    async fn test_load_from_file() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();
        let config = AppConfig::load(file.path().to_str().unwrap()).await.unwrap();
        assert_eq!(config.device.input_port, "PadGrid");
    }

    #[tokio::test]
    async fn test_load_missing_file_errors() {
        assert!(AppConfig::load("/nonexistent/padgrid.yaml").await.is_err());
    }
}
