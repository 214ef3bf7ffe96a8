//! Configuration file support for the health exporter.
//!
//! Preferences are loaded from `$XDG_CONFIG_HOME/health-exporter/config.toml`.
//! Unrecognized unit values fall back to their defaults instead of failing.

use crate::catalog::{available_metrics, metric_config};
use crate::format::DisplayZone;
use crate::units::{DistanceSpeedUnit, TemperatureUnit, WeightDisplayUnit};
use crate::{Error, MetricKind, Result};
use serde::de::value::StrDeserializer;
use serde::de::{DeserializeOwned, IntoDeserializer};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub units: UnitsConfig,

    #[serde(default)]
    pub export: ExportConfig,

    #[serde(default)]
    pub features: FeaturesConfig,
}

/// Display unit preferences
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct UnitsConfig {
    #[serde(default, deserialize_with = "or_default")]
    pub weight: WeightDisplayUnit,

    #[serde(default, deserialize_with = "or_default")]
    pub temperature: TemperatureUnit,

    #[serde(default, deserialize_with = "or_default")]
    pub distance: DistanceSpeedUnit,
}

/// Which metrics to export and where files go
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ExportConfig {
    #[serde(default = "default_true")]
    pub weight: bool,

    #[serde(default = "default_true")]
    pub steps: bool,

    #[serde(default)]
    pub glucose: bool,

    #[serde(default)]
    pub a1c: bool,

    #[serde(default, deserialize_with = "or_default")]
    pub time_zone: DisplayZone,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            weight: true,
            steps: true,
            glucose: false,
            a1c: false,
            time_zone: DisplayZone::default(),
            output_dir: default_output_dir(),
        }
    }
}

/// Account capabilities
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct FeaturesConfig {
    /// Unlocks metrics that need clinical records access
    #[serde(default)]
    pub paid_account: bool,
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_output_dir() -> PathBuf {
    dirs::document_dir()
        .or_else(dirs::data_local_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("health-exporter")
}

fn or_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let raw = String::deserialize(deserializer)?;
    let de: StrDeserializer<'_, serde::de::value::Error> = raw.as_str().into_deserializer();
    match T::deserialize(de) {
        Ok(value) => Ok(value),
        Err(e) => {
            tracing::warn!("Unrecognized config value {:?} ({}), using default", raw, e);
            Ok(T::default())
        }
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Ok(true),
        "false" | "off" | "no" | "0" => Ok(false),
        _ => Err(Error::Config(format!(
            "{} expects true or false, got {:?}",
            key, value
        ))),
    }
}

impl ExportConfig {
    pub fn is_enabled(&self, kind: MetricKind) -> bool {
        match kind {
            MetricKind::Weight => self.weight,
            MetricKind::Steps => self.steps,
            MetricKind::BloodGlucose => self.glucose,
            MetricKind::HemoglobinA1c => self.a1c,
        }
    }

    pub fn set_enabled(&mut self, kind: MetricKind, enabled: bool) {
        match kind {
            MetricKind::Weight => self.weight = enabled,
            MetricKind::Steps => self.steps = enabled,
            MetricKind::BloodGlucose => self.glucose = enabled,
            MetricKind::HemoglobinA1c => self.a1c = enabled,
        }
    }
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        Self::load_or_default(&Self::default_config_path())
    }

    /// Load configuration from `path`, or defaults when no file exists there
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load_from(path)
        } else {
            tracing::info!("No config file found at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;
        config.enforce_availability();
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("health-exporter")
            .join("config.toml")
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let contents = self.to_toml()?;
        crate::sink::write_atomic(path, contents.as_bytes())?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    /// Render as pretty TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Turn off any enabled metric the account cannot export
    pub fn enforce_availability(&mut self) {
        let paid = self.features.paid_account;
        for kind in MetricKind::EXPORT_ORDER {
            if self.export.is_enabled(kind) && !metric_config(kind).is_available(paid) {
                tracing::info!("{} requires a paid account, disabling its export", kind);
                self.export.set_enabled(kind, false);
            }
        }
    }

    /// Metrics to export, in export order
    pub fn enabled_metrics(&self) -> Vec<MetricKind> {
        available_metrics(self.features.paid_account)
            .into_iter()
            .filter(|&kind| self.export.is_enabled(kind))
            .collect()
    }

    /// Update one setting from a dotted key such as `units.weight`
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let invalid = || Error::Config(format!("Invalid value {:?} for {}", value, key));
        match key {
            "units.weight" => {
                self.units.weight = WeightDisplayUnit::parse(value).ok_or_else(invalid)?
            }
            "units.temperature" => {
                self.units.temperature = TemperatureUnit::parse(value).ok_or_else(invalid)?
            }
            "units.distance" => {
                self.units.distance = DistanceSpeedUnit::parse(value).ok_or_else(invalid)?
            }
            "export.weight" => self.export.weight = parse_bool(key, value)?,
            "export.steps" => self.export.steps = parse_bool(key, value)?,
            "export.glucose" => self.export.glucose = parse_bool(key, value)?,
            "export.a1c" => {
                let enabled = parse_bool(key, value)?;
                let a1c = metric_config(MetricKind::HemoglobinA1c);
                if enabled && !a1c.is_available(self.features.paid_account) {
                    return Err(Error::Config(format!(
                        "{} requires a paid account (set features.paid_account first)",
                        a1c.name
                    )));
                }
                self.export.a1c = enabled;
            }
            "export.time_zone" => {
                self.export.time_zone = match value.trim().to_lowercase().as_str() {
                    "local" => DisplayZone::Local,
                    "utc" => DisplayZone::Utc,
                    _ => return Err(invalid()),
                }
            }
            "export.output_dir" => self.export.output_dir = PathBuf::from(value),
            "features.paid_account" => {
                self.features.paid_account = parse_bool(key, value)?;
                self.enforce_availability();
            }
            _ => return Err(Error::Config(format!("Unknown setting: {}", key))),
        }
        Ok(())
    }
}
