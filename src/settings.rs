use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::scale::PhysicalConfig;

pub const DEFAULT_SIZE_RESET_SECS: u64 = 240;
pub const DEFAULT_HIBERNATE_MINUTES: u64 = 120;
pub const DEFAULT_CHANNEL_VALUE: u8 = 255;
pub const DEFAULT_CHARTS_XML: &str = "charts.xml";
pub const DEFAULT_SCRIPTS_DIR: &str = "./scripts";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("'{0}' is not configured")]
    Missing(&'static str),
    #[error("'{key}' must be positive, got {value}")]
    NotPositive { key: &'static str, value: f64 },
}

/// Settings file contents. Everything is optional on disk; see
/// [`UserSettings::apply_defaults`] and [`UserSettings::kiosk_config`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    /// Viewing distance in cm.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phys_distance: Option<f64>,
    /// Visible screen height in mm.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phys_height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screen_height_px: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub red_value: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub green_value: Option<u8>,
    /// Seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_reset_time: Option<u64>,
    /// Minutes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hibernate_time: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub charts_xml: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scripts_dir: Option<String>,
}

impl UserSettings {
    /// Fills in keys that have a default and returns the names it filled.
    pub fn apply_defaults(&mut self) -> Vec<&'static str> {
        let mut filled = Vec::new();

        fn fill<T>(slot: &mut Option<T>, value: T, key: &'static str, filled: &mut Vec<&str>) {
            if slot.is_none() {
                *slot = Some(value);
                filled.push(key);
            }
        }

        fill(&mut self.red_value, DEFAULT_CHANNEL_VALUE, "redValue", &mut filled);
        fill(&mut self.green_value, DEFAULT_CHANNEL_VALUE, "greenValue", &mut filled);
        fill(&mut self.size_reset_time, DEFAULT_SIZE_RESET_SECS, "sizeResetTime", &mut filled);
        fill(&mut self.hibernate_time, DEFAULT_HIBERNATE_MINUTES, "hibernateTime", &mut filled);
        fill(&mut self.charts_xml, DEFAULT_CHARTS_XML.into(), "chartsXml", &mut filled);
        fill(&mut self.scripts_dir, DEFAULT_SCRIPTS_DIR.into(), "scriptsDir", &mut filled);

        filled
    }

    /// Validated snapshot. Geometry has no sensible default and must be
    /// configured with positive values.
    pub fn kiosk_config(&self) -> Result<KioskConfig, ConfigError> {
        let viewing_distance_cm = positive("physDistance", self.phys_distance)?;
        let screen_height_mm = positive("physHeight", self.phys_height)?;
        let screen_height_px = self
            .screen_height_px
            .ok_or(ConfigError::Missing("screenHeightPx"))?;
        if screen_height_px == 0 {
            return Err(ConfigError::NotPositive {
                key: "screenHeightPx",
                value: 0.0,
            });
        }

        Ok(KioskConfig {
            physical: PhysicalConfig {
                viewing_distance_cm,
                screen_height_mm,
                screen_height_px,
                red_channel_value: self.red_value.unwrap_or(DEFAULT_CHANNEL_VALUE),
                green_channel_value: self.green_value.unwrap_or(DEFAULT_CHANNEL_VALUE),
            },
            size_reset_after: Duration::from_secs(
                self.size_reset_time.unwrap_or(DEFAULT_SIZE_RESET_SECS),
            ),
            hibernate_after: Duration::from_secs(
                self.hibernate_time.unwrap_or(DEFAULT_HIBERNATE_MINUTES) * 60,
            ),
            charts_xml: PathBuf::from(self.charts_xml.as_deref().unwrap_or(DEFAULT_CHARTS_XML)),
            scripts_dir: PathBuf::from(
                self.scripts_dir.as_deref().unwrap_or(DEFAULT_SCRIPTS_DIR),
            ),
        })
    }
}

fn positive(key: &'static str, value: Option<f64>) -> Result<f64, ConfigError> {
    match value {
        None => Err(ConfigError::Missing(key)),
        Some(value) if value > 0.0 && value.is_finite() => Ok(value),
        Some(value) => Err(ConfigError::NotPositive { key, value }),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct KioskConfig {
    pub physical: PhysicalConfig,
    pub size_reset_after: Duration,
    pub hibernate_after: Duration,
    pub charts_xml: PathBuf,
    pub scripts_dir: PathBuf,
}

pub struct SettingsStore {
    path: PathBuf,
    data: UserSettings,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = read_settings(&path)?;
        let mut store = Self {
            path,
            data: UserSettings::default(),
        };
        store.replace(data)?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> &UserSettings {
        &self.data
    }

    pub fn kiosk_config(&self) -> Result<KioskConfig, ConfigError> {
        self.data.kiosk_config()
    }

    /// Re-reads the file, e.g. after the preferences were edited. A file
    /// that does not parse is left untouched and the loaded settings stay.
    pub fn reload(&mut self) -> Result<()> {
        let data = read_settings(&self.path)?;
        self.replace(data)
    }

    fn replace(&mut self, mut data: UserSettings) -> Result<()> {
        let filled = data.apply_defaults();
        self.data = data;
        if !filled.is_empty() {
            warn!(
                "Settings {} missing {}, storing defaults",
                self.path.display(),
                filled.join(", ")
            );
            self.persist()?;
        }
        Ok(())
    }

    fn persist(&self) -> Result<()> {
        let serialized = serde_json::to_string_pretty(&self.data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}

fn read_settings(path: &Path) -> Result<UserSettings> {
    if !path.exists() {
        info!("No settings at {}, starting from defaults", path.display());
        return Ok(UserSettings::default());
    }

    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings from {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse settings from {}", path.display()))
}


#[cfg(test)]
pub(crate) use tests::temp_settings_path;
