// SPDX-License-Identifier: GPL-3.0-only
//! Application configuration
//!
//! Loaded once at startup from `appsettings.json`. Everything downstream of
//! [`AppConfig::load`] may assume the range rules in [`AppConfig::validate`]
//! hold.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{AppError, Result};

pub const CONFIG_FILE_NAME: &str = "appsettings.json";
pub const CONFIG_DIR_NAME: &str = "ambient-brightness";

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    pub serial: SerialSettings,
    pub processing: ProcessingSettings,
    pub brightness: BrightnessSettings,
    #[serde(default)]
    pub calibration: CalibrationSettings,
    #[serde(default)]
    pub displays: DisplaySettings,
}

/// Serial port the sensor telemetry arrives on
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SerialSettings {
    pub port_name: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// A read that sees no complete line within this window counts as "no data"
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
}

/// How raw ADC samples are turned into a normalized light level
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingSettings {
    pub adc_min: i32,
    pub adc_max: i32,
    /// Flip the scale for sensors whose reading drops as light increases
    #[serde(default)]
    pub invert: bool,
    /// EMA coefficient in (0, 1]; higher reacts faster, lower is smoother
    pub ema_alpha: f64,
    /// Minimum change in percent before a new value is applied
    #[serde(default)]
    pub hysteresis_percent: i32,
    /// Power-law remap applied after smoothing, `None` keeps the curve linear
    #[serde(default)]
    pub gamma: Option<f64>,
}

/// Output brightness bounds in percent
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BrightnessSettings {
    pub min_percent: i32,
    pub max_percent: i32,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationSettings {
    #[serde(default = "default_calibration_enabled")]
    pub enabled: bool,
    /// Valid sensor samples averaged into the calibration reading
    #[serde(default = "default_sample_count")]
    pub sample_count: u32,
    /// Upper bound on reads, timeouts and malformed lines included
    #[serde(default = "default_max_read_attempts")]
    pub max_read_attempts: u32,
}

impl Default for CalibrationSettings {
    fn default() -> Self {
        Self {
            enabled: default_calibration_enabled(),
            sample_count: default_sample_count(),
            max_read_attempts: default_max_read_attempts(),
        }
    }
}

/// How discovered displays are addressed
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum DisplayMode {
    /// One processor and one backend per discovered display
    #[default]
    PerMonitor,
    /// All backends driven as a single target through one processor
    Combined,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DisplaySettings {
    #[serde(default)]
    pub mode: DisplayMode,
    #[serde(default = "default_backlight_root")]
    pub backlight_root: PathBuf,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            mode: DisplayMode::default(),
            backlight_root: default_backlight_root(),
        }
    }
}

fn default_baud_rate() -> u32 {
    115_200
}

fn default_read_timeout_ms() -> u64 {
    1500
}

fn default_calibration_enabled() -> bool {
    true
}

fn default_sample_count() -> u32 {
    5
}

fn default_max_read_attempts() -> u32 {
    20
}

fn default_backlight_root() -> PathBuf {
    PathBuf::from(crate::protocols::backlight::DEVICES_PATH)
}

impl AppConfig {
    /// Pick the config file used when none is given on the command line.
    ///
    /// Prefers `<config dir>/ambient-brightness/appsettings.json` and falls
    /// back to `appsettings.json` in the working directory.
    pub fn resolve_default_path() -> PathBuf {
        if let Some(dir) = dirs::config_dir() {
            let candidate = dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME);
            if candidate.is_file() {
                return candidate;
            }
        }
        PathBuf::from(CONFIG_FILE_NAME)
    }

    /// Read, parse and validate a config file
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| AppError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Self = serde_json::from_str(&raw).map_err(|source| AppError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;

        config.validate()?;
        debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        fn invalid(msg: &str) -> Result<()> {
            Err(AppError::ConfigInvalid(msg.to_string()))
        }

        let serial = &self.serial;
        if serial.port_name.trim().is_empty() {
            return invalid("serial.portName is required");
        }
        if serial.baud_rate == 0 {
            return invalid("serial.baudRate must be greater than 0");
        }
        if serial.read_timeout_ms == 0 {
            return invalid("serial.readTimeoutMs must be greater than 0");
        }

        let processing = &self.processing;
        if processing.adc_max <= processing.adc_min {
            return invalid("processing.adcMax must be greater than processing.adcMin");
        }
        if !(processing.ema_alpha > 0.0 && processing.ema_alpha <= 1.0) {
            return invalid("processing.emaAlpha must be in the range (0, 1]");
        }
        if !(0..=100).contains(&processing.hysteresis_percent) {
            return invalid("processing.hysteresisPercent must be in the range 0..100");
        }
        if let Some(gamma) = processing.gamma {
            if !(gamma > 0.0 && gamma.is_finite()) {
                return invalid("processing.gamma must be greater than 0 when specified");
            }
        }

        let brightness = &self.brightness;
        if !(0..=100).contains(&brightness.min_percent) {
            return invalid("brightness.minPercent must be in the range 0..100");
        }
        if !(0..=100).contains(&brightness.max_percent) {
            return invalid("brightness.maxPercent must be in the range 0..100");
        }
        if brightness.min_percent > brightness.max_percent {
            return invalid("brightness.minPercent cannot be greater than brightness.maxPercent");
        }

        let calibration = &self.calibration;
        if calibration.sample_count == 0 {
            return invalid("calibration.sampleCount must be at least 1");
        }
        if calibration.max_read_attempts < calibration.sample_count {
            return invalid("calibration.maxReadAttempts cannot be less than calibration.sampleCount");
        }

        Ok(())
    }
}
