// SPDX-License-Identifier: GPL-3.0-only
//! Kernel backlight class implementation
//!
//! Built-in panels (laptops, all-in-ones) expose their brightness through
//! `/sys/class/backlight/<device>/`. This is the OS-integrated counterpart to
//! DDC/CI: no bus traffic, the kernel driver owns the hardware.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::{DisplayProtocol, Percent, native_to_percent, percent_to_native};

/// Location of backlight devices
pub const DEVICES_PATH: &str = "/sys/class/backlight";

const FILE_MAX_BRIGHTNESS: &str = "max_brightness";

/// Hardware-reported level; some drivers only provide `brightness`
const FILE_ACTUAL_BRIGHTNESS: &str = "actual_brightness";

/// Requested level, read/write
const FILE_BRIGHTNESS: &str = "brightness";

pub struct BacklightDisplay {
    dir: PathBuf,
    device: String,
}

impl BacklightDisplay {
    pub fn new(dir: PathBuf) -> Self {
        let device = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { dir, device }
    }

    /// Enumerate backlight devices under `root`, sorted by device name.
    ///
    /// A missing root (no built-in panel) yields an empty list.
    pub fn enumerate(root: &Path) -> Vec<Self> {
        let entries = match fs::read_dir(root) {
            Ok(entries) => entries,
            Err(e) => {
                debug!(root = %root.display(), "No backlight class: {e}");
                return Vec::new();
            }
        };

        let mut dirs: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.join(FILE_BRIGHTNESS).exists())
            .collect();
        dirs.sort();

        dirs.into_iter().map(Self::new).collect()
    }

    fn read_value(&self, file: &str) -> Result<u32> {
        let path = self.dir.join(file);
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        raw.trim()
            .parse()
            .with_context(|| format!("Unexpected content in {}: {:?}", path.display(), raw.trim()))
    }

    fn max_brightness(&self) -> Result<u32> {
        self.read_value(FILE_MAX_BRIGHTNESS)
    }

    fn current_level(&self) -> Result<u32> {
        self.read_value(FILE_ACTUAL_BRIGHTNESS)
            .or_else(|_| self.read_value(FILE_BRIGHTNESS))
    }
}

impl DisplayProtocol for BacklightDisplay {
    fn id(&self) -> String {
        format!("backlight-{}", self.device)
    }

    fn source(&self) -> &'static str {
        "Backlight"
    }

    fn name(&self) -> String {
        if self.device.is_empty() {
            "<unknown>".to_string()
        } else {
            self.device.clone()
        }
    }

    fn get_brightness(&mut self) -> Result<Percent> {
        let max = self.max_brightness()?;
        let current = self.current_level()?;
        Ok(native_to_percent(current, 0, max))
    }

    fn set_brightness(&mut self, value: Percent) -> Result<()> {
        anyhow::ensure!(value <= 100, "brightness {value} is outside 0..100");

        let native = match self.max_brightness() {
            Ok(max) => percent_to_native(value, 0, max),
            Err(e) => {
                // Without a range the percent is the best guess we have
                debug!(device = %self.device, "Writing raw percent, range unavailable: {e:#}");
                u32::from(value)
            }
        };

        let path = self.dir.join(FILE_BRIGHTNESS);
        fs::write(&path, native.to_string())
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}

impl std::fmt::Debug for BacklightDisplay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BacklightDisplay(id: {}, path: {})", self.id(), self.dir.display())
    }
}
