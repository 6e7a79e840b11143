// SPDX-License-Identifier: GPL-3.0-only
//! DDC/CI (Display Data Channel Command Interface) protocol implementation
//!
//! DDC/CI is a standard protocol for controlling monitors over I2C bus.
//! It's supported by most modern external monitors via the video cable.
//! Monitors report their own brightness maximum, so values are rescaled to
//! and from percent on every access.

use anyhow::Result;
use ddc_hi::{Ddc, Display};

use super::{DisplayProtocol, Percent, native_to_percent, percent_to_native};

/// VCP (Virtual Control Panel) code for brightness
const BRIGHTNESS_CODE: u8 = 0x10;

/// DDC/CI display implementation
pub struct DdcCiDisplay {
    display: Display,
    /// Position in the enumeration order, fixed for the process lifetime
    index: usize,
}

impl DdcCiDisplay {
    /// Create a new DDC/CI display wrapper
    pub fn new(index: usize, display: Display) -> Self {
        Self { display, index }
    }

    /// Enumerate all DDC/CI displays
    pub fn enumerate() -> Vec<Self> {
        Display::enumerate()
            .into_iter()
            .enumerate()
            .map(|(index, display)| Self::new(index, display))
            .collect()
    }
}

impl DisplayProtocol for DdcCiDisplay {
    fn id(&self) -> String {
        format!("ddc-{}-{}", self.index, self.display.info.id)
    }

    fn source(&self) -> &'static str {
        "DDC/CI"
    }

    fn name(&self) -> String {
        self.display
            .info
            .model_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or("<unknown>")
            .to_string()
    }

    fn get_brightness(&mut self) -> Result<Percent> {
        let value = self.display.handle.get_vcp_feature(BRIGHTNESS_CODE)?;
        Ok(native_to_percent(
            u32::from(value.value()),
            0,
            u32::from(value.maximum()),
        ))
    }

    fn set_brightness(&mut self, value: Percent) -> Result<()> {
        anyhow::ensure!(value <= 100, "brightness {value} is outside 0..100");

        let native = match self.display.handle.get_vcp_feature(BRIGHTNESS_CODE) {
            Ok(current) => percent_to_native(value, 0, u32::from(current.maximum())),
            Err(e) => {
                debug!(display = %self.id(), "Writing raw percent, range unavailable: {e}");
                u32::from(value)
            }
        };

        // percent_to_native never exceeds the u16 maximum it was given
        let native = u16::try_from(native).unwrap_or(u16::MAX);
        self.display
            .handle
            .set_vcp_feature(BRIGHTNESS_CODE, native)?;
        Ok(())
    }
}

impl std::fmt::Debug for DdcCiDisplay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DdcCiDisplay(id: {}, name: {})", self.id(), self.name())
    }
}
