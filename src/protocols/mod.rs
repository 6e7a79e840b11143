// SPDX-License-Identifier: GPL-3.0-only
//! Display brightness control protocols
//!
//! This module contains implementations for various display control protocols.
//! Each protocol talks to the display in its own native scale and exposes a
//! uniform 0-100 percent contract through [`DisplayProtocol`].

pub mod backlight;

#[cfg(feature = "ddc-ci")]
pub mod ddc_ci;

use anyhow::Result;

/// Brightness on the public 0-100 scale
pub type Percent = u16;

/// Common trait for all display control protocols
pub trait DisplayProtocol: std::fmt::Debug {
    /// Get the unique identifier for this display
    fn id(&self) -> String;

    /// Short tag naming the control mechanism, used to group log output
    fn source(&self) -> &'static str;

    /// Get the human-readable name of this display
    fn name(&self) -> String;

    /// Get the current brightness (0-100)
    fn get_brightness(&mut self) -> Result<Percent>;

    /// Set the brightness (0-100)
    fn set_brightness(&mut self, value: Percent) -> Result<()>;
}

/// Map a percentage onto a native `[min, max]` scale.
///
/// A degenerate range (`max <= min`) maps everything to `min`.
pub fn percent_to_native(percent: Percent, min: u32, max: u32) -> u32 {
    if max <= min {
        return min;
    }

    let fraction = f64::from(percent) / 100.0;
    let step = (fraction * f64::from(max - min)).round();
    let value = f64::from(min) + step;

    value.clamp(f64::from(min), f64::from(max)) as u32
}

/// Map a native value back to a percentage, clamped to 0-100.
///
/// A degenerate range (`max <= min`) maps to 0.
pub fn native_to_percent(value: u32, min: u32, max: u32) -> Percent {
    if max <= min {
        return 0;
    }

    let fraction = (f64::from(value) - f64::from(min)) / f64::from(max - min);
    (fraction * 100.0).round().clamp(0.0, 100.0) as Percent
}
