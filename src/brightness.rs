// SPDX-License-Identifier: GPL-3.0-only
//! Brightness calculation logic
//!
//! Turns raw ambient-light ADC samples into a display brightness percentage:
//! clamp and normalize, optional inversion, calibration offset, EMA
//! smoothing, gamma remap, scaling into the configured percent window and a
//! hysteresis gate that suppresses small oscillations.
//!
//! Each display owns its own [`BrightnessProcessor`], so smoothing history is
//! never shared between monitors.

use thiserror::Error;

use crate::config::{BrightnessSettings, ProcessingSettings};

/// Raw ADC sample as produced by the sensor
pub type RawReading = i32;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalibrationError {
    /// The display reported a brightness outside 0..=100
    #[error("Current brightness {0}% is outside 0..100")]
    OutOfRange(i32),

    /// Not enough valid sensor samples arrived within the read budget
    #[error("Collected {collected} of {required} calibration samples")]
    InsufficientSamples { collected: u32, required: u32 },
}

/// Outcome of feeding one reading through the processor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvaluationResult {
    /// `false` when the hysteresis gate suppressed the change
    pub should_apply: bool,
    pub target_brightness: i32,
    /// Normalized light level after inversion and calibration offset
    pub normalized: f64,
    /// Smoothed (EMA) value, before gamma
    pub filtered: f64,
}

/// Running filter state, owned by exactly one processor
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterState {
    pub ema_value: Option<f64>,
    pub last_applied_brightness: Option<i32>,
    pub normalized_offset: f64,
    pub has_calibration: bool,
}

#[derive(Debug)]
pub struct BrightnessProcessor {
    processing: ProcessingSettings,
    brightness: BrightnessSettings,
    state: FilterState,
}

/// Round to nearest, ties away from zero
fn round_half_away(value: f64) -> i32 {
    // f64::round already rounds half away from zero
    value.round() as i32
}

impl BrightnessProcessor {
    /// Create a processor with empty filter state.
    ///
    /// Settings are expected to have passed [`crate::config::AppConfig::validate`].
    pub fn new(processing: ProcessingSettings, brightness: BrightnessSettings) -> Self {
        Self {
            processing,
            brightness,
            state: FilterState::default(),
        }
    }

    pub fn state(&self) -> &FilterState {
        &self.state
    }

    /// Clamp, scale to [0, 1] and optionally invert a raw sample
    fn normalize(&self, raw: RawReading) -> f64 {
        let p = &self.processing;
        let clamped = raw.clamp(p.adc_min, p.adc_max);
        let span = f64::from(p.adc_max) - f64::from(p.adc_min);
        let normalized = (f64::from(clamped) - f64::from(p.adc_min)) / span;

        if p.invert { 1.0 - normalized } else { normalized }
    }

    fn apply_gamma(&self, value: f64) -> f64 {
        match self.processing.gamma {
            Some(gamma) => value.powf(gamma),
            None => value,
        }
    }

    /// Feed one raw reading through the pipeline.
    ///
    /// The EMA always advances; only `last_applied_brightness` is held back
    /// when the hysteresis gate suppresses the change.
    pub fn evaluate(&mut self, raw: RawReading) -> EvaluationResult {
        let mut normalized = self.normalize(raw);
        if self.state.has_calibration {
            normalized = (normalized + self.state.normalized_offset).clamp(0.0, 1.0);
        }

        let alpha = self.processing.ema_alpha;
        let ema = match self.state.ema_value {
            None => normalized,
            Some(prev) => alpha * normalized + (1.0 - alpha) * prev,
        };
        self.state.ema_value = Some(ema);

        let effective = self.apply_gamma(ema);

        let BrightnessSettings { min_percent, max_percent } = self.brightness;
        let span = f64::from(max_percent - min_percent);
        let target = round_half_away(f64::from(min_percent) + effective * span)
            .clamp(min_percent, max_percent);

        let suppressed = self.state.last_applied_brightness.is_some_and(|last| {
            (target - last).abs() < self.processing.hysteresis_percent
        });

        if !suppressed {
            self.state.last_applied_brightness = Some(target);
        }

        EvaluationResult {
            should_apply: !suppressed,
            target_brightness: target,
            normalized,
            filtered: ema,
        }
    }

    /// Re-anchor the filter so that `raw` maps onto the display's current
    /// brightness.
    ///
    /// The resulting offset is a one-shot bias in the normalized domain and
    /// is not re-estimated later in the session.
    pub fn calibrate(
        &mut self,
        raw: RawReading,
        current_brightness_percent: i32,
    ) -> Result<(), CalibrationError> {
        if !(0..=100).contains(&current_brightness_percent) {
            return Err(CalibrationError::OutOfRange(current_brightness_percent));
        }

        let BrightnessSettings { min_percent, max_percent } = self.brightness;
        let expected_brightness = current_brightness_percent.clamp(min_percent, max_percent);

        // A zero-width window pins every target to min_percent
        let expected_effective = if max_percent > min_percent {
            (f64::from(expected_brightness - min_percent) / f64::from(max_percent - min_percent))
                .clamp(0.0, 1.0)
        } else {
            0.0
        };

        let expected_pre_gamma = match self.processing.gamma {
            Some(gamma) => expected_effective.powf(1.0 / gamma),
            None => expected_effective,
        };

        let normalized = self.normalize(raw);

        self.state.normalized_offset = expected_pre_gamma - normalized;
        self.state.has_calibration = true;
        self.state.ema_value = Some(expected_pre_gamma);
        self.state.last_applied_brightness = Some(expected_brightness);

        debug!(
            raw,
            current = current_brightness_percent,
            offset = self.state.normalized_offset,
            "Calibrated brightness filter"
        );

        Ok(())
    }
}
