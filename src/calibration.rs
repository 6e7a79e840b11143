// SPDX-License-Identifier: GPL-3.0-only
//! Startup calibration
//!
//! Before the control loop starts, a handful of sensor samples are averaged
//! and every display's processor is anchored to the brightness the display
//! currently has. This keeps the first live update from jumping.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::brightness::{CalibrationError, RawReading};
use crate::config::CalibrationSettings;
use crate::error::{AppError, Result, TransportError};
use crate::monitor::{DisplayIndex, DisplayManager, DisplaySlot};
use crate::protocols::DisplayProtocol;
use crate::sensor::SensorMessage;
use crate::transport::LineSource;

/// Average `sample_count` valid readings, reading at most
/// `max_read_attempts` lines.
///
/// Timeouts, blank lines and malformed lines each use up one attempt.
/// Transport failures are returned as-is; running out of attempts yields
/// [`CalibrationError::InsufficientSamples`].
pub fn collect_samples(
    source: &mut impl LineSource,
    settings: &CalibrationSettings,
    running: &AtomicBool,
) -> Result<RawReading> {
    let mut samples: Vec<RawReading> = Vec::with_capacity(settings.sample_count as usize);

    for attempt in 1..=settings.max_read_attempts {
        if samples.len() >= settings.sample_count as usize || !running.load(Ordering::SeqCst) {
            break;
        }

        let line = match source.next_line() {
            Ok(line) => line,
            Err(TransportError::Timeout) => {
                debug!(attempt, "Calibration read timed out");
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        match SensorMessage::parse(&line) {
            Ok(msg) => samples.push(msg.value),
            Err(e) => debug!(attempt, "Skipping calibration line: {e}"),
        }
    }

    let collected = samples.len() as u32;
    if collected < settings.sample_count {
        return Err(CalibrationError::InsufficientSamples {
            collected,
            required: settings.sample_count,
        }
        .into());
    }

    let sum: i64 = samples.iter().map(|&s| i64::from(s)).sum();
    let mean = (sum as f64 / f64::from(collected)).round();
    Ok(mean as RawReading)
}

/// Calibrate every managed display against the averaged reading.
///
/// Only transport failures are returned; everything else skips calibration
/// for the affected display with a warning.
pub fn calibrate_displays<C: DisplayProtocol>(
    manager: &mut DisplayManager<C>,
    source: &mut impl LineSource,
    settings: &CalibrationSettings,
    running: &AtomicBool,
) -> Result<()> {
    if !settings.enabled {
        info!("Calibration disabled");
        return Ok(());
    }
    if manager.is_empty() {
        return Ok(());
    }

    info!(
        samples = settings.sample_count,
        max_attempts = settings.max_read_attempts,
        "Collecting calibration samples"
    );

    let raw = match collect_samples(source, settings, running) {
        Ok(raw) => raw,
        Err(AppError::Calibration(e)) => {
            warn!("Skipping calibration: {e}");
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    let mut calibrated = 0;
    for (index, slot) in manager.iter_mut() {
        if calibrate_slot(index, slot, raw) {
            calibrated += 1;
        }
    }
    info!(calibrated, displays = manager.count(), "Calibration finished");

    Ok(())
}

/// Anchor one slot's processor to the display's current brightness
fn calibrate_slot<C: DisplayProtocol>(index: DisplayIndex, slot: &mut DisplaySlot<C>, raw: RawReading) -> bool {
    let id = slot.backend.id();
    let current = match slot.backend.get_brightness() {
        Ok(value) => value,
        Err(e) => {
            warn!(display_id = %id, slot = index.0, "Skipping calibration, brightness unreadable: {e:#}");
            return false;
        }
    };

    match slot.processor.calibrate(raw, i32::from(current)) {
        Ok(()) => {
            let offset = slot.processor.state().normalized_offset;
            info!(display_id = %id, slot = index.0, raw, current, offset, "Calibrated");
            true
        }
        Err(e) => {
            warn!(display_id = %id, slot = index.0, "Skipping calibration: {e}");
            false
        }
    }
}
