// SPDX-License-Identifier: GPL-3.0-only
//! Ambient brightness control loop
//!
//! Reads sensor lines, feeds every display's processor and writes the
//! results to the displays whose hysteresis gate opened.
//!
//! - Read timeouts and blank lines: no data this cycle, keep going
//! - Malformed lines: logged and skipped
//! - A failed write on one display: logged, other displays still updated
//! - Transport I/O failure or end of stream: the loop ends with an error
//!
//! Cancellation is cooperative: the `running` flag is checked once per
//! iteration, in-flight backend calls are allowed to finish.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::Result as BackendResult;

use crate::brightness::EvaluationResult;
use crate::error::{Result, TransportError};
use crate::monitor::{DisplayManager, DisplaySlot};
use crate::protocols::{DisplayProtocol, Percent};
use crate::sensor::SensorMessage;
use crate::transport::LineSource;

/// DDC/CI needs at least 40ms between commands
const RETRY_DELAY: Duration = Duration::from_millis(50);

pub struct BrightnessDaemon<S, C> {
    source: S,
    displays: DisplayManager<C>,
    running: Arc<AtomicBool>,
}

impl<S: LineSource, C: DisplayProtocol> BrightnessDaemon<S, C> {
    pub fn new(source: S, displays: DisplayManager<C>, running: Arc<AtomicBool>) -> Self {
        Self {
            source,
            displays,
            running,
        }
    }

    #[cfg(test)]
    pub fn displays(&self) -> &DisplayManager<C> {
        &self.displays
    }

    pub fn run(&mut self) -> Result<()> {
        info!(displays = self.displays.count(), "Starting brightness control loop");

        while self.running.load(Ordering::SeqCst) {
            let line = match self.source.next_line() {
                Ok(line) => line,
                Err(TransportError::Timeout) => continue,
                Err(e) => {
                    error!("Sensor read error: {e}");
                    return Err(e.into());
                }
            };

            self.process_line(&line);
        }

        info!("Stop requested, leaving control loop");
        Ok(())
    }

    /// Handle one sensor line; returns how many displays were updated
    pub fn process_line(&mut self, line: &str) -> usize {
        let msg = match SensorMessage::parse(line) {
            Ok(msg) => msg,
            Err(e) => {
                warn!("Skipping invalid JSON: {e}");
                return 0;
            }
        };

        let mut applied = 0;
        for (index, slot) in self.displays.iter_mut() {
            let result = slot.processor.evaluate(msg.value);
            let id = slot.backend.id();

            if !result.should_apply {
                debug!(
                    display_id = %id,
                    device_id = %msg.device_id,
                    sensor_id = %msg.sensor_id,
                    ts = msg.timestamp,
                    raw = msg.value,
                    normalized = result.normalized,
                    filtered = result.filtered,
                    brightness = result.target_brightness,
                    "Change below hysteresis, not applied"
                );
                continue;
            }

            match apply(slot, &result) {
                Ok(elapsed) => {
                    applied += 1;
                    info!(
                        display_id = %id,
                        slot = index.0,
                        device_id = %msg.device_id,
                        sensor_id = %msg.sensor_id,
                        ts = msg.timestamp,
                        raw = msg.value,
                        normalized = result.normalized,
                        filtered = result.filtered,
                        brightness = result.target_brightness,
                        "Set brightness in {:?}",
                        elapsed
                    );
                }
                Err(e) => {
                    error!(display_id = %id, "Failed to set brightness: {e:#}");
                }
            }
        }
        applied
    }
}

/// Write one result to a display, retrying once after a short pause
fn apply<C: DisplayProtocol>(
    slot: &mut DisplaySlot<C>,
    result: &EvaluationResult,
) -> BackendResult<Duration> {
    let start = Instant::now();
    let value = result.target_brightness.clamp(0, 100) as Percent;

    if let Err(e) = slot.backend.set_brightness(value) {
        debug!(
            display_id = %slot.backend.id(),
            "First attempt failed: {e:#}, waiting {:?} before retry",
            RETRY_DELAY
        );
        std::thread::sleep(RETRY_DELAY);
        slot.backend.set_brightness(value)?;
    }

    Ok(start.elapsed())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brightness::BrightnessProcessor;
    use crate::config::{BrightnessSettings, ProcessingSettings};
    use crate::error::AppError;
    use crate::monitor::{CompositeController, DisplayIndex};
    use crate::protocols::testing::MockDisplay;
    use crate::transport::tests::ScriptedSource;

    fn processor(hysteresis: i32) -> BrightnessProcessor {
        BrightnessProcessor::new(
            ProcessingSettings {
                adc_min: 0,
                adc_max: 100,
                invert: false,
                ema_alpha: 1.0,
                hysteresis_percent: hysteresis,
                gamma: None,
            },
            BrightnessSettings {
                min_percent: 0,
                max_percent: 100,
            },
        )
    }

    fn running() -> Arc<AtomicBool> {
        Arc::new(AtomicBool::new(true))
    }

    #[test]
    fn test_applies_readings_until_stream_ends() {
        let mut manager = DisplayManager::new();
        manager.add(MockDisplay::new("a", 0), processor(0));
        let source = ScriptedSource::new(vec![
            Ok(r#"{"value":20}"#.into()),
            Err(TransportError::Timeout),
            Ok("not json".into()),
            Ok(r#"{"value":70}"#.into()),
        ]);

        let mut daemon = BrightnessDaemon::new(source, manager, running());
        let err = daemon.run().unwrap_err();
        assert!(matches!(err, AppError::TransportFailure(TransportError::Closed)));

        let slot = daemon.displays().get(DisplayIndex(0)).unwrap();
        assert_eq!(slot.backend.writes, [20, 70]);
    }

    #[test]
    fn test_io_error_ends_loop() {
        let manager: DisplayManager<MockDisplay> = DisplayManager::new();
        let source = ScriptedSource::new(vec![Err(TransportError::Io(std::io::Error::other("gone")))]);
        let mut daemon = BrightnessDaemon::new(source, manager, running());
        assert!(matches!(
            daemon.run(),
            Err(AppError::TransportFailure(TransportError::Io(_)))
        ));
    }

    #[test]
    fn test_stop_flag_checked_before_reading() {
        let mut manager = DisplayManager::new();
        manager.add(MockDisplay::new("a", 0), processor(0));
        let flag = Arc::new(AtomicBool::new(false));
        let mut daemon = BrightnessDaemon::new(ScriptedSource::values(&[50]), manager, flag);

        daemon.run().unwrap();
        assert!(daemon.displays().get(DisplayIndex(0)).unwrap().backend.writes.is_empty());
    }

    #[test]
    fn test_hysteresis_skips_write() {
        let mut manager = DisplayManager::new();
        manager.add(MockDisplay::new("a", 0), processor(5));
        let mut daemon = BrightnessDaemon::new(ScriptedSource::values(&[]), manager, running());

        assert_eq!(daemon.process_line(r#"{"value":40}"#), 1);
        assert_eq!(daemon.process_line(r#"{"value":43}"#), 0);
        assert_eq!(daemon.process_line(r#"{"value":46}"#), 1);
        let slot = daemon.displays().get(DisplayIndex(0)).unwrap();
        assert_eq!(slot.backend.writes, [40, 46]);
    }

    #[test]
    fn test_failing_display_does_not_block_others() {
        let mut manager = DisplayManager::new();
        let bad = manager.add(MockDisplay::broken("bad"), processor(0));
        let good = manager.add(MockDisplay::new("good", 0), processor(0));
        let mut daemon = BrightnessDaemon::new(ScriptedSource::values(&[]), manager, running());

        assert_eq!(daemon.process_line(r#"{"value":33}"#), 1);
        // one write plus one retry on the broken display
        assert_eq!(daemon.displays().get(bad).unwrap().backend.writes, [33, 33]);
        assert_eq!(daemon.displays().get(good).unwrap().backend.brightness, 33);
    }

    #[test]
    fn test_full_record_drives_display() {
        let mut manager = DisplayManager::new();
        manager.add(MockDisplay::new("a", 0), processor(5));
        let mut daemon = BrightnessDaemon::new(ScriptedSource::values(&[]), manager, running());

        let applied = r#"{"deviceId":"esp32-01","sensorId":"ldr","ts":1718000000123,"value":55}"#;
        let suppressed = r#"{"deviceId":"esp32-01","sensorId":"ldr","ts":1718000000124,"value":57}"#;
        assert_eq!(daemon.process_line(applied), 1);
        assert_eq!(daemon.process_line(suppressed), 0);
        assert_eq!(daemon.displays().get(DisplayIndex(0)).unwrap().backend.writes, [55]);
    }

    #[test]
    fn test_malformed_line_touches_nothing() {
        let mut manager = DisplayManager::new();
        manager.add(MockDisplay::new("a", 0), processor(0));
        let mut daemon = BrightnessDaemon::new(ScriptedSource::values(&[]), manager, running());

        assert_eq!(daemon.process_line("{\"value\": nope}"), 0);
        let slot = daemon.displays().get(DisplayIndex(0)).unwrap();
        assert_eq!(slot.processor.state().ema_value, None);
    }

    #[test]
    fn test_combined_mode_drives_all_backends() {
        let mut manager = DisplayManager::new();
        manager.add(
            CompositeController::new(vec![MockDisplay::new("a", 0), MockDisplay::broken("b")]),
            processor(0),
        );
        let mut daemon = BrightnessDaemon::new(ScriptedSource::values(&[]), manager, running());

        assert_eq!(daemon.process_line(r#"{"value":60}"#), 1);
        let composite = &daemon.displays().get(DisplayIndex(0)).unwrap().backend;
        assert_eq!(composite.controllers()[0].writes, [60]);
        assert_eq!(composite.controllers()[1].writes, [60]);
    }
}
