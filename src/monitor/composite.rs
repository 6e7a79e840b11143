// SPDX-License-Identifier: GPL-3.0-only
//! Several displays driven as one target
//!
//! Reads take the first backend that answers; writes go to every backend and
//! succeed when at least one of them accepted the value.

use anyhow::Result;

use crate::error::AppError;
use crate::protocols::{DisplayProtocol, Percent};

use super::enumeration::MonitorDiscovery;

#[derive(Debug)]
pub struct CompositeController<B> {
    controllers: Vec<B>,
}

impl<B: DisplayProtocol> CompositeController<B> {
    pub fn new(controllers: Vec<B>) -> Self {
        Self { controllers }
    }

    #[cfg(test)]
    pub fn controllers(&self) -> &[B] {
        &self.controllers
    }

    /// Log the wrapped displays; sources already logged stay quiet
    pub fn log_detected_monitors(&self, discovery: &mut MonitorDiscovery) {
        discovery.log_detected(&self.controllers);
    }
}

impl<B: DisplayProtocol> DisplayProtocol for CompositeController<B> {
    fn id(&self) -> String {
        "composite".to_string()
    }

    fn source(&self) -> &'static str {
        "Composite"
    }

    fn name(&self) -> String {
        let names: Vec<_> = self.controllers.iter().map(|c| c.name()).collect();
        format!("[{}]", names.join(", "))
    }

    fn get_brightness(&mut self) -> Result<Percent> {
        if self.controllers.is_empty() {
            return Err(AppError::BackendUnavailable("No brightness controllers available.".into()).into());
        }

        let mut errors = Vec::new();
        for controller in &mut self.controllers {
            match controller.get_brightness() {
                Ok(value) => return Ok(value),
                Err(e) => {
                    let msg = format!("{e:#}");
                    if !msg.trim().is_empty() {
                        errors.push(msg);
                    }
                }
            }
        }

        let reason = if errors.is_empty() {
            "No brightness controllers available.".to_string()
        } else {
            errors.join(" | ")
        };
        Err(AppError::BackendUnavailable(reason).into())
    }

    fn set_brightness(&mut self, value: Percent) -> Result<()> {
        let mut any_success = false;

        for controller in &mut self.controllers {
            match controller.set_brightness(value) {
                Ok(()) => any_success = true,
                Err(e) => debug!(display_id = %controller.id(), "Composite member rejected {value}%: {e:#}"),
            }
        }

        if any_success {
            Ok(())
        } else {
            Err(AppError::BackendUnavailable(
                "No brightness controllers available or all updates failed.".into(),
            )
            .into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocols::testing::MockDisplay;

    #[test]
    fn test_get_returns_first_success() {
        let mut composite = CompositeController::new(vec![
            MockDisplay::broken("a"),
            MockDisplay::new("b", 40),
            MockDisplay::new("c", 90),
        ]);

        assert_eq!(composite.get_brightness().unwrap(), 40);
        // the later backend is never consulted
        assert_eq!(composite.controllers()[2].get_calls, 0);
    }

    #[test]
    fn test_get_aggregates_errors() {
        let mut composite =
            CompositeController::new(vec![MockDisplay::broken("a"), MockDisplay::broken("b")]);

        let err = composite.get_brightness().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Brightness backend unavailable: a read failed | b read failed"
        );
    }

    #[test]
    fn test_get_with_no_backends() {
        let mut composite: CompositeController<MockDisplay> = CompositeController::new(Vec::new());
        let err = composite.get_brightness().unwrap_err();
        assert!(err.to_string().contains("No brightness controllers available"));
    }

    #[test]
    fn test_set_succeeds_if_any_backend_accepts() {
        let mut composite = CompositeController::new(vec![
            MockDisplay::broken("a"),
            MockDisplay::new("b", 0),
            MockDisplay::broken("c"),
        ]);

        composite.set_brightness(65).unwrap();
        // every backend was attempted despite the first failure
        for controller in composite.controllers() {
            assert_eq!(controller.writes, [65]);
        }
        assert_eq!(composite.controllers()[1].brightness, 65);
    }

    #[test]
    fn test_set_fails_when_all_fail() {
        let mut composite = CompositeController::new(vec![
            MockDisplay::broken("a"),
            MockDisplay::broken("b"),
            MockDisplay::broken("c"),
        ]);

        assert!(composite.set_brightness(65).is_err());
        assert!(composite.controllers().iter().all(|c| c.writes == [65]));
    }

    #[test]
    fn test_set_with_no_backends() {
        let mut composite: CompositeController<MockDisplay> = CompositeController::new(Vec::new());
        assert!(composite.set_brightness(10).is_err());
    }

    #[test]
    fn test_error_downcasts_to_backend_unavailable() {
        let mut composite = CompositeController::new(vec![MockDisplay::broken("a")]);
        let err = composite.set_brightness(1).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AppError>(),
            Some(AppError::BackendUnavailable(_))
        ));
    }
}
