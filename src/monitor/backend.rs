use crate::protocols::backlight::BacklightDisplay;
use crate::protocols::{DisplayProtocol, Percent};

#[cfg(feature = "ddc-ci")]
use crate::protocols::ddc_ci::DdcCiDisplay;

/// Backend type for display control
pub enum DisplayBackend {
    /// Kernel backlight class (built-in panels)
    Backlight(BacklightDisplay),
    /// DDC/CI protocol (standard external monitors via I2C)
    #[cfg(feature = "ddc-ci")]
    DdcCi(DdcCiDisplay),
}

impl std::fmt::Debug for DisplayBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DisplayBackend::Backlight(display) => write!(f, "{:?}", display),
            #[cfg(feature = "ddc-ci")]
            DisplayBackend::DdcCi(display) => write!(f, "{:?}", display),
        }
    }
}

impl DisplayProtocol for DisplayBackend {
    fn id(&self) -> String {
        match self {
            DisplayBackend::Backlight(display) => display.id(),
            #[cfg(feature = "ddc-ci")]
            DisplayBackend::DdcCi(display) => display.id(),
        }
    }

    fn source(&self) -> &'static str {
        match self {
            DisplayBackend::Backlight(display) => display.source(),
            #[cfg(feature = "ddc-ci")]
            DisplayBackend::DdcCi(display) => display.source(),
        }
    }

    fn name(&self) -> String {
        match self {
            DisplayBackend::Backlight(display) => display.name(),
            #[cfg(feature = "ddc-ci")]
            DisplayBackend::DdcCi(display) => display.name(),
        }
    }

    fn get_brightness(&mut self) -> anyhow::Result<Percent> {
        match self {
            DisplayBackend::Backlight(display) => display.get_brightness(),
            #[cfg(feature = "ddc-ci")]
            DisplayBackend::DdcCi(display) => display.get_brightness(),
        }
    }

    fn set_brightness(&mut self, value: Percent) -> anyhow::Result<()> {
        match self {
            DisplayBackend::Backlight(display) => display.set_brightness(value),
            #[cfg(feature = "ddc-ci")]
            DisplayBackend::DdcCi(display) => display.set_brightness(value),
        }
    }
}

/// Identity of a discovered display, as shown to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorInfo {
    pub source: &'static str,
    pub name: String,
}

impl MonitorInfo {
    pub fn of(display: &impl DisplayProtocol) -> Self {
        Self {
            source: display.source(),
            name: display.name(),
        }
    }
}
