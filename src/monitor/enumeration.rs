use std::collections::HashSet;
use std::path::PathBuf;

use crate::protocols::DisplayProtocol;
use crate::protocols::backlight::BacklightDisplay;

#[cfg(feature = "ddc-ci")]
use crate::protocols::ddc_ci::DdcCiDisplay;

use super::backend::{DisplayBackend, MonitorInfo};

/// Finds brightness-capable displays once at startup.
///
/// Also owns the "already logged" flags per backend source, so repeated
/// listing of the same displays does not repeat the log output.
pub struct MonitorDiscovery {
    backlight_root: PathBuf,
    logged_sources: HashSet<&'static str>,
    logged_empty: bool,
}

impl MonitorDiscovery {
    pub fn new(backlight_root: PathBuf) -> Self {
        Self {
            backlight_root,
            logged_sources: HashSet::new(),
            logged_empty: false,
        }
    }

    /// Enumerate all available displays, built-in panels first
    pub fn discover(&self) -> Vec<DisplayBackend> {
        info!("=== START ENUMERATE ===");

        let mut displays: Vec<DisplayBackend> = BacklightDisplay::enumerate(&self.backlight_root)
            .into_iter()
            .map(DisplayBackend::Backlight)
            .collect();
        info!("Found {} backlight device(s)", displays.len());

        #[cfg(feature = "ddc-ci")]
        {
            let ddc_displays = DdcCiDisplay::enumerate();
            info!("Found {} DDC/CI display(s)", ddc_displays.len());
            displays.extend(ddc_displays.into_iter().map(DisplayBackend::DdcCi));
        }

        for found in &displays {
            debug!(display_id = %found.id(), name = %found.name(), "Discovered display");
        }

        info!("=== END ENUMERATE: Found {} monitors ===", displays.len());
        displays
    }

    /// Log detected displays grouped by source, once per source.
    ///
    /// An empty listing is reported once as well. Returns the groups that were
    /// actually logged by this call.
    pub fn log_detected<D: DisplayProtocol>(&mut self, displays: &[D]) -> Vec<&'static str> {
        if displays.is_empty() {
            if !self.logged_empty {
                info!("No brightness-capable monitors detected.");
                self.logged_empty = true;
            }
            return Vec::new();
        }

        let mut groups: Vec<(&'static str, Vec<MonitorInfo>)> = Vec::new();
        for display in displays {
            let info = MonitorInfo::of(display);
            match groups.iter_mut().find(|(source, _)| *source == info.source) {
                Some((_, members)) => members.push(info),
                None => groups.push((info.source, vec![info])),
            }
        }

        let mut logged = Vec::new();
        for (source, members) in groups {
            if !self.logged_sources.insert(source) {
                continue;
            }
            info!("{source}: detected {} monitor(s):", members.len());
            for member in &members {
                info!("{source}: - {}", member.name);
            }
            logged.push(source);
        }
        logged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocols::testing::MockDisplay;

    #[test]
    fn test_logs_each_source_once() {
        let mut discovery = MonitorDiscovery::new(PathBuf::from("/nonexistent"));
        let displays = vec![MockDisplay::new("a", 10), MockDisplay::new("b", 20)];

        assert_eq!(discovery.log_detected(&displays), ["Mock"]);
        assert!(discovery.log_detected(&displays).is_empty());
    }

    #[test]
    fn test_empty_list_logged_once() {
        let mut discovery = MonitorDiscovery::new(PathBuf::from("/nonexistent"));
        let displays: Vec<MockDisplay> = Vec::new();

        assert!(!discovery.logged_empty);
        assert!(discovery.log_detected(&displays).is_empty());
        assert!(discovery.logged_empty);
        assert!(discovery.log_detected(&displays).is_empty());
        assert!(discovery.logged_empty);
    }

    #[test]
    fn test_discover_with_empty_root() {
        let root = tempfile::tempdir().unwrap();
        let discovery = MonitorDiscovery::new(root.path().to_path_buf());
        let displays = discovery.discover();
        assert!(displays.iter().all(|found| found.source() != "Backlight"));
    }

    #[test]
    fn test_discovers_backlights_from_root() {
        let root = tempfile::tempdir().unwrap();
        for name in ["b_panel", "a_panel"] {
            let dir = root.path().join(name);
            std::fs::create_dir_all(&dir).unwrap();
            std::fs::write(dir.join("brightness"), "1").unwrap();
            std::fs::write(dir.join("max_brightness"), "10").unwrap();
        }

        let discovery = MonitorDiscovery::new(root.path().to_path_buf());
        let backlights: Vec<_> = discovery
            .discover()
            .into_iter()
            .filter(|d| d.source() == "Backlight")
            .map(|d| d.name())
            .collect();
        assert_eq!(backlights, ["a_panel", "b_panel"]);
    }
}
