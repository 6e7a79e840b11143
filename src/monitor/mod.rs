mod backend;
mod composite;
mod enumeration;
mod manager;

pub use backend::{DisplayBackend, MonitorInfo};
pub use composite::CompositeController;
pub use enumeration::MonitorDiscovery;
pub use manager::{DisplayIndex, DisplayManager, DisplaySlot};
