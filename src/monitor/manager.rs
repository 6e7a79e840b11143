// SPDX-License-Identifier: GPL-3.0-only
//! Display slots
//!
//! Every driven display gets one slot pairing its backend with its own
//! [`BrightnessProcessor`]. Slots are created once after discovery and
//! addressed by [`DisplayIndex`] for the rest of the process, so filter
//! state can never leak from one display to another.
//!
//! In combined mode the manager holds a single slot whose backend is a
//! [`super::CompositeController`].

use crate::brightness::BrightnessProcessor;
use crate::protocols::DisplayProtocol;

/// Stable position of a display slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DisplayIndex(pub usize);

#[derive(Debug)]
pub struct DisplaySlot<C> {
    pub backend: C,
    pub processor: BrightnessProcessor,
}

#[derive(Debug)]
pub struct DisplayManager<C> {
    slots: Vec<DisplaySlot<C>>,
}

impl<C: DisplayProtocol> DisplayManager<C> {
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Register a display and the processor that will drive it
    pub fn add(&mut self, backend: C, processor: BrightnessProcessor) -> DisplayIndex {
        let index = DisplayIndex(self.slots.len());
        info!(display_id = %backend.id(), slot = index.0, "Display added to manager");
        self.slots.push(DisplaySlot { backend, processor });
        index
    }

    #[cfg(test)]
    pub fn get(&self, index: DisplayIndex) -> Option<&DisplaySlot<C>> {
        self.slots.get(index.0)
    }

    #[cfg(test)]
    pub fn get_mut(&mut self, index: DisplayIndex) -> Option<&mut DisplaySlot<C>> {
        self.slots.get_mut(index.0)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (DisplayIndex, &mut DisplaySlot<C>)> {
        self.slots
            .iter_mut()
            .enumerate()
            .map(|(i, slot)| (DisplayIndex(i), slot))
    }

    /// Get count of managed displays
    pub fn count(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl<C: DisplayProtocol> Default for DisplayManager<C> {
    fn default() -> Self {
        Self::new()
    }
}
