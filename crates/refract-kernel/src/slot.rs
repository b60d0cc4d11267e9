//! Atomic publication of finished structures.

use std::sync::{Arc, PoisonError, RwLock};

use crate::structure::AccelStructure;

/// Holds the structure currently served to ray casters.
///
/// Builders swap in a complete structure with [`StructureSlot::publish`];
/// readers take an `Arc` snapshot and keep casting against it even if a
/// newer structure is published meanwhile.
#[derive(Debug, Default)]
pub struct StructureSlot {
    current: RwLock<Option<Arc<AccelStructure>>>,
}

impl StructureSlot {
    /// An empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the served structure, returning the previous one.
    pub fn publish(&self, structure: AccelStructure) -> Option<Arc<AccelStructure>> {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        current.replace(Arc::new(structure))
    }

    /// Snapshot of the served structure.
    pub fn current(&self) -> Option<Arc<AccelStructure>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Drop the served structure.
    pub fn clear(&self) -> Option<Arc<AccelStructure>> {
        self.current
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}
