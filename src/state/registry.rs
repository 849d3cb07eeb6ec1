//! Marker registry: the map's single source of truth.
//!
//! DESIGN
//! ======
//! A `HashMap<CoordinateKey, MarkerRecord>` that exclusively owns every
//! record shown on the map. Each operation also emits the surface commands
//! that keep the rendered map consistent with it.
//!
//! INVARIANTS
//! ==========
//! - At most one record per key. Upserting into an occupied key detaches the
//!   old pin and views before the new pin is attached.
//! - `remove` is idempotent: removing an absent key does nothing, because
//!   racing expiry/delete paths can both try to remove the same marker.
//! - `clear_all` detaches every pin before dropping the records.

use std::collections::HashMap;

use crate::geo::CoordinateKey;

use super::marker::MarkerRecord;
use super::surface::{Surface, SurfaceOp, ViewKind};

#[derive(Debug, Default)]
pub struct MarkerRegistry {
    records: HashMap<CoordinateKey, MarkerRecord>,
}

impl MarkerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `record` under its key, returning the record it replaced.
    pub fn upsert(&mut self, record: MarkerRecord, surface: &mut Surface) -> Option<MarkerRecord> {
        let key = record.key.clone();
        let evicted = self.records.remove(&key);
        if evicted.is_some() {
            detach(&key, surface);
        }

        surface.push(SurfaceOp::AttachPin { key: key.clone(), position: record.pin.position, icon: record.pin.icon });
        if !record.pin.visible {
            surface.push(SurfaceOp::SetPinVisible { key: key.clone(), visible: false });
        }
        if record.preview.open {
            surface.push(SurfaceOp::OpenView { key: key.clone(), view: ViewKind::Preview });
        }
        if record.info.open {
            surface.push(SurfaceOp::OpenView { key: key.clone(), view: ViewKind::Info });
        }

        self.records.insert(key, record);
        evicted
    }

    #[must_use]
    pub fn lookup(&self, key: &CoordinateKey) -> Option<&MarkerRecord> {
        self.records.get(key)
    }

    pub fn lookup_mut(&mut self, key: &CoordinateKey) -> Option<&mut MarkerRecord> {
        self.records.get_mut(key)
    }

    /// Detach and drop the record at `key`. Absent keys are a no-op.
    pub fn remove(&mut self, key: &CoordinateKey, surface: &mut Surface) -> Option<MarkerRecord> {
        let removed = self.records.remove(key)?;
        detach(key, surface);
        Some(removed)
    }

    /// Detach every record, then empty the registry.
    pub fn clear_all(&mut self, surface: &mut Surface) {
        let mut keys: Vec<CoordinateKey> = self.records.keys().cloned().collect();
        keys.sort();
        for key in &keys {
            detach(key, surface);
        }
        self.records.clear();
    }

    #[must_use]
    pub fn contains(&self, key: &CoordinateKey) -> bool {
        self.records.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &MarkerRecord> {
        self.records.values()
    }

    pub fn records_mut(&mut self) -> impl Iterator<Item = &mut MarkerRecord> {
        self.records.values_mut()
    }

    /// Keys in sorted order.
    #[must_use]
    pub fn keys(&self) -> Vec<CoordinateKey> {
        let mut keys: Vec<CoordinateKey> = self.records.keys().cloned().collect();
        keys.sort();
        keys
    }
}

fn detach(key: &CoordinateKey, surface: &mut Surface) {
    surface.push(SurfaceOp::DetachPin { key: key.clone() });
    surface.push(SurfaceOp::DetachViews { key: key.clone() });
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;
