// ── Device table and deltas ──

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::{AvailabilityChange, DeviceKey, DeviceRecord, Subsystem};

/// Merged view of every device ever seen. Replaced wholesale per pass;
/// readers hold an `Arc` to a consistent version.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeviceTable {
    records: BTreeMap<DeviceKey, DeviceRecord>,
}

impl DeviceTable {
    pub fn get(&self, key: &DeviceKey) -> Option<&DeviceRecord> {
        self.records.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeviceRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn reachable_count(&self) -> usize {
        self.records.values().filter(|r| r.reachable).count()
    }

    pub(crate) fn get_mut(&mut self, key: &DeviceKey) -> Option<&mut DeviceRecord> {
        self.records.get_mut(key)
    }

    pub(crate) fn insert(&mut self, record: DeviceRecord) {
        self.records.insert(record.key.clone(), record);
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut DeviceRecord> {
        self.records.values_mut()
    }

    /// Compare against the previous table. Records are never removed, so
    /// only additions and modifications are reported.
    pub(crate) fn diff(&self, prior: &DeviceTable) -> (Vec<DeviceKey>, Vec<DeviceKey>, Vec<AvailabilityChange>) {
        let mut added = Vec::new();
        let mut changed = Vec::new();
        let mut availability = Vec::new();

        for (key, record) in &self.records {
            match prior.records.get(key) {
                None => added.push(key.clone()),
                Some(old) => {
                    if !record.same_state(old) {
                        changed.push(key.clone());
                    }
                    if record.reachable != old.reachable {
                        availability.push(AvailabilityChange {
                            key: key.clone(),
                            reachable: record.reachable,
                        });
                    }
                }
            }
        }
        (added, changed, availability)
    }
}

/// Changes produced by one pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SnapshotDelta {
    pub fetched_at: Option<DateTime<Utc>>,
    pub added: Vec<DeviceKey>,
    pub changed: Vec<DeviceKey>,
    pub availability: Vec<AvailabilityChange>,
    pub stale: BTreeSet<Subsystem>,
    pub skipped: BTreeSet<Subsystem>,
    pub system_changed: bool,
}

impl SnapshotDelta {
    /// True when nothing consumers render has moved.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.changed.is_empty()
            && self.availability.is_empty()
            && !self.system_changed
    }
}
