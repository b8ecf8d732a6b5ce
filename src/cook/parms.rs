//! Parameter bookkeeping: the node's parameter table and dirty set.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use tracing::{trace, warn};

use crate::engine::{ParmInfo, ParmValue};
use crate::util::{Error, Result};

/// Prefix of host input slots that mirror asset parameters.
pub const PARM_SLOT_PREFIX: &str = "houdiniAssetParm_";

/// Host-side identifier of an asset parameter slot.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParmId(String);

impl ParmId {
    /// Slot id for an engine parameter path.
    pub fn from_path(path: &str) -> Self {
        Self(format!("{PARM_SLOT_PREFIX}{path}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Engine parameter path this slot mirrors.
    pub fn path(&self) -> &str {
        self.0.strip_prefix(PARM_SLOT_PREFIX).unwrap_or(&self.0)
    }
}

impl fmt::Display for ParmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ParmId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Parameters flagged dirty since the last successful push, in marking order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParmDirtySet {
    ids: SmallVec<[ParmId; 8]>,
}

impl ParmDirtySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flag a parameter. Returns false if it was already dirty.
    pub fn mark(&mut self, id: ParmId) -> bool {
        if self.contains(&id) {
            return false;
        }
        self.ids.push(id);
        true
    }

    pub fn contains(&self, id: &ParmId) -> bool {
        self.ids.iter().any(|d| d == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParmId> {
        self.ids.iter()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// One parameter slot.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ParmEntry {
    pub id: ParmId,
    pub path: String,
    pub label: String,
    pub value: ParmValue,
}

/// Parameter slots of the loaded asset, in engine order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParmTable {
    entries: Vec<ParmEntry>,
}

impl ParmTable {
    /// Build the table from the asset's parameter list, seeded with defaults.
    pub fn from_infos(infos: Vec<ParmInfo>) -> Self {
        let entries = infos
            .into_iter()
            .map(|p| ParmEntry {
                id: ParmId::from_path(&p.path),
                path: p.path,
                label: p.label,
                value: p.default,
            })
            .collect();
        Self { entries }
    }

    pub fn get(&self, id: &ParmId) -> Option<&ParmEntry> {
        self.entries.iter().find(|e| &e.id == id)
    }

    fn get_mut(&mut self, id: &ParmId) -> Result<&mut ParmEntry> {
        self.entries
            .iter_mut()
            .find(|e| &e.id == id)
            .ok_or_else(|| Error::ParmNotFound(id.to_string()))
    }

    /// Store a host-side value.
    pub fn set(&mut self, id: &ParmId, value: ParmValue) -> Result<()> {
        self.get_mut(id)?.value = value;
        Ok(())
    }

    /// Pull engine values into every slot that is not dirty. Returns how many
    /// slots changed.
    pub fn pull(&mut self, dirty: &ParmDirtySet, mut read: impl FnMut(&str) -> Result<ParmValue>) -> usize {
        let mut changed = 0;
        for entry in self.entries.iter_mut().filter(|e| !dirty.contains(&e.id)) {
            match read(&entry.path) {
                Ok(value) if value != entry.value => {
                    trace!(parm = %entry.path, "parameter changed by the engine");
                    entry.value = value;
                    changed += 1;
                }
                Ok(_) => {}
                Err(e) => warn!(parm = %entry.path, error = %e, "parameter could not be pulled"),
            }
        }
        changed
    }

    pub fn contains(&self, id: &ParmId) -> bool {
        self.get(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParmEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parm_id_roundtrips_path() {
        let id = ParmId::from_path("size");
        assert_eq!(id.as_str(), "houdiniAssetParm_size");
        assert_eq!(id.path(), "size");
        assert_eq!(ParmId::from("other").path(), "other");
    }

    #[test]
    fn test_dirty_set_is_ordered_and_idempotent() {
        let mut dirty = ParmDirtySet::new();
        assert!(dirty.mark(ParmId::from_path("b")));
        assert!(dirty.mark(ParmId::from_path("a")));
        assert!(!dirty.mark(ParmId::from_path("b")));
        let order: Vec<_> = dirty.iter().map(ParmId::path).collect();
        assert_eq!(order, ["b", "a"]);
        dirty.clear();
        assert!(dirty.is_empty());
    }

    #[test]
    fn test_table_set_and_pull() {
        let mut table = ParmTable::from_infos(vec![
            ParmInfo { path: "size".into(), label: "Size".into(), default: ParmValue::Float(vec![1.0]) },
            ParmInfo { path: "seed".into(), label: "Seed".into(), default: ParmValue::Int(vec![0]) },
        ]);
        let size = ParmId::from_path("size");
        table.set(&size, ParmValue::Float(vec![2.0])).unwrap();
        assert_eq!(table.get(&size).unwrap().value, ParmValue::Float(vec![2.0]));

        let mut dirty = ParmDirtySet::new();
        dirty.mark(size.clone());
        let changed = table.pull(&dirty, |path| {
            assert_ne!(path, "size");
            Ok(ParmValue::Int(vec![7]))
        });
        assert_eq!(changed, 1);
        assert_eq!(table.get(&ParmId::from_path("seed")).unwrap().value, ParmValue::Int(vec![7]));
        assert_eq!(table.get(&size).unwrap().value, ParmValue::Float(vec![2.0]));

        let missing = ParmId::from_path("nope");
        assert!(matches!(table.set(&missing, ParmValue::Int(vec![1])), Err(Error::ParmNotFound(_))));
    }
}
