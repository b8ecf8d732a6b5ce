//! Build strategies and per-part state carried between passes.
//!
//! A part that has never been built (first pass, shape change, previous
//! failure) goes through [`RebuildFull`]. Otherwise [`UpdateIncremental`]
//! reuses the previous record when the engine reports the geometry unchanged,
//! or refills the previous record's buffers when it changed. Either way the
//! record matches what a full rebuild would produce.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use serde::Serialize;

use super::{update_material, MaterialSlot, PartTranslator};
use crate::attribute::AttributeLedger;
use crate::engine::{Engine, GeoId, GeoInfo, MaterialId, ObjectId, PartId, PartInfo};
use crate::output::{PartData, PartKind, PartRecord};

/// Identity of a part across passes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PartKey {
    pub object: ObjectId,
    pub geo: GeoId,
    pub part: PartId,
}

impl PartKey {
    pub fn new(object: ObjectId, geo: GeoId, part: PartId) -> Self {
        Self { object, geo, part }
    }
}

/// How a part's record was produced in its last pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum BuildPath {
    /// Translated from scratch.
    Full,
    /// Retranslated into the previous record's buffers.
    Refill,
    /// Previous record carried over.
    Reused,
    /// Translation failed; the record is empty.
    Failed,
}

/// Translated record of one part plus what the next pass needs to know.
#[derive(Clone, Debug, PartialEq)]
pub struct PartState {
    pub record: PartRecord,
    pub material_id: Option<MaterialId>,
    /// The next pass must rebuild this part from scratch.
    pub never_built: bool,
    pub path: BuildPath,
}

impl PartState {
    /// Empty record of the given kind, flagged for a full rebuild.
    pub fn failed(name: &str, kind: PartKind) -> Self {
        Self {
            record: PartRecord::new(name, PartData::empty(kind)),
            material_id: None,
            never_built: true,
            path: BuildPath::Failed,
        }
    }

    pub fn material_slot(&self) -> MaterialSlot {
        MaterialSlot {
            id: self.material_id,
            record: self.record.material.clone(),
        }
    }
}

/// Per-part states of the last completed pass.
#[derive(Clone, Debug, Default)]
pub struct PartCache {
    parts: BTreeMap<PartKey, PartState>,
}

impl PartCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &PartKey) -> Option<&PartState> {
        self.parts.get(key)
    }

    /// Store a state, replacing any previous one for the key.
    pub fn insert(&mut self, key: PartKey, state: PartState) -> &PartState {
        match self.parts.entry(key) {
            Entry::Occupied(mut slot) => {
                slot.insert(state);
                slot.into_mut()
            }
            Entry::Vacant(slot) => slot.insert(state),
        }
    }

    /// Remove a state, handing its buffers to the caller.
    pub fn take(&mut self, key: &PartKey) -> Option<PartState> {
        self.parts.remove(key)
    }

    /// Flag every part for a full rebuild.
    pub fn invalidate_all(&mut self) {
        for state in self.parts.values_mut() {
            state.never_built = true;
        }
    }

    pub fn clear(&mut self) {
        self.parts.clear();
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PartKey, &PartState)> {
        self.parts.iter()
    }
}

/// One way of producing a part's record.
pub trait BuildStrategy {
    fn name(&self) -> &'static str;

    /// Build the part's state. `previous` is the state of the last pass, if
    /// any; strategies may recycle its buffers.
    fn build(&self, translator: &PartTranslator<'_>, previous: Option<PartState>, ledger: &mut AttributeLedger) -> PartState;
}

/// Translate everything from scratch.
#[derive(Clone, Copy, Debug, Default)]
pub struct RebuildFull;

impl BuildStrategy for RebuildFull {
    fn name(&self) -> &'static str {
        "rebuild_full"
    }

    fn build(&self, translator: &PartTranslator<'_>, _previous: Option<PartState>, ledger: &mut AttributeLedger) -> PartState {
        translator.build(PartData::empty(translator.kind()), None, ledger, BuildPath::Full)
    }
}

/// Reuse or refill the previous state. Falls back to a full rebuild when
/// there is no usable previous state.
#[derive(Clone, Copy, Debug, Default)]
pub struct UpdateIncremental;

impl BuildStrategy for UpdateIncremental {
    fn name(&self) -> &'static str {
        "update_incremental"
    }

    fn build(&self, translator: &PartTranslator<'_>, previous: Option<PartState>, ledger: &mut AttributeLedger) -> PartState {
        let prev = match previous {
            Some(prev) if !prev.never_built && prev.record.kind() == translator.kind() => prev,
            other => return RebuildFull.build(translator, other, ledger),
        };
        let slot = prev.material_slot();
        if translator.geo().has_geo_changed {
            return translator.build(prev.record.data, Some(slot), ledger, BuildPath::Refill);
        }

        ledger.clear();
        let material = update_material(translator, Some(slot));
        let mut record = prev.record;
        record.name.clone_from(&translator.info().name);
        record.material = material.record;
        refresh_time(&mut record.data, translator.time());
        PartState {
            record,
            material_id: material.id,
            never_built: false,
            path: BuildPath::Reused,
        }
    }
}

/// Fields that follow the pass time even when the geometry is unchanged.
fn refresh_time(data: &mut PartData, time: f32) {
    if let PartData::Particle(particles) = data {
        particles.current_time = time;
    }
}

/// Strategy for a part given its previous state.
pub fn strategy_for(previous: Option<&PartState>) -> &'static dyn BuildStrategy {
    match previous {
        Some(prev) if !prev.never_built => &UpdateIncremental,
        _ => &RebuildFull,
    }
}

/// Part translation state of one compute pass.
///
/// States are moved out of the previous pass's cache as parts are visited,
/// so their buffers can be recycled, and collected into a fresh cache.
pub struct PartPass<'a> {
    engine: &'a dyn Engine,
    time: f32,
    previous: PartCache,
    next: PartCache,
    ledger: AttributeLedger,
    kind_changes: usize,
}

impl<'a> PartPass<'a> {
    pub fn new(engine: &'a dyn Engine, time: f32, previous: PartCache) -> Self {
        Self {
            engine,
            time,
            previous,
            next: PartCache::new(),
            ledger: AttributeLedger::new(),
            kind_changes: 0,
        }
    }

    pub fn engine(&self) -> &'a dyn Engine {
        self.engine
    }

    /// Translate one part with the strategy its previous state calls for.
    pub fn translate(&mut self, key: PartKey, geo: &GeoInfo, info: &PartInfo) -> &PartState {
        let translator = PartTranslator::new(self.engine, geo, info, self.time);
        let previous = self.previous.take(&key);
        if previous.as_ref().is_some_and(|p| p.record.kind() != translator.kind()) {
            self.kind_changes += 1;
        }
        let state = strategy_for(previous.as_ref()).build(&translator, previous, &mut self.ledger);
        self.next.insert(key, state)
    }

    /// Parts whose kind differs from the previous pass.
    pub fn kind_changes(&self) -> usize {
        self.kind_changes
    }

    /// Cache for the next pass. Parts not visited in this pass are dropped.
    pub fn finish(self) -> PartCache {
        self.next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::memory::{AssetDefinition, MemoryEngine, MemoryGeo, MemoryMaterial, MemoryObject, MemoryPart};
    use crate::engine::{Engine, GeoInfo, ParmValue, PartInfo};
    use crate::util::{AttributeOwner, AttributeValues, GroupType, Vec3};
    use std::path::Path;

    fn quad() -> MemoryPart {
        MemoryPart::mesh(
            "quad",
            &[Vec3::ZERO, Vec3::X, Vec3::new(1.0, 1.0, 0.0), Vec3::Y],
            vec![3, 3],
            vec![0, 1, 2, 0, 2, 3],
        )
        .with_attribute(AttributeOwner::Vertex, "uv", 2, AttributeValues::Float(vec![0.0; 12]))
        .with_attribute(AttributeOwner::Point, "weight", 1, AttributeValues::Float(vec![0.1, 0.2, 0.3, 0.4]))
        .with_group(GroupType::Primitive, "top", &[1])
        .with_material(MaterialId(7))
    }

    fn setup() -> (MemoryEngine, crate::engine::AssetId) {
        let mut engine = MemoryEngine::new();
        engine.set_material(
            MaterialId(7),
            MemoryMaterial::new("red", "/mat/red").with_parm("ogl_diff", ParmValue::Float(vec![1.0, 0.0, 0.0])),
        );
        engine.define_asset(
            "lib.hda",
            "quad",
            AssetDefinition::new()
                .with_parm("size", ParmValue::Float(vec![1.0]))
                .with_object(MemoryObject::new("obj").with_geo(MemoryGeo::new("geo").with_part(quad()))),
        );
        let asset = engine.create_asset(Path::new("lib.hda"), "quad").unwrap();
        (engine, asset)
    }

    fn infos(engine: &MemoryEngine, asset: crate::engine::AssetId) -> (GeoInfo, PartInfo) {
        let obj = engine.object_infos(asset).unwrap()[0].id;
        let geo = engine.geo_infos(obj).unwrap().remove(0);
        let part = engine.part_info(geo.id, PartId(0)).unwrap();
        (geo, part)
    }

    #[test]
    fn test_strategies_agree() {
        let (mut engine, asset) = setup();
        engine.cook(asset).unwrap();
        let (geo, part) = infos(&engine, asset);
        let mut ledger = AttributeLedger::new();
        let first = RebuildFull.build(&PartTranslator::new(&engine, &geo, &part, 0.0), None, &mut ledger);
        assert_eq!(first.path, BuildPath::Full);
        assert!(!first.never_built);

        engine.set_parm_value(asset, "size", &ParmValue::Float(vec![2.0])).unwrap();
        engine.cook(asset).unwrap();
        let (geo, part) = infos(&engine, asset);
        let t = PartTranslator::new(&engine, &geo, &part, 0.0);
        let full = RebuildFull.build(&t, Some(first.clone()), &mut ledger);
        let incremental = UpdateIncremental.build(&t, Some(first), &mut ledger);
        assert_eq!(incremental.path, BuildPath::Refill);
        assert_eq!(full.record, incremental.record);
        assert_eq!(full.material_id, incremental.material_id);
    }

    #[test]
    fn test_unchanged_geometry_is_reused() {
        let (mut engine, asset) = setup();
        engine.cook(asset).unwrap();
        let (geo, part) = infos(&engine, asset);
        let mut ledger = AttributeLedger::new();
        let first = RebuildFull.build(&PartTranslator::new(&engine, &geo, &part, 0.0), None, &mut ledger);
        let queries = engine.stats().material_info_queries;

        engine.cook(asset).unwrap();
        let (geo, part) = infos(&engine, asset);
        let again = UpdateIncremental.build(&PartTranslator::new(&engine, &geo, &part, 0.0), Some(first.clone()), &mut ledger);
        assert_eq!(again.path, BuildPath::Reused);
        assert_eq!(again.record, first.record);
        assert_eq!(engine.stats().material_info_queries, queries);
    }

    #[test]
    fn test_reused_particles_follow_pass_time() {
        let mut engine = MemoryEngine::new();
        let cloud = MemoryPart::particles("cloud", &[Vec3::ZERO, Vec3::X, Vec3::Y]);
        engine.define_asset(
            "lib.hda",
            "cloud",
            AssetDefinition::new().with_object(MemoryObject::new("obj").with_geo(MemoryGeo::new("geo").with_part(cloud))),
        );
        let asset = engine.create_asset(Path::new("lib.hda"), "cloud").unwrap();
        engine.cook(asset).unwrap();
        let (geo, part) = infos(&engine, asset);
        let mut ledger = AttributeLedger::new();
        let first = RebuildFull.build(&PartTranslator::new(&engine, &geo, &part, 0.0), None, &mut ledger);
        assert_eq!(first.record.data.as_particle().unwrap().current_time, 0.0);

        engine.cook(asset).unwrap();
        let (geo, part) = infos(&engine, asset);
        assert!(!geo.has_geo_changed);
        let t = PartTranslator::new(&engine, &geo, &part, 1.0);
        let full = RebuildFull.build(&t, Some(first.clone()), &mut ledger);
        let incremental = UpdateIncremental.build(&t, Some(first), &mut ledger);
        assert_eq!(incremental.path, BuildPath::Reused);
        assert_eq!(incremental.record.data.as_particle().unwrap().current_time, 1.0);
        assert_eq!(full.record, incremental.record);
    }

    #[test]
    fn test_never_built_falls_back_to_full() {
        let (mut engine, asset) = setup();
        engine.cook(asset).unwrap();
        let (geo, part) = infos(&engine, asset);
        let t = PartTranslator::new(&engine, &geo, &part, 0.0);
        let mut ledger = AttributeLedger::new();
        let mut prev = RebuildFull.build(&t, None, &mut ledger);
        prev.never_built = true;
        assert_eq!(strategy_for(Some(&prev)).name(), "rebuild_full");
        let state = UpdateIncremental.build(&t, Some(prev), &mut ledger);
        assert_eq!(state.path, BuildPath::Full);
    }

    #[test]
    fn test_cache_invalidate_all() {
        let mut cache = PartCache::new();
        let key = PartKey::new(ObjectId(1), GeoId(2), PartId(0));
        let mut state = PartState::failed("p", PartKind::Mesh);
        state.never_built = false;
        cache.insert(key, state);
        cache.invalidate_all();
        assert!(cache.get(&key).unwrap().never_built);
        assert!(cache.take(&key).is_some());
        assert!(cache.is_empty());
    }
}
