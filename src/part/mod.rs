//! Part translation: one engine part into one [`PartRecord`].
//!
//! [`PartTranslator`] picks the part's kind (see [`select_kind`]), fills the
//! matching record in place, resolves its material and enumerates the
//! remaining attributes and groups. How much of that work runs is decided by
//! a [`BuildStrategy`]: [`RebuildFull`] translates from scratch,
//! [`UpdateIncremental`] reuses what the previous pass left behind. Both
//! produce the same record for the same engine state.
//!
//! Failures are isolated per part. A part that cannot be translated is
//! emitted as an empty record of its kind and is rebuilt from scratch on the
//! next pass.

use tracing::{debug, warn};

use crate::attribute::{AttributeLedger, AttributeReader};
use crate::engine::{Engine, GeoInfo, PartInfo, PartType};
use crate::output::{ExtraAttribute, GroupRecord, PartData, PartKind, PartRecord};
use crate::util::Result;

mod curves;
mod extras;
mod instancer;
mod material;
mod mesh;
mod particle;
mod strategy;
mod volume;

pub use extras::{read_extra_attributes, read_groups};
pub use material::{has_material_changed, resolve_material, update_material, MaterialSlot};
pub use strategy::{
    strategy_for, BuildPath, BuildStrategy, PartCache, PartKey, PartPass, PartState, RebuildFull, UpdateIncremental,
};

/// Pick the representation of a part. First match wins:
/// instancer, volume, curves, particle cloud (points without faces), mesh.
///
/// The engine part type is authoritative for the first three kinds. A part
/// with neither points nor faces is an empty mesh.
pub fn select_kind(info: &PartInfo) -> PartKind {
    match info.part_type {
        PartType::Instancer => PartKind::Instancer,
        PartType::Volume => PartKind::Volume,
        PartType::Curve => PartKind::Curves,
        _ if info.face_count == 0 && info.point_count > 0 => PartKind::Particle,
        _ => PartKind::Mesh,
    }
}

/// Translates one part of one cooked geometry.
#[derive(Clone, Copy)]
pub struct PartTranslator<'a> {
    engine: &'a dyn Engine,
    geo: &'a GeoInfo,
    info: &'a PartInfo,
    time: f32,
}

impl<'a> PartTranslator<'a> {
    pub fn new(engine: &'a dyn Engine, geo: &'a GeoInfo, info: &'a PartInfo, time: f32) -> Self {
        Self { engine, geo, info, time }
    }

    pub fn engine(&self) -> &'a dyn Engine {
        self.engine
    }

    pub fn geo(&self) -> &'a GeoInfo {
        self.geo
    }

    pub fn info(&self) -> &'a PartInfo {
        self.info
    }

    pub fn kind(&self) -> PartKind {
        select_kind(self.info)
    }

    /// Cook time, in seconds.
    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn reader(&self) -> AttributeReader<'a> {
        AttributeReader::new(self.engine, self.geo.id, self.info.id)
    }

    /// Overwrite `data` with this part's geometry. `data` must already be of
    /// this part's kind; its buffers are cleared and reused.
    pub fn fill(&self, data: &mut PartData, ledger: &mut AttributeLedger) -> Result<()> {
        match data {
            PartData::Mesh(mesh) => mesh::fill_mesh(self, mesh, ledger),
            PartData::Particle(particles) => particle::fill_particles(self, particles, ledger),
            PartData::Curves(curves) => curves::fill_curves(self, curves, ledger),
            PartData::Volume(volume) => volume::fill_volume(self, volume),
            PartData::Instancer(instancer) => instancer::fill_instancer(self, instancer),
        }
    }

    fn translate(
        &self,
        data: &mut PartData,
        ledger: &mut AttributeLedger,
    ) -> Result<(Vec<ExtraAttribute>, Vec<GroupRecord>)> {
        self.fill(data, ledger)?;
        let face_counts = data.as_mesh().map(|m| m.face_counts.as_slice());
        let extras = read_extra_attributes(self, ledger, face_counts)?;
        let groups = read_groups(self)?;
        Ok((extras, groups))
    }

    /// Translate the geometry, attributes and groups of this part into
    /// `data`'s buffers, then attach the material. The ledger is cleared
    /// first.
    pub(crate) fn build(
        &self,
        mut data: PartData,
        previous_material: Option<MaterialSlot>,
        ledger: &mut AttributeLedger,
        path: BuildPath,
    ) -> PartState {
        ledger.clear();
        let kind = self.kind();
        if data.kind() != kind {
            data = PartData::empty(kind);
        }
        match self.translate(&mut data, ledger) {
            Ok((extra_attributes, groups)) => {
                let material = update_material(self, previous_material);
                debug!(part = %self.info.name, %kind, ?path, "part translated");
                PartState {
                    record: PartRecord {
                        name: self.info.name.clone(),
                        data,
                        material: material.record,
                        extra_attributes,
                        groups,
                    },
                    material_id: material.id,
                    never_built: false,
                    path,
                }
            }
            Err(e) => {
                warn!(part = %self.info.name, %kind, error = %e, "part translation failed, emitting empty record");
                PartState::failed(&self.info.name, kind)
            }
        }
    }
}
