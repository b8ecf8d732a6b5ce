//! Shape signatures: what decides between an incremental pass and a full
//! resync, and whether the host must rebuild its downstream nodes.

use serde::Serialize;
use smallvec::SmallVec;
use std::fmt;

use super::SceneSnapshot;
use crate::engine::{GeoId, ObjectId, PartType};
use crate::output::{CookResult, ObjectContent};

/// Element counts of one part.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PartShape {
    pub part_type: PartType,
    pub points: usize,
    pub faces: usize,
    pub vertices: usize,
    pub instances: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GeoShape {
    pub id: GeoId,
    pub parts: SmallVec<[PartShape; 4]>,
    /// Named groups, only tracked while splitting by group.
    pub groups: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ObjectShape {
    pub id: ObjectId,
    pub is_instancer: bool,
    pub geos: SmallVec<[GeoShape; 2]>,
}

/// Object count, part counts and per-part element counts of one cook.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ShapeSignature {
    pub objects: Vec<ObjectShape>,
    pub split_by_group: bool,
}

impl ShapeSignature {
    pub fn of(snapshot: &SceneSnapshot, split_by_group: bool) -> Self {
        let objects = snapshot
            .objects
            .iter()
            .map(|o| ObjectShape {
                id: o.info.id,
                is_instancer: o.info.is_instancer,
                geos: o
                    .geos
                    .iter()
                    .map(|g| GeoShape {
                        id: g.info.id,
                        parts: g
                            .parts
                            .iter()
                            .map(|p| PartShape {
                                part_type: p.part_type,
                                points: p.point_count,
                                faces: p.face_count,
                                vertices: p.vertex_count,
                                instances: p.instance_count,
                            })
                            .collect(),
                        groups: if split_by_group { g.info.group_count() } else { 0 },
                    })
                    .collect(),
            })
            .collect();
        Self { objects, split_by_group }
    }

    pub fn part_count(&self) -> usize {
        self.objects
            .iter()
            .flat_map(|o| &o.geos)
            .map(|g| g.parts.len())
            .sum()
    }
}

/// Why a pass rebuilds every part from scratch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ResyncReason {
    /// No previous pass for this asset handle.
    FirstCook,
    /// The caller forced it.
    Requested,
    /// The asset was (re)loaded.
    AssetLoaded,
    /// A newly connected input with `syncWhenInputConnects` on.
    InputConnected,
    /// An output-affecting option changed.
    OptionsChanged,
    /// Object, part or element counts differ from the last pass.
    ShapeChanged,
}

impl fmt::Display for ResyncReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::FirstCook => "first cook",
            Self::Requested => "requested",
            Self::AssetLoaded => "asset loaded",
            Self::InputConnected => "input connected",
            Self::OptionsChanged => "options changed",
            Self::ShapeChanged => "shape changed",
        };
        f.write_str(s)
    }
}

/// How a pass treats the part cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Resync {
    Incremental,
    Full(ResyncReason),
}

impl Resync {
    /// Plan a pass. A pending reason wins over the signature comparison.
    pub fn plan(pending: Option<ResyncReason>, previous: Option<&ShapeSignature>, current: &ShapeSignature) -> Self {
        if let Some(reason) = pending {
            return Self::Full(reason);
        }
        match previous {
            None => Self::Full(ResyncReason::FirstCook),
            Some(prev) if prev != current => Self::Full(ResyncReason::ShapeChanged),
            Some(_) => Self::Incremental,
        }
    }

    pub fn is_full(self) -> bool {
        matches!(self, Self::Full(_))
    }
}

/// Record counts of an output tree. The host keeps one downstream node per
/// record, so a change here means those nodes must be rebuilt.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OutputLayout {
    objects: Vec<SmallVec<[usize; 4]>>,
}

impl OutputLayout {
    pub fn of(result: &CookResult) -> Self {
        let objects = result
            .objects
            .iter()
            .map(|o| match &o.content {
                ObjectContent::Geometry(geos) => geos.iter().map(|g| g.parts.len()).collect(),
                ObjectContent::Instancer(instancer) => std::iter::once(instancer.instanced_object_names.len()).collect(),
            })
            .collect();
        Self { objects }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{GeoInfo, GeoKind, ObjectInfo, PartId, PartInfo};
    use crate::geometry::GeoSnapshot;
    use crate::object::ObjectSnapshot;
    use crate::util::Transform;

    fn snapshot(points: usize) -> SceneSnapshot {
        let part = PartInfo {
            id: PartId(0),
            name: "p".into(),
            part_type: PartType::Mesh,
            face_count: 2,
            vertex_count: 6,
            point_count: points,
            is_instanced: false,
            instanced_part_count: 0,
            instance_count: 0,
        };
        let geo = GeoSnapshot {
            info: GeoInfo {
                id: GeoId(100),
                name: "geo".into(),
                kind: GeoKind::Default,
                is_templated: false,
                is_display_geo: true,
                has_geo_changed: true,
                has_material_changed: true,
                part_count: 1,
                point_group_count: 1,
                primitive_group_count: 0,
            },
            parts: vec![part],
        };
        SceneSnapshot {
            objects: vec![ObjectSnapshot {
                info: ObjectInfo {
                    id: ObjectId(1),
                    name: "obj".into(),
                    is_visible: true,
                    is_instancer: false,
                    is_instanced: false,
                    has_transform_changed: true,
                    have_geos_changed: true,
                    geo_count: 1,
                    object_to_instance: None,
                },
                transform: Transform::IDENTITY,
                geos: vec![geo],
            }],
        }
    }

    #[test]
    fn test_plan() {
        let a = ShapeSignature::of(&snapshot(4), false);
        let b = ShapeSignature::of(&snapshot(5), false);
        assert_eq!(a.part_count(), 1);
        assert_eq!(Resync::plan(None, None, &a), Resync::Full(ResyncReason::FirstCook));
        assert_eq!(Resync::plan(None, Some(&a), &a), Resync::Incremental);
        assert_eq!(Resync::plan(None, Some(&a), &b), Resync::Full(ResyncReason::ShapeChanged));
        assert_eq!(
            Resync::plan(Some(ResyncReason::Requested), Some(&a), &a),
            Resync::Full(ResyncReason::Requested)
        );
    }

    #[test]
    fn test_groups_count_only_when_splitting() {
        let off = ShapeSignature::of(&snapshot(4), false);
        let on = ShapeSignature::of(&snapshot(4), true);
        assert_eq!(off.objects[0].geos[0].groups, 0);
        assert_eq!(on.objects[0].geos[0].groups, 1);
        assert_ne!(off, on);
    }
}
