//! Geometry assembly: the parts of one geometry container.
//!
//! Applies the display/template policy to the container, translates its
//! parts in engine order and optionally splits each part by its named groups.

use tracing::{debug, trace};

use crate::engine::{Engine, GeoInfo, GeoKind, ObjectId, PartId, PartInfo};
use crate::options::AssetNodeOptions;
use crate::output::{GeometryRecord, PartRecord};
use crate::part::{PartKey, PartPass};
use crate::util::Result;

/// Info records of one geometry container, refreshed once per cook.
#[derive(Clone, Debug, PartialEq)]
pub struct GeoSnapshot {
    pub info: GeoInfo,
    pub parts: Vec<PartInfo>,
}

impl GeoSnapshot {
    /// Query the part infos of a geometry.
    pub fn capture(engine: &dyn Engine, info: GeoInfo) -> Result<Self> {
        let parts = (0..info.part_count)
            .map(|i| engine.part_info(info.id, PartId(i as u32)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { info, parts })
    }
}

/// Whether a geometry container is output under the given policy.
///
/// Input geometries never are. Templated geometries need
/// `output_templated_geometries`. Geometries that are not display
/// geometries need `output_hidden_objects`, unless they are templated
/// geometries that are being output.
pub fn geometry_visible(geo: &GeoInfo, options: &AssetNodeOptions) -> bool {
    if geo.kind == GeoKind::Input {
        return false;
    }
    if geo.is_templated {
        return options.output_templated_geometries;
    }
    geo.is_display_geo || options.output_hidden_objects
}

/// Split a part into one record per named group plus the remainder.
///
/// Every group the part reports yields a record named `<part>_<group>`, empty
/// when the group maps to no primary-domain element. The remainder (elements
/// in no group) keeps the part's name and comes last. A part with G groups
/// yields G + 1 records.
pub fn split_by_groups(record: &PartRecord) -> Vec<PartRecord> {
    let mut in_any = vec![false; record.element_count()];
    let mut subsets = Vec::with_capacity(record.groups.len() + 1);
    for group in &record.groups {
        let elements = record.group_elements(group);
        if elements.is_empty() {
            trace!(part = %record.name, group = %group.name, "group selects no elements, emitted empty");
        }
        for &e in &elements {
            in_any[e] = true;
        }
        subsets.push(record.select(&subset_name(&record.name, &group.name), &elements));
    }
    let remainder: Vec<usize> = (0..in_any.len()).filter(|&e| !in_any[e]).collect();
    subsets.push(record.select(&record.name, &remainder));
    subsets
}

fn subset_name(part: &str, group: &str) -> String {
    format!("{part}_{group}")
}

/// Assembles geometry records under a policy.
#[derive(Clone, Copy, Debug)]
pub struct GeometryAssembler<'o> {
    options: &'o AssetNodeOptions,
}

impl<'o> GeometryAssembler<'o> {
    pub fn new(options: &'o AssetNodeOptions) -> Self {
        Self { options }
    }

    /// Translate a geometry's parts. `None` when the policy filters the
    /// geometry out.
    pub fn assemble(&self, object: ObjectId, geo: &GeoSnapshot, pass: &mut PartPass<'_>) -> Option<GeometryRecord> {
        if !geometry_visible(&geo.info, self.options) {
            debug!(geo = %geo.info.name, templated = geo.info.is_templated, display = geo.info.is_display_geo, "geometry filtered out");
            return None;
        }

        let mut parts = Vec::with_capacity(geo.parts.len());
        for info in &geo.parts {
            let key = PartKey::new(object, geo.info.id, info.id);
            let state = pass.translate(key, &geo.info, info);
            if self.options.split_geos_by_group {
                parts.extend(split_by_groups(&state.record));
            } else {
                parts.push(state.record.clone());
            }
        }

        Some(GeometryRecord {
            name: geo.info.name.clone(),
            is_templated: geo.info.is_templated,
            is_display_geo: geo.info.is_display_geo,
            parts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::GeoId;
    use crate::output::{GroupRecord, MeshRecord, PartData, ParticleRecord};
    use crate::util::{GroupType, Vec3};

    fn geo(templated: bool, display: bool) -> GeoInfo {
        GeoInfo {
            id: GeoId(1),
            name: "geo".into(),
            kind: GeoKind::Default,
            is_templated: templated,
            is_display_geo: display,
            has_geo_changed: true,
            has_material_changed: true,
            part_count: 0,
            point_group_count: 0,
            primitive_group_count: 0,
        }
    }

    #[test]
    fn test_geometry_policy() {
        let defaults = AssetNodeOptions::default();
        let all = AssetNodeOptions {
            output_hidden_objects: true,
            output_templated_geometries: true,
            ..Default::default()
        };
        assert!(geometry_visible(&geo(false, true), &defaults));
        assert!(!geometry_visible(&geo(true, true), &defaults));
        assert!(!geometry_visible(&geo(false, false), &defaults));
        assert!(geometry_visible(&geo(true, false), &all));
        assert!(geometry_visible(&geo(false, false), &all));

        let mut input = geo(false, true);
        input.kind = GeoKind::Input;
        assert!(!geometry_visible(&input, &all));
    }

    fn grid_part(groups: Vec<GroupRecord>) -> PartRecord {
        let mesh = MeshRecord {
            positions: vec![Vec3::ZERO; 6],
            face_counts: vec![3, 3, 3],
            face_indices: vec![0, 1, 2, 2, 3, 4, 3, 4, 5],
            ..Default::default()
        };
        let mut part = PartRecord::new("grid", PartData::Mesh(mesh));
        part.groups = groups;
        part
    }

    #[test]
    fn test_split_cardinality() {
        let groups = vec![
            GroupRecord { name: "a".into(), group_type: GroupType::Primitive, members: vec![0] },
            GroupRecord { name: "b".into(), group_type: GroupType::Primitive, members: vec![1] },
        ];
        let split = split_by_groups(&grid_part(groups));
        assert_eq!(split.len(), 3);
        assert_eq!(split[0].name, "grid_a");
        assert_eq!(split[1].name, "grid_b");
        assert_eq!(split[2].name, "grid");
        assert_eq!(split[2].data.as_mesh().unwrap().face_counts, vec![3]);

        let single = split_by_groups(&grid_part(Vec::new()));
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].data, grid_part(Vec::new()).data);
    }

    #[test]
    fn test_split_overlapping_groups() {
        let groups = vec![
            GroupRecord { name: "a".into(), group_type: GroupType::Primitive, members: vec![0, 1] },
            GroupRecord { name: "b".into(), group_type: GroupType::Primitive, members: vec![1, 2] },
        ];
        let split = split_by_groups(&grid_part(groups));
        assert_eq!(split.len(), 3);
        assert!(split[2].data.as_mesh().unwrap().is_empty());
    }

    #[test]
    fn test_split_particles_by_point_group() {
        let particles = ParticleRecord { positions: vec![Vec3::ZERO, Vec3::X, Vec3::Y], ..Default::default() };
        let mut part = PartRecord::new("pts", PartData::Particle(particles));
        part.groups.push(GroupRecord { name: "first".into(), group_type: GroupType::Point, members: vec![0] });
        let split = split_by_groups(&part);
        assert_eq!(split.len(), 2);
        assert_eq!(split[0].data.as_particle().unwrap().count(), 1);
        assert_eq!(split[1].data.as_particle().unwrap().count(), 2);
    }

    #[test]
    fn test_split_keeps_groups_that_select_nothing() {
        // Point 0 alone covers no whole face.
        let groups = vec![GroupRecord { name: "corner".into(), group_type: GroupType::Point, members: vec![0] }];
        let split = split_by_groups(&grid_part(groups));
        assert_eq!(split.len(), 2);
        assert_eq!(split[0].name, "grid_corner");
        assert!(split[0].data.as_mesh().unwrap().is_empty());
        assert_eq!(split[1].data.as_mesh().unwrap().num_faces(), 3);
    }

    #[test]
    fn test_split_names_are_unique_across_parts() {
        let group = GroupRecord { name: "top".into(), group_type: GroupType::Primitive, members: vec![0] };
        let mut a = grid_part(vec![group.clone()]);
        a.name = "a".into();
        let mut b = grid_part(vec![group]);
        b.name = "b".into();
        let names: Vec<String> = split_by_groups(&a)
            .into_iter()
            .chain(split_by_groups(&b))
            .map(|p| p.name)
            .collect();
        assert_eq!(names, ["a_top", "a", "b_top", "b"]);
    }
}
