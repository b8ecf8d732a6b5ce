//! Per-kind part records.

use serde::Serialize;

use crate::engine::PartId;
use crate::util::{TransformRecord, Vec2, Vec3, Vec4};

/// Host name of the default UV set.
pub const DEFAULT_UV_SET: &str = "map1";
/// Host name of the color set built from `Cd`/`Alpha`.
pub const DEFAULT_COLOR_SET: &str = "colorSet1";

/// Polygon mesh. Face-vertex arrays follow host (counter-clockwise) winding.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct MeshRecord {
    pub positions: Vec<Vec3>,
    /// Vertex count of every face.
    pub face_counts: Vec<i32>,
    /// Point index of every face-vertex.
    pub face_indices: Vec<i32>,
    /// Per face-vertex normals.
    pub normals: Option<Vec<Vec3>>,
    pub uv_sets: Vec<UvSet>,
    pub current_uv_set: Option<String>,
    pub color_sets: Vec<ColorSet>,
    pub current_color_set: Option<String>,
}

impl MeshRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_points(&self) -> usize {
        self.positions.len()
    }

    pub fn num_faces(&self) -> usize {
        self.face_counts.len()
    }

    pub fn num_indices(&self) -> usize {
        self.face_indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() && self.face_counts.is_empty()
    }

    pub fn uv_set(&self, name: &str) -> Option<&UvSet> {
        self.uv_sets.iter().find(|s| s.name == name)
    }

    pub fn color_set(&self, name: &str) -> Option<&ColorSet> {
        self.color_sets.iter().find(|s| s.name == name)
    }

    /// Reset to the empty mesh, keeping buffer capacity.
    pub fn clear(&mut self) {
        self.positions.clear();
        self.face_counts.clear();
        self.face_indices.clear();
        self.normals = None;
        self.uv_sets.clear();
        self.current_uv_set = None;
        self.color_sets.clear();
        self.current_color_set = None;
    }
}

/// Per face-vertex UVs.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UvSet {
    pub name: String,
    pub uvs: Vec<Vec2>,
}

/// Per face-vertex RGBA colors.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ColorSet {
    pub name: String,
    pub colors: Vec<Vec4>,
}

/// Point cloud with the standard per-particle channels.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ParticleRecord {
    pub positions: Vec<Vec3>,
    /// Cook time the particles were evaluated at.
    pub current_time: f32,
    pub velocity: Option<Vec<Vec3>>,
    pub rgb_pp: Option<Vec<Vec3>>,
    pub opacity_pp: Option<Vec<f32>>,
    pub radius_pp: Option<Vec<f32>>,
    pub age_pp: Option<Vec<f32>>,
    pub lifespan_pp: Option<Vec<f32>>,
    pub particle_id: Option<Vec<i32>>,
}

impl ParticleRecord {
    pub fn count(&self) -> usize {
        self.positions.len()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// One curve.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CurveRecord {
    pub positions: Vec<Vec3>,
    pub order: u32,
    pub knots: Option<Vec<f32>>,
}

/// Set of curves from one part.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CurvesRecord {
    pub curves: Vec<CurveRecord>,
    pub is_bezier: bool,
    pub is_periodic: bool,
}

impl CurvesRecord {
    /// Total number of curve points.
    pub fn num_points(&self) -> usize {
        self.curves.iter().map(|c| c.positions.len()).sum()
    }
}

/// Dense scalar voxel grid.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct VolumeRecord {
    pub name: String,
    pub resolution: [u32; 3],
    /// Voxel values, x fastest, then y, then z.
    pub grid: Vec<f32>,
    /// Transform from the host's unit volume box to object space.
    pub transform: TransformRecord,
}

/// Instancer part: transforms referencing sibling parts.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PartInstancerRecord {
    pub transforms: Vec<TransformRecord>,
    /// Index into `instanced_parts`, one per transform.
    pub reference_indices: Vec<i32>,
    pub instanced_parts: Vec<PartId>,
}

impl PartInstancerRecord {
    pub fn count(&self) -> usize {
        self.transforms.len()
    }
}

/// One instance of an instancer object.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Instance {
    pub transform: TransformRecord,
    /// Name of the instanced object. Resolved by name lookup on the host side.
    pub object_name: String,
}

/// Point-instancer object.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct InstancerRecord {
    pub instances: Vec<Instance>,
    /// Distinct instanced object names, in first-use order.
    pub instanced_object_names: Vec<String>,
    /// Per-instance `instance` attribute values.
    pub instance_attribute: Option<Vec<String>>,
    /// Per-instance `name` attribute values.
    pub name_attribute: Option<Vec<String>>,
    /// Materialize with an instancer node rather than duplicated transforms.
    pub use_instancer_node: bool,
}

impl InstancerRecord {
    pub fn count(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mesh_clear() {
        let mut mesh = MeshRecord {
            positions: vec![Vec3::ZERO; 3],
            face_counts: vec![3],
            face_indices: vec![0, 1, 2],
            normals: Some(vec![Vec3::Z; 3]),
            uv_sets: vec![UvSet { name: DEFAULT_UV_SET.into(), uvs: vec![Vec2::ZERO; 3] }],
            current_uv_set: Some(DEFAULT_UV_SET.into()),
            ..Default::default()
        };
        assert!(!mesh.is_empty());
        assert!(mesh.uv_set("map1").is_some());
        mesh.clear();
        assert_eq!(mesh, MeshRecord::new());
    }

    #[test]
    fn test_curves_point_count() {
        let curves = CurvesRecord {
            curves: vec![
                CurveRecord { positions: vec![Vec3::ZERO; 4], order: 4, knots: None },
                CurveRecord { positions: vec![Vec3::ZERO; 2], order: 2, knots: None },
            ],
            is_bezier: false,
            is_periodic: false,
        };
        assert_eq!(curves.num_points(), 6);
    }
}
