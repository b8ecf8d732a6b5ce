//! Info records returned by the engine after a cook.
//!
//! These are snapshots: they describe the cooked state at the time they were
//! queried and must be refreshed after every cook.

use serde::{Deserialize, Serialize};

use super::{GeoId, MaterialId, ObjectId, PartId};
use crate::util::{AttributeOwner, StorageType, Transform};

/// One cooked object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObjectInfo {
    pub id: ObjectId,
    pub name: String,
    /// Engine display flag.
    pub is_visible: bool,
    /// The object is a point instancer of other objects.
    pub is_instancer: bool,
    /// The object is instanced by some instancer object.
    pub is_instanced: bool,
    pub has_transform_changed: bool,
    pub have_geos_changed: bool,
    pub geo_count: usize,
    /// Object every instance refers to, when the instancer targets a single object.
    pub object_to_instance: Option<ObjectId>,
}

/// Kind of a geometry container.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeoKind {
    #[default]
    Default,
    Intermediate,
    Input,
    Curve,
}

/// One geometry container inside an object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoInfo {
    pub id: GeoId,
    pub name: String,
    pub kind: GeoKind,
    pub is_templated: bool,
    pub is_display_geo: bool,
    pub has_geo_changed: bool,
    pub has_material_changed: bool,
    pub part_count: usize,
    pub point_group_count: usize,
    pub primitive_group_count: usize,
}

impl GeoInfo {
    /// Total number of named groups across group types.
    pub fn group_count(&self) -> usize {
        self.point_group_count + self.primitive_group_count
    }
}

/// Engine-side part type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PartType {
    #[default]
    Mesh,
    Curve,
    Volume,
    Instancer,
    Box,
    Sphere,
    Invalid,
}

/// One part of a geometry container.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PartInfo {
    pub id: PartId,
    pub name: String,
    pub part_type: PartType,
    pub face_count: usize,
    pub vertex_count: usize,
    pub point_count: usize,
    /// The part is only drawn through an instancer part.
    pub is_instanced: bool,
    pub instanced_part_count: usize,
    pub instance_count: usize,
}

/// Curve primitive type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CurveType {
    #[default]
    Linear,
    Nurbs,
    Bezier,
}

/// Curve layout of a curve part.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CurveInfo {
    pub curve_type: CurveType,
    pub curve_count: usize,
    pub vertex_count: usize,
    pub knot_count: usize,
    pub is_periodic: bool,
    pub is_rational: bool,
    /// Constant order of every curve, or `None` when it varies per curve.
    pub order: Option<u32>,
    pub has_knots: bool,
}

/// Layout of a volume part.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VolumeInfo {
    pub name: String,
    pub resolution: [u32; 3],
    /// Index of the first voxel along each axis.
    pub min: [i32; 3],
    pub tuple_size: usize,
    pub storage: StorageType,
    pub tile_size: u32,
    /// Transform from the unit volume box to object space.
    pub transform: Transform,
}

impl VolumeInfo {
    /// Number of voxels in the dense grid.
    pub fn voxel_count(&self) -> usize {
        self.resolution.iter().map(|&r| r as usize).product()
    }
}

/// One tile of voxels. Values are x-fastest over a `tile_size`^3 cube.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VolumeTile {
    pub min: [i32; 3],
    pub values: Vec<f32>,
}

/// Material node description.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaterialInfo {
    pub id: MaterialId,
    pub exists: bool,
    pub has_changed: bool,
    pub name: String,
    pub path: String,
}

/// Attribute description.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeInfo {
    pub name: String,
    pub owner: AttributeOwner,
    pub storage: StorageType,
    pub tuple_size: usize,
    /// Number of tuples.
    pub count: usize,
}

/// Asset parameter description.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParmInfo {
    /// Engine-side parameter path.
    pub path: String,
    pub label: String,
    pub default: super::ParmValue,
}
