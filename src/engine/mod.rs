//! Boundary to the procedural engine.
//!
//! The pipeline never talks to an engine session directly; it goes through the
//! object-safe [`Engine`] trait. Everything behind it (asset loading, the cook
//! itself, error reporting) is a black box that hands back info records and
//! bulk attribute data once a cook has completed.
//!
//! [`memory::MemoryEngine`] implements the trait over an in-memory scene and
//! backs the test suite.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::util::{AttributeOwner, AttributeValues, GroupType, Result, Transform};

mod info;
pub mod memory;

pub use info::*;

macro_rules! engine_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

engine_id!(
    /// Live asset instance in the engine session.
    AssetId
);
engine_id!(
    /// Cooked object node.
    ObjectId
);
engine_id!(
    /// Cooked geometry node. Unique across the session.
    GeoId
);
engine_id!(
    /// Part index within a geometry.
    PartId
);
engine_id!(
    /// Material node.
    MaterialId
);

/// Value of an asset parameter. Tuples are stored flat.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ParmValue {
    Int(Vec<i32>),
    Float(Vec<f32>),
    String(Vec<String>),
    Toggle(bool),
}

impl ParmValue {
    /// First component as a float, if numeric.
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Self::Float(v) => v.first().copied(),
            Self::Int(v) => v.first().map(|&x| x as f32),
            Self::Toggle(b) => Some(if *b { 1.0 } else { 0.0 }),
            Self::String(_) => None,
        }
    }

    /// First three components as a color. Single values are splatted.
    pub fn as_color(&self) -> Option<glam::Vec3> {
        match self {
            Self::Float(v) if v.len() >= 3 => Some(glam::Vec3::new(v[0], v[1], v[2])),
            _ => self.as_f32().map(glam::Vec3::splat),
        }
    }

    /// First component as a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => v.first().map(String::as_str),
            _ => None,
        }
    }
}

/// Operations the pipeline consumes from the procedural engine.
///
/// Mutating calls (asset lifecycle, parameters, time, cook) take `&mut self`;
/// queries against the last cook take `&self`. Queries for entities that do
/// not exist return [`crate::Error::Engine`].
pub trait Engine {
    /// Instantiate the named asset from an asset library file.
    fn create_asset(&mut self, library: &Path, asset_name: &str) -> Result<AssetId>;
    /// Destroy a live asset instance.
    fn destroy_asset(&mut self, asset: AssetId) -> Result<()>;
    /// Whether the handle still refers to a live asset.
    fn is_asset_valid(&self, asset: AssetId) -> bool;

    /// Parameters exposed by the asset.
    fn parm_infos(&self, asset: AssetId) -> Result<Vec<ParmInfo>>;
    /// Current value of a parameter.
    fn parm_value(&self, asset: AssetId, path: &str) -> Result<ParmValue>;
    /// Set a parameter.
    fn set_parm_value(&mut self, asset: AssetId, path: &str, value: &ParmValue) -> Result<()>;
    /// Set the global cook time, in seconds.
    fn set_time(&mut self, time: f32) -> Result<()>;

    /// Cook synchronously. Failure carries the engine's reason as
    /// [`crate::Error::CookFailed`].
    fn cook(&mut self, asset: AssetId) -> Result<()>;

    /// Objects of the cooked asset, in engine order.
    fn object_infos(&self, asset: AssetId) -> Result<Vec<ObjectInfo>>;
    /// Object transform in engine space.
    fn object_transform(&self, object: ObjectId) -> Result<Transform>;
    /// Geometries of an object, in engine order.
    fn geo_infos(&self, object: ObjectId) -> Result<Vec<GeoInfo>>;
    /// Part description.
    fn part_info(&self, geo: GeoId, part: PartId) -> Result<PartInfo>;

    /// Vertex count of every face.
    fn face_counts(&self, geo: GeoId, part: PartId) -> Result<Vec<i32>>;
    /// Point index of every face-vertex.
    fn vertex_list(&self, geo: GeoId, part: PartId) -> Result<Vec<i32>>;

    /// Attribute names for one owner.
    fn attribute_names(&self, geo: GeoId, part: PartId, owner: AttributeOwner) -> Result<Vec<String>>;
    /// Attribute description, or `None` if it does not exist.
    fn attribute_info(
        &self,
        geo: GeoId,
        part: PartId,
        owner: AttributeOwner,
        name: &str,
    ) -> Result<Option<AttributeInfo>>;
    /// Bulk read of an attribute.
    fn attribute_data(
        &self,
        geo: GeoId,
        part: PartId,
        owner: AttributeOwner,
        name: &str,
    ) -> Result<AttributeValues>;

    /// Group names defined on a geometry.
    fn group_names(&self, geo: GeoId, group_type: GroupType) -> Result<Vec<String>>;
    /// Per-element membership flags of a group within one part.
    fn group_membership(
        &self,
        geo: GeoId,
        part: PartId,
        group_type: GroupType,
        name: &str,
    ) -> Result<Vec<bool>>;

    /// Curve layout.
    fn curve_info(&self, geo: GeoId, part: PartId) -> Result<CurveInfo>;
    /// Vertex count of every curve.
    fn curve_counts(&self, geo: GeoId, part: PartId) -> Result<Vec<i32>>;
    /// Order of every curve (only meaningful for varying order).
    fn curve_orders(&self, geo: GeoId, part: PartId) -> Result<Vec<i32>>;
    /// Knot vector of all curves, concatenated.
    fn curve_knots(&self, geo: GeoId, part: PartId) -> Result<Vec<f32>>;

    /// Volume layout.
    fn volume_info(&self, geo: GeoId, part: PartId) -> Result<VolumeInfo>;
    /// Every non-empty tile of a volume.
    fn volume_tiles(&self, geo: GeoId, part: PartId) -> Result<Vec<VolumeTile>>;

    /// Material assigned to a part, if any.
    fn part_material(&self, geo: GeoId, part: PartId) -> Result<Option<MaterialId>>;
    /// Material node description.
    fn material_info(&self, material: MaterialId) -> Result<MaterialInfo>;
    /// Material parameter, or `None` when the material has no such parameter.
    fn material_parm(&self, material: MaterialId, name: &str) -> Result<Option<ParmValue>>;

    /// Per-instance transforms of an instancer part.
    fn instancer_part_transforms(&self, geo: GeoId, part: PartId) -> Result<Vec<Transform>>;
    /// Per-instance index into [`Engine::instanced_part_ids`].
    fn instancer_reference_indices(&self, geo: GeoId, part: PartId) -> Result<Vec<i32>>;
    /// Parts an instancer part draws.
    fn instanced_part_ids(&self, geo: GeoId, part: PartId) -> Result<Vec<PartId>>;

    /// Per-point instance transforms of an instancer object.
    fn instance_transforms(&self, object: ObjectId, geo: GeoId) -> Result<Vec<Transform>>;
}
