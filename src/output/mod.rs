//! Output record tree exposed to the host.
//!
//! A [`CookResult`] mirrors the host node's output slots:
//! object array -> {transform, visibility, geometry or instancer} ->
//! part array -> {one of mesh/particle/curves/volume/instancer, material,
//! extra attributes, groups}.
//!
//! Records are plain data. Every type derives `Serialize` so a whole result
//! can be dumped as JSON.

use serde::Serialize;

use crate::engine::MaterialId;
use crate::util::{AttributeOwner, AttributeValues, GroupType, StorageType, TransformRecord, Vec3};

mod kinds;
mod select;

pub use kinds::*;
pub use select::ElementMap;

/// Translated output of one successful cook. Replaced wholesale per cook.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CookResult {
    /// Incremented by every successful cook of the owning node.
    pub generation: u64,
    pub objects: Vec<ObjectRecord>,
}

impl CookResult {
    pub fn object(&self, name: &str) -> Option<&ObjectRecord> {
        self.objects.iter().find(|o| o.name == name)
    }

    /// Total number of part records across all objects.
    pub fn part_count(&self) -> usize {
        self.objects
            .iter()
            .filter_map(|o| o.geometries())
            .flatten()
            .map(|g| g.parts.len())
            .sum()
    }
}

/// One cooked object.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ObjectRecord {
    pub name: String,
    pub transform: TransformRecord,
    pub visible: bool,
    pub is_instanced: bool,
    pub content: ObjectContent,
}

impl ObjectRecord {
    /// Geometry records, unless this is an instancer object.
    pub fn geometries(&self) -> Option<&[GeometryRecord]> {
        match &self.content {
            ObjectContent::Geometry(geos) => Some(geos),
            ObjectContent::Instancer(_) => None,
        }
    }

    pub fn instancer(&self) -> Option<&InstancerRecord> {
        match &self.content {
            ObjectContent::Instancer(i) => Some(i),
            ObjectContent::Geometry(_) => None,
        }
    }
}

/// What an object carries.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ObjectContent {
    Geometry(Vec<GeometryRecord>),
    Instancer(InstancerRecord),
}

/// One geometry container after policy filtering.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GeometryRecord {
    pub name: String,
    pub is_templated: bool,
    pub is_display_geo: bool,
    pub parts: Vec<PartRecord>,
}

/// Translated output of one part.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PartRecord {
    pub name: String,
    pub data: PartData,
    pub material: Option<MaterialRecord>,
    pub extra_attributes: Vec<ExtraAttribute>,
    pub groups: Vec<GroupRecord>,
}

impl PartRecord {
    /// Part record with no material, attributes or groups.
    pub fn new(name: impl Into<String>, data: PartData) -> Self {
        Self {
            name: name.into(),
            data,
            material: None,
            extra_attributes: Vec::new(),
            groups: Vec::new(),
        }
    }

    pub fn kind(&self) -> PartKind {
        self.data.kind()
    }

    pub fn extra_attribute(&self, name: &str) -> Option<&ExtraAttribute> {
        self.extra_attributes.iter().find(|a| a.name == name)
    }

    pub fn group(&self, name: &str) -> Option<&GroupRecord> {
        self.groups.iter().find(|g| g.name == name)
    }
}

/// Geometry representation of a part. Exactly one kind per part.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum PartData {
    Mesh(MeshRecord),
    Particle(ParticleRecord),
    Curves(CurvesRecord),
    Volume(VolumeRecord),
    Instancer(PartInstancerRecord),
}

impl PartData {
    pub fn kind(&self) -> PartKind {
        match self {
            Self::Mesh(_) => PartKind::Mesh,
            Self::Particle(_) => PartKind::Particle,
            Self::Curves(_) => PartKind::Curves,
            Self::Volume(_) => PartKind::Volume,
            Self::Instancer(_) => PartKind::Instancer,
        }
    }

    /// An empty record of the given kind.
    pub fn empty(kind: PartKind) -> Self {
        match kind {
            PartKind::Mesh => Self::Mesh(MeshRecord::default()),
            PartKind::Particle => Self::Particle(ParticleRecord::default()),
            PartKind::Curves => Self::Curves(CurvesRecord::default()),
            PartKind::Volume => Self::Volume(VolumeRecord::default()),
            PartKind::Instancer => Self::Instancer(PartInstancerRecord::default()),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Mesh(m) => m.is_empty(),
            Self::Particle(p) => p.positions.is_empty(),
            Self::Curves(c) => c.curves.is_empty(),
            Self::Volume(v) => v.grid.is_empty(),
            Self::Instancer(i) => i.transforms.is_empty(),
        }
    }

    pub fn as_mesh(&self) -> Option<&MeshRecord> {
        match self {
            Self::Mesh(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_particle(&self) -> Option<&ParticleRecord> {
        match self {
            Self::Particle(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_curves(&self) -> Option<&CurvesRecord> {
        match self {
            Self::Curves(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_volume(&self) -> Option<&VolumeRecord> {
        match self {
            Self::Volume(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_instancer(&self) -> Option<&PartInstancerRecord> {
        match self {
            Self::Instancer(i) => Some(i),
            _ => None,
        }
    }
}

/// Part kind tag, in selection priority order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PartKind {
    Instancer,
    Volume,
    Curves,
    Particle,
    Mesh,
}

impl PartKind {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Instancer => "instancer",
            Self::Volume => "volume",
            Self::Curves => "curves",
            Self::Particle => "particle",
            Self::Mesh => "mesh",
        }
    }
}

impl std::fmt::Display for PartKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Material assigned to a part.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MaterialRecord {
    pub node_id: MaterialId,
    pub name: String,
    pub path: String,
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub alpha: f32,
    pub texture_path: Option<String>,
}

/// Custom attribute passed through as raw tuples.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ExtraAttribute {
    pub name: String,
    pub owner: AttributeOwner,
    pub storage: StorageType,
    pub tuple_size: usize,
    pub data: AttributeValues,
}

impl ExtraAttribute {
    /// Number of tuples.
    pub fn len(&self) -> usize {
        self.data.len() / self.tuple_size.max(1)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Named group with the indices of its members.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GroupRecord {
    pub name: String,
    pub group_type: GroupType,
    pub members: Vec<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_part_data() {
        for kind in [
            PartKind::Mesh,
            PartKind::Particle,
            PartKind::Curves,
            PartKind::Volume,
            PartKind::Instancer,
        ] {
            let data = PartData::empty(kind);
            assert_eq!(data.kind(), kind);
            assert!(data.is_empty());
        }
    }

    #[test]
    fn test_kind_priority_order() {
        assert!(PartKind::Instancer < PartKind::Volume);
        assert!(PartKind::Volume < PartKind::Curves);
        assert!(PartKind::Curves < PartKind::Particle);
        assert!(PartKind::Particle < PartKind::Mesh);
    }

    #[test]
    fn test_result_serializes_to_json() {
        let result = CookResult {
            generation: 3,
            objects: vec![ObjectRecord {
                name: "obj".into(),
                transform: TransformRecord::IDENTITY,
                visible: true,
                is_instanced: false,
                content: ObjectContent::Geometry(vec![GeometryRecord {
                    name: "geo".into(),
                    is_templated: false,
                    is_display_geo: true,
                    parts: vec![PartRecord::new("p", PartData::empty(PartKind::Mesh))],
                }]),
            }],
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["generation"], 3);
        assert_eq!(json["objects"][0]["content"]["type"], "geometry");
        assert_eq!(json["objects"][0]["content"]["data"][0]["parts"][0]["data"]["kind"], "mesh");
        assert_eq!(result.part_count(), 1);
    }
}
