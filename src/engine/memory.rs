//! In-memory engine.
//!
//! [`MemoryEngine`] serves asset definitions built with the `Memory*` builder
//! types. It behaves like a real session where the pipeline can observe it:
//! queries reflect the last successful cook only, change flags are reported
//! per cook, and a cook can be made to fail on demand.
//!
//! The engine is a cheap handle around shared state, so a test can keep a
//! clone to edit definitions and read [`EngineStats`] while the pipeline owns
//! another clone.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

use super::*;
use crate::util::{Error, Vec3};

const OBJECT_STRIDE: u32 = 1000;
const GEO_STRIDE: u32 = 100;

/// Call counters, for asserting which engine work a pass performed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub assets_created: usize,
    pub assets_destroyed: usize,
    pub parm_sets: usize,
    pub time_sets: usize,
    pub cooks: usize,
    pub material_info_queries: usize,
}

/// One named attribute.
#[derive(Clone, Debug, PartialEq)]
pub struct MemoryAttribute {
    pub owner: AttributeOwner,
    pub name: String,
    pub tuple_size: usize,
    pub values: AttributeValues,
}

/// One named group with a membership flag per element.
#[derive(Clone, Debug, PartialEq)]
pub struct MemoryGroup {
    pub group_type: GroupType,
    pub name: String,
    pub members: Vec<bool>,
}

/// Curve payload of a curve part.
#[derive(Clone, Debug, PartialEq)]
pub struct MemoryCurves {
    pub curve_type: CurveType,
    pub counts: Vec<i32>,
    pub order: Option<u32>,
    pub orders: Vec<i32>,
    pub knots: Vec<f32>,
    pub is_periodic: bool,
}

/// Volume payload of a volume part.
#[derive(Clone, Debug, PartialEq)]
pub struct MemoryVolume {
    pub info: VolumeInfo,
    pub tiles: Vec<VolumeTile>,
    /// Make tile reads fail.
    pub unreadable: bool,
}

/// Instancer payload of an instancer part.
#[derive(Clone, Debug, PartialEq)]
pub struct MemoryPartInstancer {
    pub transforms: Vec<Transform>,
    pub reference_indices: Vec<i32>,
    pub instanced_parts: Vec<PartId>,
}

/// A part definition.
#[derive(Clone, Debug, PartialEq)]
pub struct MemoryPart {
    pub name: String,
    pub part_type: PartType,
    pub point_count: usize,
    pub face_counts: Vec<i32>,
    pub vertex_list: Vec<i32>,
    pub attributes: Vec<MemoryAttribute>,
    pub groups: Vec<MemoryGroup>,
    pub material: Option<MaterialId>,
    pub curves: Option<MemoryCurves>,
    pub volume: Option<MemoryVolume>,
    pub instancer: Option<MemoryPartInstancer>,
    pub is_instanced: bool,
}

impl MemoryPart {
    fn empty(name: &str, part_type: PartType) -> Self {
        Self {
            name: name.to_string(),
            part_type,
            point_count: 0,
            face_counts: Vec::new(),
            vertex_list: Vec::new(),
            attributes: Vec::new(),
            groups: Vec::new(),
            material: None,
            curves: None,
            volume: None,
            instancer: None,
            is_instanced: false,
        }
    }

    fn with_positions(mut self, positions: &[Vec3]) -> Self {
        self.point_count = positions.len();
        let flat = positions.iter().flat_map(|p| p.to_array()).collect();
        self.with_attribute(AttributeOwner::Point, "P", 3, AttributeValues::Float(flat))
    }

    /// Polygon mesh part.
    pub fn mesh(name: &str, positions: &[Vec3], face_counts: Vec<i32>, vertex_list: Vec<i32>) -> Self {
        let mut part = Self::empty(name, PartType::Mesh).with_positions(positions);
        part.face_counts = face_counts;
        part.vertex_list = vertex_list;
        part
    }

    /// Point cloud part: a mesh part without faces.
    pub fn particles(name: &str, positions: &[Vec3]) -> Self {
        Self::empty(name, PartType::Mesh).with_positions(positions)
    }

    /// Curve part; `counts` holds the point count of every curve.
    pub fn curves(name: &str, curve_type: CurveType, counts: Vec<i32>, positions: &[Vec3], order: Option<u32>) -> Self {
        let mut part = Self::empty(name, PartType::Curve).with_positions(positions);
        part.curves = Some(MemoryCurves {
            curve_type,
            counts,
            order,
            orders: Vec::new(),
            knots: Vec::new(),
            is_periodic: false,
        });
        part
    }

    /// Volume part.
    pub fn volume(name: &str, info: VolumeInfo, tiles: Vec<VolumeTile>) -> Self {
        let mut part = Self::empty(name, PartType::Volume);
        part.point_count = 1;
        part.volume = Some(MemoryVolume { info, tiles, unreadable: false });
        part
    }

    /// Instancer part.
    pub fn instancer(
        name: &str,
        transforms: Vec<Transform>,
        reference_indices: Vec<i32>,
        instanced_parts: Vec<PartId>,
    ) -> Self {
        let mut part = Self::empty(name, PartType::Instancer);
        part.point_count = transforms.len();
        part.instancer = Some(MemoryPartInstancer { transforms, reference_indices, instanced_parts });
        part
    }

    /// Add (or replace) an attribute.
    pub fn with_attribute(mut self, owner: AttributeOwner, name: &str, tuple_size: usize, values: AttributeValues) -> Self {
        self.attributes.retain(|a| !(a.owner == owner && a.name == name));
        self.attributes.push(MemoryAttribute {
            owner,
            name: name.to_string(),
            tuple_size,
            values,
        });
        self
    }

    /// Add a group from the indices of its members.
    pub fn with_group(mut self, group_type: GroupType, name: &str, members: &[usize]) -> Self {
        let len = match group_type {
            GroupType::Point => self.point_count,
            GroupType::Primitive => self.primitive_count(),
        };
        let mut flags = vec![false; len];
        for &m in members {
            if let Some(f) = flags.get_mut(m) {
                *f = true;
            }
        }
        self.groups.push(MemoryGroup {
            group_type,
            name: name.to_string(),
            members: flags,
        });
        self
    }

    /// Assign a material.
    pub fn with_material(mut self, material: MaterialId) -> Self {
        self.material = Some(material);
        self
    }

    /// Set per-curve orders (for varying-order curves).
    pub fn with_curve_orders(mut self, orders: Vec<i32>) -> Self {
        if let Some(c) = self.curves.as_mut() {
            c.orders = orders;
        }
        self
    }

    /// Set the concatenated knot vector.
    pub fn with_knots(mut self, knots: Vec<f32>) -> Self {
        if let Some(c) = self.curves.as_mut() {
            c.knots = knots;
        }
        self
    }

    /// Make the volume's tiles unreadable.
    pub fn with_unreadable_tiles(mut self) -> Self {
        if let Some(v) = self.volume.as_mut() {
            v.unreadable = true;
        }
        self
    }

    /// Flag the part as drawn only through an instancer.
    pub fn instanced(mut self) -> Self {
        self.is_instanced = true;
        self
    }

    fn primitive_count(&self) -> usize {
        match self.part_type {
            PartType::Curve => self.curves.as_ref().map_or(0, |c| c.counts.len()),
            PartType::Volume => 1,
            _ => self.face_counts.len(),
        }
    }

    fn vertex_count(&self) -> usize {
        match &self.curves {
            Some(c) => c.counts.iter().map(|&n| n.max(0) as usize).sum(),
            None => self.vertex_list.len(),
        }
    }

    fn info(&self, id: PartId) -> PartInfo {
        let (instance_count, instanced_part_count) = self
            .instancer
            .as_ref()
            .map_or((0, 0), |i| (i.transforms.len(), i.instanced_parts.len()));
        PartInfo {
            id,
            name: self.name.clone(),
            part_type: self.part_type,
            face_count: self.primitive_count(),
            vertex_count: self.vertex_count(),
            point_count: self.point_count,
            is_instanced: self.is_instanced,
            instanced_part_count,
            instance_count,
        }
    }
}

/// A geometry definition.
#[derive(Clone, Debug, PartialEq)]
pub struct MemoryGeo {
    pub name: String,
    pub kind: GeoKind,
    pub is_templated: bool,
    pub is_display_geo: bool,
    pub parts: Vec<MemoryPart>,
}

impl MemoryGeo {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: GeoKind::Default,
            is_templated: false,
            is_display_geo: true,
            parts: Vec::new(),
        }
    }

    pub fn with_part(mut self, part: MemoryPart) -> Self {
        self.parts.push(part);
        self
    }

    pub fn templated(mut self) -> Self {
        self.is_templated = true;
        self
    }

    pub fn not_displayed(mut self) -> Self {
        self.is_display_geo = false;
        self.kind = GeoKind::Intermediate;
        self
    }

    fn group_names(&self, group_type: GroupType) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for group in self.parts.iter().flat_map(|p| &p.groups) {
            if group.group_type == group_type && !names.contains(&group.name) {
                names.push(group.name.clone());
            }
        }
        names
    }
}

/// An object definition.
#[derive(Clone, Debug, PartialEq)]
pub struct MemoryObject {
    pub name: String,
    pub is_visible: bool,
    pub is_instancer: bool,
    pub is_instanced: bool,
    pub transform: Transform,
    /// Index (within the asset) of the single object every instance refers to.
    pub object_to_instance: Option<usize>,
    pub instance_transforms: Vec<Transform>,
    pub geos: Vec<MemoryGeo>,
}

impl MemoryObject {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            is_visible: true,
            is_instancer: false,
            is_instanced: false,
            transform: Transform::IDENTITY,
            object_to_instance: None,
            instance_transforms: Vec::new(),
            geos: Vec::new(),
        }
    }

    pub fn with_geo(mut self, geo: MemoryGeo) -> Self {
        self.geos.push(geo);
        self
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.is_visible = false;
        self
    }

    pub fn instanced(mut self) -> Self {
        self.is_instanced = true;
        self
    }

    /// Turn the object into a point instancer. Targets come either from
    /// `object_to_instance` or from an `instance` point attribute on the
    /// object's first geometry part.
    pub fn instancer(mut self, transforms: Vec<Transform>, object_to_instance: Option<usize>) -> Self {
        self.is_instancer = true;
        self.instance_transforms = transforms;
        self.object_to_instance = object_to_instance;
        self
    }
}

/// A material definition.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MemoryMaterial {
    pub name: String,
    pub path: String,
    pub parms: BTreeMap<String, ParmValue>,
}

impl MemoryMaterial {
    pub fn new(name: &str, path: &str) -> Self {
        Self {
            name: name.to_string(),
            path: path.to_string(),
            parms: BTreeMap::new(),
        }
    }

    pub fn with_parm(mut self, name: &str, value: ParmValue) -> Self {
        self.parms.insert(name.to_string(), value);
        self
    }
}

/// A loadable asset definition.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AssetDefinition {
    pub parms: Vec<ParmInfo>,
    pub objects: Vec<MemoryObject>,
}

impl AssetDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parm(mut self, path: &str, default: ParmValue) -> Self {
        self.parms.push(ParmInfo {
            path: path.to_string(),
            label: path.to_string(),
            default,
        });
        self
    }

    pub fn with_object(mut self, object: MemoryObject) -> Self {
        self.objects.push(object);
        self
    }
}

type LibraryKey = (PathBuf, String);

#[derive(Debug)]
struct CookedAsset {
    definition: AssetDefinition,
    geo_changed: bool,
    material_changed: bool,
}

#[derive(Debug)]
struct LiveAsset {
    key: LibraryKey,
    parms: BTreeMap<String, ParmValue>,
    geometry_dirty: bool,
    material_dirty: bool,
    cooked: Option<CookedAsset>,
}

#[derive(Debug, Default)]
struct MemoryScene {
    library: HashMap<LibraryKey, AssetDefinition>,
    materials: BTreeMap<MaterialId, MemoryMaterial>,
    live: BTreeMap<AssetId, LiveAsset>,
    next_asset: u32,
    time: f32,
    fail_next_cook: Option<String>,
    stats: EngineStats,
}

impl MemoryScene {
    fn cooked(&self, asset: AssetId) -> Result<&CookedAsset> {
        self.live
            .get(&asset)
            .and_then(|a| a.cooked.as_ref())
            .ok_or_else(|| Error::engine(format!("asset {asset} has not been cooked")))
    }

    fn object(&self, object: ObjectId) -> Result<(&CookedAsset, &MemoryObject)> {
        let asset = AssetId(object.0 / OBJECT_STRIDE);
        let cooked = self.cooked(asset)?;
        let obj = cooked
            .definition
            .objects
            .get((object.0 % OBJECT_STRIDE) as usize)
            .ok_or_else(|| Error::engine(format!("no object {object}")))?;
        Ok((cooked, obj))
    }

    fn geo(&self, geo: GeoId) -> Result<(&CookedAsset, &MemoryGeo)> {
        let (cooked, obj) = self.object(ObjectId(geo.0 / GEO_STRIDE))?;
        let g = obj
            .geos
            .get((geo.0 % GEO_STRIDE) as usize)
            .ok_or_else(|| Error::engine(format!("no geo {geo}")))?;
        Ok((cooked, g))
    }

    fn part(&self, geo: GeoId, part: PartId) -> Result<&MemoryPart> {
        let (_, g) = self.geo(geo)?;
        g.parts
            .get(part.0 as usize)
            .ok_or_else(|| Error::engine(format!("no part {part} on geo {geo}")))
    }

    fn mark_dirty(&mut self, key: &LibraryKey) {
        for live in self.live.values_mut().filter(|l| &l.key == key) {
            live.geometry_dirty = true;
        }
    }
}

/// In-memory engine session.
#[derive(Clone, Debug, Default)]
pub struct MemoryEngine {
    scene: Arc<RwLock<MemoryScene>>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an asset definition under a library path and asset name.
    pub fn define_asset(&self, library: impl Into<PathBuf>, name: &str, definition: AssetDefinition) {
        let key = (library.into(), name.to_string());
        let mut scene = self.scene.write();
        scene.mark_dirty(&key);
        scene.library.insert(key, definition);
    }

    /// Edit a registered definition. Live instances report changed geometry on
    /// their next cook.
    pub fn edit_asset(&self, library: impl Into<PathBuf>, name: &str, edit: impl FnOnce(&mut AssetDefinition)) {
        let key = (library.into(), name.to_string());
        let mut scene = self.scene.write();
        if let Some(def) = scene.library.get_mut(&key) {
            edit(def);
            scene.mark_dirty(&key);
        }
    }

    /// Register or replace a material. Live instances report changed materials
    /// on their next cook.
    pub fn set_material(&self, id: MaterialId, material: MemoryMaterial) {
        let mut scene = self.scene.write();
        scene.materials.insert(id, material);
        for live in scene.live.values_mut() {
            live.material_dirty = true;
        }
    }

    /// Make the next cook fail with the given reason.
    pub fn fail_next_cook(&self, reason: &str) {
        self.scene.write().fail_next_cook = Some(reason.to_string());
    }

    /// Destroy a live asset behind the pipeline's back.
    pub fn kill_asset(&self, asset: AssetId) {
        self.scene.write().live.remove(&asset);
    }

    /// Current call counters.
    pub fn stats(&self) -> EngineStats {
        self.scene.read().stats
    }

    /// Current cook time.
    pub fn time(&self) -> f32 {
        self.scene.read().time
    }
}

impl Engine for MemoryEngine {
    fn create_asset(&mut self, library: &Path, asset_name: &str) -> Result<AssetId> {
        let mut scene = self.scene.write();
        let key = (library.to_path_buf(), asset_name.to_string());
        let def = scene
            .library
            .get(&key)
            .ok_or_else(|| Error::engine(format!("asset {asset_name} not found in {}", library.display())))?;
        let parms = def.parms.iter().map(|p| (p.path.clone(), p.default.clone())).collect();
        scene.next_asset += 1;
        let id = AssetId(scene.next_asset);
        scene.live.insert(
            id,
            LiveAsset {
                key,
                parms,
                geometry_dirty: true,
                material_dirty: true,
                cooked: None,
            },
        );
        scene.stats.assets_created += 1;
        Ok(id)
    }

    fn destroy_asset(&mut self, asset: AssetId) -> Result<()> {
        let mut scene = self.scene.write();
        scene
            .live
            .remove(&asset)
            .ok_or_else(|| Error::engine(format!("asset {asset} is not live")))?;
        scene.stats.assets_destroyed += 1;
        Ok(())
    }

    fn is_asset_valid(&self, asset: AssetId) -> bool {
        self.scene.read().live.contains_key(&asset)
    }

    fn parm_infos(&self, asset: AssetId) -> Result<Vec<ParmInfo>> {
        let scene = self.scene.read();
        let live = scene.live.get(&asset).ok_or(Error::AssetInvalid)?;
        Ok(scene.library.get(&live.key).map(|d| d.parms.clone()).unwrap_or_default())
    }

    fn parm_value(&self, asset: AssetId, path: &str) -> Result<ParmValue> {
        let scene = self.scene.read();
        let live = scene.live.get(&asset).ok_or(Error::AssetInvalid)?;
        live.parms
            .get(path)
            .cloned()
            .ok_or_else(|| Error::engine(format!("no parameter {path}")))
    }

    fn set_parm_value(&mut self, asset: AssetId, path: &str, value: &ParmValue) -> Result<()> {
        let mut scene = self.scene.write();
        let live = scene.live.get_mut(&asset).ok_or(Error::AssetInvalid)?;
        let slot = live
            .parms
            .get_mut(path)
            .ok_or_else(|| Error::engine(format!("no parameter {path}")))?;
        *slot = value.clone();
        live.geometry_dirty = true;
        scene.stats.parm_sets += 1;
        Ok(())
    }

    fn set_time(&mut self, time: f32) -> Result<()> {
        let mut scene = self.scene.write();
        scene.time = time;
        for live in scene.live.values_mut() {
            live.geometry_dirty = true;
        }
        scene.stats.time_sets += 1;
        Ok(())
    }

    fn cook(&mut self, asset: AssetId) -> Result<()> {
        let mut scene = self.scene.write();
        scene.stats.cooks += 1;
        if let Some(reason) = scene.fail_next_cook.take() {
            return Err(Error::CookFailed(reason));
        }
        let key = scene.live.get(&asset).ok_or(Error::AssetInvalid)?.key.clone();
        let definition = scene
            .library
            .get(&key)
            .cloned()
            .ok_or_else(|| Error::CookFailed(format!("definition of {} was removed", key.1)))?;
        let live = scene.live.get_mut(&asset).ok_or(Error::AssetInvalid)?;
        live.cooked = Some(CookedAsset {
            definition,
            geo_changed: live.geometry_dirty,
            material_changed: live.material_dirty,
        });
        live.geometry_dirty = false;
        live.material_dirty = false;
        Ok(())
    }

    fn object_infos(&self, asset: AssetId) -> Result<Vec<ObjectInfo>> {
        let scene = self.scene.read();
        let cooked = scene.cooked(asset)?;
        let objects = &cooked.definition.objects;
        Ok(objects
            .iter()
            .enumerate()
            .map(|(i, o)| ObjectInfo {
                id: ObjectId(asset.0 * OBJECT_STRIDE + i as u32),
                name: o.name.clone(),
                is_visible: o.is_visible,
                is_instancer: o.is_instancer,
                is_instanced: o.is_instanced,
                has_transform_changed: cooked.geo_changed,
                have_geos_changed: cooked.geo_changed,
                geo_count: o.geos.len(),
                object_to_instance: o
                    .object_to_instance
                    .filter(|&t| t < objects.len())
                    .map(|t| ObjectId(asset.0 * OBJECT_STRIDE + t as u32)),
            })
            .collect())
    }

    fn object_transform(&self, object: ObjectId) -> Result<Transform> {
        let scene = self.scene.read();
        Ok(scene.object(object)?.1.transform)
    }

    fn geo_infos(&self, object: ObjectId) -> Result<Vec<GeoInfo>> {
        let scene = self.scene.read();
        let (cooked, obj) = scene.object(object)?;
        Ok(obj
            .geos
            .iter()
            .enumerate()
            .map(|(i, g)| GeoInfo {
                id: GeoId(object.0 * GEO_STRIDE + i as u32),
                name: g.name.clone(),
                kind: g.kind,
                is_templated: g.is_templated,
                is_display_geo: g.is_display_geo,
                has_geo_changed: cooked.geo_changed,
                has_material_changed: cooked.material_changed,
                part_count: g.parts.len(),
                point_group_count: g.group_names(GroupType::Point).len(),
                primitive_group_count: g.group_names(GroupType::Primitive).len(),
            })
            .collect())
    }

    fn part_info(&self, geo: GeoId, part: PartId) -> Result<PartInfo> {
        Ok(self.scene.read().part(geo, part)?.info(part))
    }

    fn face_counts(&self, geo: GeoId, part: PartId) -> Result<Vec<i32>> {
        Ok(self.scene.read().part(geo, part)?.face_counts.clone())
    }

    fn vertex_list(&self, geo: GeoId, part: PartId) -> Result<Vec<i32>> {
        Ok(self.scene.read().part(geo, part)?.vertex_list.clone())
    }

    fn attribute_names(&self, geo: GeoId, part: PartId, owner: AttributeOwner) -> Result<Vec<String>> {
        let scene = self.scene.read();
        Ok(scene
            .part(geo, part)?
            .attributes
            .iter()
            .filter(|a| a.owner == owner)
            .map(|a| a.name.clone())
            .collect())
    }

    fn attribute_info(&self, geo: GeoId, part: PartId, owner: AttributeOwner, name: &str) -> Result<Option<AttributeInfo>> {
        let scene = self.scene.read();
        Ok(scene
            .part(geo, part)?
            .attributes
            .iter()
            .find(|a| a.owner == owner && a.name == name)
            .map(|a| AttributeInfo {
                name: a.name.clone(),
                owner,
                storage: a.values.storage(),
                tuple_size: a.tuple_size,
                count: a.values.len() / a.tuple_size.max(1),
            }))
    }

    fn attribute_data(&self, geo: GeoId, part: PartId, owner: AttributeOwner, name: &str) -> Result<AttributeValues> {
        let scene = self.scene.read();
        scene
            .part(geo, part)?
            .attributes
            .iter()
            .find(|a| a.owner == owner && a.name == name)
            .map(|a| a.values.clone())
            .ok_or_else(|| Error::missing(owner, name))
    }

    fn group_names(&self, geo: GeoId, group_type: GroupType) -> Result<Vec<String>> {
        Ok(self.scene.read().geo(geo)?.1.group_names(group_type))
    }

    fn group_membership(&self, geo: GeoId, part: PartId, group_type: GroupType, name: &str) -> Result<Vec<bool>> {
        let scene = self.scene.read();
        let p = scene.part(geo, part)?;
        let len = match group_type {
            GroupType::Point => p.point_count,
            GroupType::Primitive => p.primitive_count(),
        };
        Ok(p.groups
            .iter()
            .find(|g| g.group_type == group_type && g.name == name)
            .map(|g| g.members.clone())
            .unwrap_or_else(|| vec![false; len]))
    }

    fn curve_info(&self, geo: GeoId, part: PartId) -> Result<CurveInfo> {
        let scene = self.scene.read();
        let p = scene.part(geo, part)?;
        let c = p
            .curves
            .as_ref()
            .ok_or_else(|| Error::engine(format!("part {part} is not a curve part")))?;
        Ok(CurveInfo {
            curve_type: c.curve_type,
            curve_count: c.counts.len(),
            vertex_count: p.vertex_count(),
            knot_count: c.knots.len(),
            is_periodic: c.is_periodic,
            is_rational: false,
            order: c.order,
            has_knots: !c.knots.is_empty(),
        })
    }

    fn curve_counts(&self, geo: GeoId, part: PartId) -> Result<Vec<i32>> {
        let scene = self.scene.read();
        Ok(scene.part(geo, part)?.curves.as_ref().map(|c| c.counts.clone()).unwrap_or_default())
    }

    fn curve_orders(&self, geo: GeoId, part: PartId) -> Result<Vec<i32>> {
        let scene = self.scene.read();
        Ok(scene.part(geo, part)?.curves.as_ref().map(|c| c.orders.clone()).unwrap_or_default())
    }

    fn curve_knots(&self, geo: GeoId, part: PartId) -> Result<Vec<f32>> {
        let scene = self.scene.read();
        Ok(scene.part(geo, part)?.curves.as_ref().map(|c| c.knots.clone()).unwrap_or_default())
    }

    fn volume_info(&self, geo: GeoId, part: PartId) -> Result<VolumeInfo> {
        let scene = self.scene.read();
        scene
            .part(geo, part)?
            .volume
            .as_ref()
            .map(|v| v.info.clone())
            .ok_or_else(|| Error::engine(format!("part {part} is not a volume")))
    }

    fn volume_tiles(&self, geo: GeoId, part: PartId) -> Result<Vec<VolumeTile>> {
        let scene = self.scene.read();
        match scene.part(geo, part)?.volume.as_ref() {
            Some(v) if !v.unreadable => Ok(v.tiles.clone()),
            Some(_) => Err(Error::engine("volume tiles could not be read")),
            None => Err(Error::engine(format!("part {part} is not a volume"))),
        }
    }

    fn part_material(&self, geo: GeoId, part: PartId) -> Result<Option<MaterialId>> {
        Ok(self.scene.read().part(geo, part)?.material)
    }

    fn material_info(&self, material: MaterialId) -> Result<MaterialInfo> {
        let mut scene = self.scene.write();
        scene.stats.material_info_queries += 1;
        let info = match scene.materials.get(&material) {
            Some(m) => MaterialInfo {
                id: material,
                exists: true,
                has_changed: false,
                name: m.name.clone(),
                path: m.path.clone(),
            },
            None => MaterialInfo {
                id: material,
                exists: false,
                has_changed: false,
                name: String::new(),
                path: String::new(),
            },
        };
        Ok(info)
    }

    fn material_parm(&self, material: MaterialId, name: &str) -> Result<Option<ParmValue>> {
        let scene = self.scene.read();
        Ok(scene.materials.get(&material).and_then(|m| m.parms.get(name).cloned()))
    }

    fn instancer_part_transforms(&self, geo: GeoId, part: PartId) -> Result<Vec<Transform>> {
        let scene = self.scene.read();
        Ok(scene.part(geo, part)?.instancer.as_ref().map(|i| i.transforms.clone()).unwrap_or_default())
    }

    fn instancer_reference_indices(&self, geo: GeoId, part: PartId) -> Result<Vec<i32>> {
        let scene = self.scene.read();
        Ok(scene
            .part(geo, part)?
            .instancer
            .as_ref()
            .map(|i| i.reference_indices.clone())
            .unwrap_or_default())
    }

    fn instanced_part_ids(&self, geo: GeoId, part: PartId) -> Result<Vec<PartId>> {
        let scene = self.scene.read();
        Ok(scene
            .part(geo, part)?
            .instancer
            .as_ref()
            .map(|i| i.instanced_parts.clone())
            .unwrap_or_default())
    }

    fn instance_transforms(&self, object: ObjectId, _geo: GeoId) -> Result<Vec<Transform>> {
        let scene = self.scene.read();
        Ok(scene.object(object)?.1.instance_transforms.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle_asset() -> AssetDefinition {
        AssetDefinition::new()
            .with_parm("size", ParmValue::Float(vec![1.0]))
            .with_object(
                MemoryObject::new("geo1").with_geo(
                    MemoryGeo::new("out").with_part(
                        MemoryPart::mesh("tri", &[Vec3::ZERO, Vec3::X, Vec3::Y], vec![3], vec![0, 1, 2])
                            .with_group(GroupType::Primitive, "all", &[0]),
                    ),
                ),
            )
    }

    #[test]
    fn test_queries_require_cook() {
        let mut engine = MemoryEngine::new();
        engine.define_asset("lib.hda", "tri", triangle_asset());
        let asset = engine.create_asset(Path::new("lib.hda"), "tri").unwrap();
        assert!(engine.object_infos(asset).is_err());

        engine.cook(asset).unwrap();
        let objects = engine.object_infos(asset).unwrap();
        assert_eq!(objects.len(), 1);
        let geos = engine.geo_infos(objects[0].id).unwrap();
        assert_eq!(geos[0].primitive_group_count, 1);
        assert!(geos[0].has_geo_changed);

        let part = engine.part_info(geos[0].id, PartId(0)).unwrap();
        assert_eq!(part.point_count, 3);
        assert_eq!(part.face_count, 1);
        assert_eq!(part.vertex_count, 3);
    }

    #[test]
    fn test_change_flags_follow_edits() {
        let mut engine = MemoryEngine::new();
        engine.define_asset("lib.hda", "tri", triangle_asset());
        let asset = engine.create_asset(Path::new("lib.hda"), "tri").unwrap();
        engine.cook(asset).unwrap();
        engine.cook(asset).unwrap();
        let obj = engine.object_infos(asset).unwrap()[0].id;
        assert!(!engine.geo_infos(obj).unwrap()[0].has_geo_changed);

        engine.set_parm_value(asset, "size", &ParmValue::Float(vec![2.0])).unwrap();
        engine.cook(asset).unwrap();
        let geo = &engine.geo_infos(obj).unwrap()[0];
        assert!(geo.has_geo_changed);
        assert!(!geo.has_material_changed);
        assert_eq!(engine.stats().parm_sets, 1);
    }

    #[test]
    fn test_failed_cook_keeps_previous_state() {
        let mut engine = MemoryEngine::new();
        engine.define_asset("lib.hda", "tri", triangle_asset());
        let asset = engine.create_asset(Path::new("lib.hda"), "tri").unwrap();
        engine.cook(asset).unwrap();
        engine.edit_asset("lib.hda", "tri", |d| d.objects.clear());
        engine.fail_next_cook("boom");
        assert!(matches!(engine.cook(asset), Err(Error::CookFailed(r)) if r == "boom"));
        assert_eq!(engine.object_infos(asset).unwrap().len(), 1);
    }

    #[test]
    fn test_missing_group_membership_is_all_false() {
        let mut engine = MemoryEngine::new();
        engine.define_asset("lib.hda", "tri", triangle_asset());
        let asset = engine.create_asset(Path::new("lib.hda"), "tri").unwrap();
        engine.cook(asset).unwrap();
        let obj = engine.object_infos(asset).unwrap()[0].id;
        let geo = engine.geo_infos(obj).unwrap()[0].id;
        let members = engine.group_membership(geo, PartId(0), GroupType::Point, "nope").unwrap();
        assert_eq!(members, vec![false; 3]);
    }
}
