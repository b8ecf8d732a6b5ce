//! Object assembly.
//!
//! Resolves an object's transform and visibility, then either assembles its
//! geometries or, for point-instancer objects, extracts the instances.
//! Instances reference other objects by name: the host resolves them by
//! lookup, since the target may be assembled later in the same pass.

use tracing::{debug, warn};

use crate::attribute::AttributeReader;
use crate::engine::{Engine, ObjectInfo, PartId};
use crate::geometry::{GeoSnapshot, GeometryAssembler};
use crate::options::AssetNodeOptions;
use crate::output::{Instance, InstancerRecord, ObjectContent, ObjectRecord};
use crate::part::PartPass;
use crate::util::{AttributeOwner, Result, Transform, TransformRecord};

/// Per-instance object path attribute.
pub const INSTANCE_ATTRIBUTE: &str = "instance";
/// Per-instance name attribute.
pub const NAME_ATTRIBUTE: &str = "name";

/// Info records of one object, refreshed once per cook.
#[derive(Clone, Debug, PartialEq)]
pub struct ObjectSnapshot {
    pub info: ObjectInfo,
    pub transform: Transform,
    pub geos: Vec<GeoSnapshot>,
}

impl ObjectSnapshot {
    /// Query the transform, geometries and parts of an object.
    pub fn capture(engine: &dyn Engine, info: ObjectInfo) -> Result<Self> {
        let transform = engine.object_transform(info.id)?;
        let geos = engine
            .geo_infos(info.id)?
            .into_iter()
            .map(|g| GeoSnapshot::capture(engine, g))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { info, transform, geos })
    }
}

/// Host transform of an object: the engine transform when
/// `use_asset_object_transform` is on, identity otherwise.
pub fn resolve_transform(object: &ObjectSnapshot, options: &AssetNodeOptions) -> TransformRecord {
    if options.use_asset_object_transform {
        TransformRecord::from_transform(&object.transform)
    } else {
        TransformRecord::IDENTITY
    }
}

/// Last segment of an object path: `/obj/box1` names `box1`.
fn object_name_from_path(path: &str) -> &str {
    path.trim_end_matches('/').rsplit('/').next().unwrap_or(path)
}

/// Assembles object records under a policy.
#[derive(Clone, Copy, Debug)]
pub struct ObjectAssembler<'o> {
    options: &'o AssetNodeOptions,
}

impl<'o> ObjectAssembler<'o> {
    pub fn new(options: &'o AssetNodeOptions) -> Self {
        Self { options }
    }

    /// Assemble one object. `objects` is the whole cooked object list, used to
    /// name instancer targets.
    pub fn assemble(&self, object: &ObjectSnapshot, objects: &[ObjectInfo], pass: &mut PartPass<'_>) -> ObjectRecord {
        let info = &object.info;
        let content = if info.is_instancer {
            ObjectContent::Instancer(self.assemble_instancer(object, objects, pass.engine()))
        } else if info.is_visible || info.is_instanced || self.options.output_hidden_objects {
            let geometry = GeometryAssembler::new(self.options);
            ObjectContent::Geometry(
                object
                    .geos
                    .iter()
                    .filter_map(|g| geometry.assemble(info.id, g, pass))
                    .collect(),
            )
        } else {
            debug!(object = %info.name, "hidden object emitted without geometry");
            ObjectContent::Geometry(Vec::new())
        };

        ObjectRecord {
            name: info.name.clone(),
            transform: resolve_transform(object, self.options),
            visible: info.is_visible,
            is_instanced: info.is_instanced,
            content,
        }
    }

    /// Instances of a point-instancer object. Targets come from the object's
    /// single instanced object or from its `instance` point attribute. Any
    /// count mismatch yields an empty record.
    pub fn assemble_instancer(
        &self,
        object: &ObjectSnapshot,
        objects: &[ObjectInfo],
        engine: &dyn Engine,
    ) -> InstancerRecord {
        let mut record = InstancerRecord {
            use_instancer_node: self.options.use_instancer_node,
            ..Default::default()
        };
        if let Err(e) = self.read_instances(object, objects, engine, &mut record) {
            warn!(object = %object.info.name, error = %e, "instancer could not be read, emitting empty record");
        }
        record
    }

    /// Fill `record` with the instances. Leaves it untouched when the
    /// instancer has no usable targets.
    fn read_instances(
        &self,
        object: &ObjectSnapshot,
        objects: &[ObjectInfo],
        engine: &dyn Engine,
        record: &mut InstancerRecord,
    ) -> Result<()> {
        let name = &object.info.name;
        let Some(geo) = object.geos.first() else {
            warn!(object = %name, "instancer has no geometry");
            return Ok(());
        };
        let transforms = engine.instance_transforms(object.info.id, geo.info.id)?;
        let count = transforms.len();

        let reader = AttributeReader::new(engine, geo.info.id, PartId(0));
        let per_instance = |attr: &str| -> Result<Option<Vec<String>>> {
            if geo.parts.is_empty() {
                return Ok(None);
            }
            let Some(values) = reader.read_strings(AttributeOwner::Point, attr)? else {
                return Ok(None);
            };
            if values.len() != count {
                warn!(object = %name, attribute = attr, values = values.len(), instances = count, "attribute does not match instance count, dropped");
                return Ok(None);
            }
            Ok(Some(values.data.chunks_exact(values.tuple_size).map(|t| t[0].clone()).collect()))
        };
        let instance_attribute = per_instance(INSTANCE_ATTRIBUTE)?;
        let name_attribute = per_instance(NAME_ATTRIBUTE)?;

        let targets: Vec<String> = match object.info.object_to_instance {
            Some(target) => {
                let Some(target) = objects.iter().find(|o| o.id == target) else {
                    warn!(object = %name, target = %target, "instanced object not found");
                    return Ok(());
                };
                vec![target.name.clone(); count]
            }
            None => match &instance_attribute {
                Some(paths) => paths.iter().map(|p| object_name_from_path(p).to_string()).collect(),
                None => {
                    warn!(object = %name, instances = count, "instancer has no usable instance targets");
                    return Ok(());
                }
            },
        };

        for (transform, object_name) in transforms.iter().zip(targets) {
            if !record.instanced_object_names.contains(&object_name) {
                record.instanced_object_names.push(object_name.clone());
            }
            record.instances.push(Instance {
                transform: TransformRecord::from_transform(transform),
                object_name,
            });
        }
        record.instance_attribute = instance_attribute;
        record.name_attribute = name_attribute;
        Ok(())
    }
}
