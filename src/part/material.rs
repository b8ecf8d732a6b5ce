//! Material resolution.
//!
//! Material lookups are comparatively expensive, so a part's material is only
//! re-read when [`has_material_changed`] says so. Otherwise the previous
//! record is carried over untouched.

use tracing::{trace, warn};

use super::PartTranslator;
use crate::engine::{Engine, GeoInfo, MaterialId};
use crate::output::MaterialRecord;
use crate::util::{Result, Vec3};

pub const AMBIENT_PARM: &str = "ogl_amb";
pub const DIFFUSE_PARM: &str = "ogl_diff";
pub const SPECULAR_PARM: &str = "ogl_spec";
pub const ALPHA_PARM: &str = "ogl_alpha";
pub const TEXTURE_PARM: &str = "ogl_tex1";

/// Material assignment of a part as of its last translation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MaterialSlot {
    pub id: Option<MaterialId>,
    pub record: Option<MaterialRecord>,
}

/// Whether a part's material must be re-read: always without a previous
/// translation, otherwise when the engine flags the geometry's materials or
/// the assignment itself changed.
pub fn has_material_changed(geo: &GeoInfo, previous: Option<&MaterialSlot>, current: Option<MaterialId>) -> bool {
    match previous {
        None => true,
        Some(prev) => geo.has_material_changed || prev.id != current,
    }
}

/// Read a material node. Missing materials resolve to `None`.
pub fn resolve_material(engine: &dyn Engine, id: MaterialId) -> Result<Option<MaterialRecord>> {
    let info = engine.material_info(id)?;
    if !info.exists {
        trace!(material = %id, "assigned material does not exist");
        return Ok(None);
    }
    let color = |name: &str, default: Vec3| -> Result<Vec3> {
        Ok(engine.material_parm(id, name)?.and_then(|v| v.as_color()).unwrap_or(default))
    };
    let alpha = engine.material_parm(id, ALPHA_PARM)?.and_then(|v| v.as_f32()).unwrap_or(1.0);
    let texture_path = engine
        .material_parm(id, TEXTURE_PARM)?
        .and_then(|v| v.as_str().map(str::to_string))
        .filter(|p| !p.is_empty());

    Ok(Some(MaterialRecord {
        node_id: info.id,
        name: info.name,
        path: info.path,
        ambient: color(AMBIENT_PARM, Vec3::ZERO)?,
        diffuse: color(DIFFUSE_PARM, Vec3::splat(0.5))?,
        specular: color(SPECULAR_PARM, Vec3::ZERO)?,
        alpha,
        texture_path,
    }))
}

/// Current material slot of a part, reusing `previous` when nothing changed.
/// Lookup failures leave the part without a material.
pub fn update_material(t: &PartTranslator<'_>, previous: Option<MaterialSlot>) -> MaterialSlot {
    let engine = t.engine();
    let current = match engine.part_material(t.geo().id, t.info().id) {
        Ok(id) => id,
        Err(e) => {
            warn!(part = %t.info().name, error = %e, "material assignment could not be read");
            return MaterialSlot::default();
        }
    };
    if let Some(prev) = previous {
        if !has_material_changed(t.geo(), Some(&prev), current) {
            return prev;
        }
    }
    let record = match current.map(|id| resolve_material(engine, id)).transpose() {
        Ok(record) => record.flatten(),
        Err(e) => {
            warn!(part = %t.info().name, error = %e, "material could not be resolved");
            None
        }
    };
    MaterialSlot { id: current, record }
}
