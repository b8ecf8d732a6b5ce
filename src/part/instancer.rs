//! Instancer part translation.

use super::PartTranslator;
use crate::output::PartInstancerRecord;
use crate::util::{Error, Result, TransformRecord};

/// Fill an instancer part record. Transforms and reference indices must pair
/// up one to one and every reference must name an instanced part; otherwise
/// the part is rejected and emitted empty.
pub(super) fn fill_instancer(t: &PartTranslator<'_>, instancer: &mut PartInstancerRecord) -> Result<()> {
    instancer.transforms.clear();
    instancer.reference_indices.clear();
    instancer.instanced_parts.clear();

    let engine = t.engine();
    let (geo, part) = (t.geo().id, t.info().id);
    let transforms = engine.instancer_part_transforms(geo, part)?;
    let references = engine.instancer_reference_indices(geo, part)?;
    let parts = engine.instanced_part_ids(geo, part)?;

    if transforms.len() != references.len() {
        return Err(Error::shape(format!(
            "{} instance transforms, {} reference indices",
            transforms.len(),
            references.len()
        )));
    }
    if let Some(&bad) = references.iter().find(|&&r| r < 0 || r as usize >= parts.len()) {
        return Err(Error::shape(format!(
            "reference index {bad} out of range for {} instanced parts",
            parts.len()
        )));
    }

    instancer.transforms.extend(transforms.iter().map(TransformRecord::from_transform));
    instancer.reference_indices = references;
    instancer.instanced_parts = parts;
    Ok(())
}
