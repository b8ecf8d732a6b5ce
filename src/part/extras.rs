//! Extra attribute and group enumeration.

use tracing::{trace, warn};

use super::PartTranslator;
use crate::attribute::{reverse_winding, AttributeLedger};
use crate::output::{ExtraAttribute, GroupRecord};
use crate::util::{AttributeOwner, AttributeValues, GroupType, Result};

fn reverse_values(values: &mut AttributeValues, face_counts: &[i32], tuple_size: usize) -> Result<()> {
    match values {
        AttributeValues::Int(v) => reverse_winding(v, face_counts, tuple_size),
        AttributeValues::Int64(v) => reverse_winding(v, face_counts, tuple_size),
        AttributeValues::Float(v) => reverse_winding(v, face_counts, tuple_size),
        AttributeValues::Float64(v) => reverse_winding(v, face_counts, tuple_size),
        AttributeValues::String(v) => reverse_winding(v, face_counts, tuple_size),
    }
}

/// Every attribute of the part not already consumed by its kind translator,
/// across all owners. Vertex attributes of meshes (`face_counts` given)
/// follow the host winding.
pub fn read_extra_attributes(
    t: &PartTranslator<'_>,
    ledger: &AttributeLedger,
    face_counts: Option<&[i32]>,
) -> Result<Vec<ExtraAttribute>> {
    let reader = t.reader();
    let mut extras = Vec::new();
    for owner in AttributeOwner::ALL {
        for name in reader.names(owner)? {
            if ledger.is_used(&name) {
                trace!(%owner, %name, "attribute already translated");
                continue;
            }
            let Some(info) = reader.info(owner, &name)? else {
                continue;
            };
            let Some(mut data) = reader.raw(&info)? else {
                continue;
            };
            if let (AttributeOwner::Vertex, Some(counts)) = (owner, face_counts) {
                if let Err(e) = reverse_values(&mut data, counts, info.tuple_size) {
                    warn!(%name, error = %e, "vertex attribute does not match faces, skipped");
                    continue;
                }
            }
            extras.push(ExtraAttribute {
                name,
                owner,
                storage: data.storage(),
                tuple_size: info.tuple_size,
                data,
            });
        }
    }
    Ok(extras)
}

/// Named groups with at least one member in this part, point groups first.
pub fn read_groups(t: &PartTranslator<'_>) -> Result<Vec<GroupRecord>> {
    let engine = t.engine();
    let (geo, part) = (t.geo().id, t.info().id);
    let mut groups = Vec::new();
    for group_type in GroupType::ALL {
        for name in engine.group_names(geo, group_type)? {
            let members: Vec<i32> = engine
                .group_membership(geo, part, group_type, &name)?
                .iter()
                .enumerate()
                .filter(|&(_, &member)| member)
                .map(|(i, _)| i as i32)
                .collect();
            if members.is_empty() {
                trace!(%group_type, %name, "group has no members in this part");
                continue;
            }
            groups.push(GroupRecord { name, group_type, members });
        }
    }
    Ok(groups)
}
