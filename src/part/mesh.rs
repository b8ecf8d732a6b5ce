//! Polygon mesh translation.

use tracing::warn;

use super::PartTranslator;
use crate::attribute::{reverse_winding, AttributeLedger, AttributeReader, Topology, TupleArray};
use crate::output::{ColorSet, MeshRecord, UvSet, DEFAULT_COLOR_SET, DEFAULT_UV_SET};
use crate::util::{AttributeOwner, Error, Result, Vec4};

/// Index of a UV attribute name: `uv` is 1, `uvN` is N.
fn uv_index(name: &str) -> Option<u32> {
    let rest = name.strip_prefix("uv")?;
    if rest.is_empty() {
        return Some(1);
    }
    rest.parse().ok().filter(|&n| n > 1)
}

/// Host name of a UV set.
fn uv_set_name(name: &str) -> String {
    if name == "uv" {
        DEFAULT_UV_SET.to_string()
    } else {
        name.to_string()
    }
}

/// Read a float attribute from any owner and lay it out per face-vertex in
/// host winding. Data that does not fit the topology is skipped.
fn read_face_varying(
    reader: &AttributeReader<'_>,
    name: &str,
    topo: &Topology<'_>,
) -> Result<Option<TupleArray<f32>>> {
    let Some(attr) = reader.find_f32(name)? else {
        return Ok(None);
    };
    let mut vertex = match attr.promote_to_vertex(topo) {
        Ok(v) => v,
        Err(e) => {
            warn!(name, error = %e, "attribute does not fit mesh topology, skipped");
            return Ok(None);
        }
    };
    reverse_winding(&mut vertex.data, topo.face_counts, vertex.tuple_size)?;
    Ok(Some(vertex))
}

fn uv_attribute_names(reader: &AttributeReader<'_>) -> Result<Vec<String>> {
    let mut names: Vec<(u32, String)> = Vec::new();
    for owner in AttributeOwner::ALL {
        for name in reader.names(owner)? {
            if let Some(index) = uv_index(&name) {
                if !names.iter().any(|(_, n)| *n == name) {
                    names.push((index, name));
                }
            }
        }
    }
    names.sort();
    Ok(names.into_iter().map(|(_, n)| n).collect())
}

/// Fill a mesh record. Zero points or zero faces give the empty mesh.
pub(super) fn fill_mesh(t: &PartTranslator<'_>, mesh: &mut MeshRecord, ledger: &mut AttributeLedger) -> Result<()> {
    mesh.clear();
    let info = t.info();
    if info.point_count == 0 || info.face_count == 0 {
        return Ok(());
    }

    let engine = t.engine();
    let face_counts = engine.face_counts(t.geo().id, info.id)?;
    let vertex_list = engine.vertex_list(t.geo().id, info.id)?;
    let topo = Topology {
        point_count: info.point_count,
        face_counts: &face_counts,
        vertex_list: &vertex_list,
    };
    topo.validate()?;

    let reader = t.reader();
    let positions = reader
        .read_f32(AttributeOwner::Point, "P")?
        .ok_or_else(|| Error::missing(AttributeOwner::Point, "P"))?;
    if positions.len() != info.point_count {
        return Err(Error::shape(format!(
            "{} positions for {} points",
            positions.len(),
            info.point_count
        )));
    }
    ledger.mark_used("P");
    mesh.positions = positions.to_vec3();

    if let Some(normals) = read_face_varying(&reader, "N", &topo)? {
        mesh.normals = Some(normals.to_vec3());
        ledger.mark_used("N");
    }

    for name in uv_attribute_names(&reader)? {
        if let Some(uvs) = read_face_varying(&reader, &name, &topo)? {
            mesh.uv_sets.push(UvSet { name: uv_set_name(&name), uvs: uvs.to_vec2() });
            ledger.mark_used(&name);
        }
    }
    mesh.current_uv_set = mesh.uv_sets.first().map(|s| s.name.clone());

    let color = read_face_varying(&reader, "Cd", &topo)?;
    let alpha = read_face_varying(&reader, "Alpha", &topo)?;
    if color.is_some() || alpha.is_some() {
        let vertex_count = topo.vertex_count();
        let mut colors = match &color {
            Some(cd) => cd.to_vec4(1.0),
            None => vec![Vec4::ONE; vertex_count],
        };
        if let Some(alpha) = &alpha {
            for (c, a) in colors.iter_mut().zip(alpha.to_scalars()) {
                c.w = a;
            }
        }
        if color.is_some() {
            ledger.mark_used("Cd");
        }
        if alpha.is_some() {
            ledger.mark_used("Alpha");
        }
        mesh.color_sets.push(ColorSet { name: DEFAULT_COLOR_SET.to_string(), colors });
        mesh.current_color_set = Some(DEFAULT_COLOR_SET.to_string());
    }

    let mut face_indices = vertex_list;
    reverse_winding(&mut face_indices, &face_counts, 1)?;
    mesh.face_counts = face_counts;
    mesh.face_indices = face_indices;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uv_names() {
        assert_eq!(uv_index("uv"), Some(1));
        assert_eq!(uv_index("uv2"), Some(2));
        assert_eq!(uv_index("uv1"), None);
        assert_eq!(uv_index("uvw"), None);
        assert_eq!(uv_index("N"), None);
        assert_eq!(uv_set_name("uv"), "map1");
        assert_eq!(uv_set_name("uv3"), "uv3");
    }
}
