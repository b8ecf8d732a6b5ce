//! Element selection on translated parts.
//!
//! Group splitting carves a part into subsets along its primary element
//! domain: faces of a mesh, curves of a curve set, points of a particle cloud
//! or part instancer, and the single primitive of a volume. Selecting
//! elements carries every dependent array along (compacted points, face-vertex
//! arrays, owner-scoped extra attributes).

use tracing::warn;

use super::*;

/// Source indices kept for each element class of a selection.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ElementMap {
    pub points: Vec<usize>,
    pub vertices: Vec<usize>,
    pub primitives: Vec<usize>,
}

impl ElementMap {
    /// Indices for an owner scope. Detail data is kept whole.
    pub fn for_owner(&self, owner: AttributeOwner) -> Option<&[usize]> {
        match owner {
            AttributeOwner::Point => Some(&self.points),
            AttributeOwner::Vertex => Some(&self.vertices),
            AttributeOwner::Primitive => Some(&self.primitives),
            AttributeOwner::Detail => None,
        }
    }
}

fn gather<T: Clone>(data: &[T], tuple_size: usize, indices: &[usize]) -> Option<Vec<T>> {
    let count = data.len() / tuple_size.max(1);
    if indices.iter().any(|&i| i >= count) {
        return None;
    }
    let mut out = Vec::with_capacity(indices.len() * tuple_size);
    for &i in indices {
        out.extend_from_slice(&data[i * tuple_size..(i + 1) * tuple_size]);
    }
    Some(out)
}

fn gather_one<T: Clone>(data: &[T], indices: &[usize]) -> Option<Vec<T>> {
    gather(data, 1, indices)
}

/// Gather tuples of raw attribute values. `None` if an index is out of range.
pub(crate) fn select_values(values: &AttributeValues, tuple_size: usize, indices: &[usize]) -> Option<AttributeValues> {
    Some(match values {
        AttributeValues::Int(v) => AttributeValues::Int(gather(v, tuple_size, indices)?),
        AttributeValues::Int64(v) => AttributeValues::Int64(gather(v, tuple_size, indices)?),
        AttributeValues::Float(v) => AttributeValues::Float(gather(v, tuple_size, indices)?),
        AttributeValues::Float64(v) => AttributeValues::Float64(gather(v, tuple_size, indices)?),
        AttributeValues::String(v) => AttributeValues::String(gather(v, tuple_size, indices)?),
    })
}

fn face_offsets(face_counts: &[i32]) -> Vec<usize> {
    let mut offsets = Vec::with_capacity(face_counts.len() + 1);
    let mut start = 0usize;
    offsets.push(0);
    for &c in face_counts {
        start += c.max(0) as usize;
        offsets.push(start);
    }
    offsets
}

fn curve_offsets(curves: &CurvesRecord) -> Vec<usize> {
    let mut offsets = Vec::with_capacity(curves.curves.len() + 1);
    let mut start = 0usize;
    offsets.push(0);
    for c in &curves.curves {
        start += c.positions.len();
        offsets.push(start);
    }
    offsets
}

fn select_mesh(mesh: &MeshRecord, faces: &[usize]) -> (MeshRecord, ElementMap) {
    let offsets = face_offsets(&mesh.face_counts);
    let mut map = ElementMap { primitives: faces.to_vec(), ..Default::default() };

    let mut used = vec![false; mesh.positions.len()];
    for &f in faces {
        for v in offsets[f]..offsets[f + 1] {
            map.vertices.push(v);
            if let Some(u) = mesh.face_indices.get(v).and_then(|&p| used.get_mut(p as usize)) {
                *u = true;
            }
        }
    }
    // Compacted points keep their relative order.
    let mut remap = vec![-1i32; mesh.positions.len()];
    for (p, _) in used.iter().enumerate().filter(|&(_, &u)| u) {
        remap[p] = map.points.len() as i32;
        map.points.push(p);
    }

    let out = MeshRecord {
        positions: map.points.iter().map(|&p| mesh.positions[p]).collect(),
        face_counts: faces.iter().map(|&f| mesh.face_counts[f]).collect(),
        face_indices: map
            .vertices
            .iter()
            .map(|&v| mesh.face_indices.get(v).map_or(-1, |&p| remap.get(p as usize).copied().unwrap_or(-1)))
            .collect(),
        normals: mesh.normals.as_ref().and_then(|n| gather_one(n, &map.vertices)),
        uv_sets: mesh
            .uv_sets
            .iter()
            .filter_map(|s| Some(UvSet { name: s.name.clone(), uvs: gather_one(&s.uvs, &map.vertices)? }))
            .collect(),
        current_uv_set: mesh.current_uv_set.clone(),
        color_sets: mesh
            .color_sets
            .iter()
            .filter_map(|s| Some(ColorSet { name: s.name.clone(), colors: gather_one(&s.colors, &map.vertices)? }))
            .collect(),
        current_color_set: mesh.current_color_set.clone(),
    };
    (out, map)
}

fn select_curves(curves: &CurvesRecord, selected: &[usize]) -> (CurvesRecord, ElementMap) {
    let offsets = curve_offsets(curves);
    let mut map = ElementMap { primitives: selected.to_vec(), ..Default::default() };
    for &c in selected {
        map.points.extend(offsets[c]..offsets[c + 1]);
    }
    map.vertices = map.points.clone();
    let out = CurvesRecord {
        curves: selected.iter().map(|&c| curves.curves[c].clone()).collect(),
        is_bezier: curves.is_bezier,
        is_periodic: curves.is_periodic,
    };
    (out, map)
}

fn select_particles(particles: &ParticleRecord, points: &[usize]) -> ParticleRecord {
    let pick = |v: &Option<Vec<f32>>| v.as_ref().and_then(|v| gather_one(v, points));
    ParticleRecord {
        positions: points.iter().map(|&p| particles.positions[p]).collect(),
        current_time: particles.current_time,
        velocity: particles.velocity.as_ref().and_then(|v| gather_one(v, points)),
        rgb_pp: particles.rgb_pp.as_ref().and_then(|v| gather_one(v, points)),
        opacity_pp: pick(&particles.opacity_pp),
        radius_pp: pick(&particles.radius_pp),
        age_pp: pick(&particles.age_pp),
        lifespan_pp: pick(&particles.lifespan_pp),
        particle_id: particles.particle_id.as_ref().and_then(|v| gather_one(v, points)),
    }
}

impl PartRecord {
    /// Number of elements in the part's primary domain.
    pub fn element_count(&self) -> usize {
        match &self.data {
            PartData::Mesh(m) => m.num_faces(),
            PartData::Curves(c) => c.curves.len(),
            PartData::Particle(p) => p.count(),
            PartData::Instancer(i) => i.count(),
            PartData::Volume(_) => 1,
        }
    }

    /// Primary-domain elements that belong to a group. A point group on a
    /// face or curve domain selects the elements whose points all lie in it.
    pub fn group_elements(&self, group: &GroupRecord) -> Vec<usize> {
        let count = self.element_count();
        let members: Vec<usize> = group.members.iter().filter_map(|&m| usize::try_from(m).ok()).collect();
        let point_domain = matches!(self.data, PartData::Particle(_) | PartData::Instancer(_));
        match (group.group_type, &self.data) {
            (_, PartData::Volume(_)) => members.into_iter().filter(|&m| m == 0).take(1).collect(),
            (GroupType::Point, _) if point_domain => members.into_iter().filter(|&m| m < count).collect(),
            (GroupType::Primitive, _) if point_domain => Vec::new(),
            (GroupType::Primitive, _) => members.into_iter().filter(|&m| m < count).collect(),
            (GroupType::Point, PartData::Mesh(mesh)) => {
                let in_group = membership(&members, mesh.positions.len());
                let offsets = face_offsets(&mesh.face_counts);
                (0..count)
                    .filter(|&f| {
                        let verts = mesh.face_indices.get(offsets[f]..offsets[f + 1]).unwrap_or(&[]);
                        !verts.is_empty()
                            && verts
                                .iter()
                                .all(|&p| in_group.get(p as usize).copied().unwrap_or(false))
                    })
                    .collect()
            }
            (GroupType::Point, PartData::Curves(curves)) => {
                let offsets = curve_offsets(curves);
                let in_group = membership(&members, curves.num_points());
                (0..count)
                    .filter(|&c| offsets[c] < offsets[c + 1] && in_group[offsets[c]..offsets[c + 1]].iter().all(|&b| b))
                    .collect()
            }
            (GroupType::Point, _) => Vec::new(),
        }
    }

    /// Subset of this part holding the given primary-domain elements, in the
    /// given order. The subset keeps the material and drops groups; extra
    /// attributes follow their owner scope.
    pub fn select(&self, name: &str, elements: &[usize]) -> PartRecord {
        let elements: Vec<usize> = elements.iter().copied().filter(|&e| e < self.element_count()).collect();
        let (data, map) = match &self.data {
            PartData::Mesh(mesh) => {
                let (m, map) = select_mesh(mesh, &elements);
                (PartData::Mesh(m), map)
            }
            PartData::Curves(curves) => {
                let (c, map) = select_curves(curves, &elements);
                (PartData::Curves(c), map)
            }
            PartData::Particle(particles) => {
                let map = ElementMap { points: elements.clone(), ..Default::default() };
                (PartData::Particle(select_particles(particles, &elements)), map)
            }
            PartData::Instancer(inst) => {
                let map = ElementMap { points: elements.clone(), ..Default::default() };
                let record = PartInstancerRecord {
                    transforms: elements.iter().map(|&e| inst.transforms[e]).collect(),
                    reference_indices: elements
                        .iter()
                        .map(|&e| inst.reference_indices.get(e).copied().unwrap_or(-1))
                        .collect(),
                    instanced_parts: inst.instanced_parts.clone(),
                };
                (PartData::Instancer(record), map)
            }
            PartData::Volume(volume) => {
                if elements.is_empty() {
                    let empty = VolumeRecord { name: volume.name.clone(), ..Default::default() };
                    (PartData::Volume(empty), ElementMap::default())
                } else {
                    let map = ElementMap { points: vec![0], vertices: vec![0], primitives: vec![0] };
                    (PartData::Volume(volume.clone()), map)
                }
            }
        };

        let extra_attributes = self
            .extra_attributes
            .iter()
            .filter_map(|attr| {
                let Some(indices) = map.for_owner(attr.owner) else {
                    return Some(attr.clone());
                };
                match select_values(&attr.data, attr.tuple_size, indices) {
                    Some(data) => Some(ExtraAttribute { data, ..attr.clone() }),
                    None => {
                        warn!(attribute = %attr.name, owner = %attr.owner, part = %self.name, "attribute does not match part layout, dropped from subset");
                        None
                    }
                }
            })
            .collect();

        PartRecord {
            name: name.to_string(),
            data,
            material: self.material.clone(),
            extra_attributes,
            groups: Vec::new(),
        }
    }
}

fn membership(members: &[usize], len: usize) -> Vec<bool> {
    let mut flags = vec![false; len];
    for &m in members {
        if let Some(f) = flags.get_mut(m) {
            *f = true;
        }
    }
    flags
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_triangles() -> PartRecord {
        let mesh = MeshRecord {
            positions: vec![Vec3::ZERO, Vec3::X, Vec3::new(1.0, 1.0, 0.0), Vec3::Y],
            face_counts: vec![3, 3],
            face_indices: vec![2, 1, 0, 3, 2, 0],
            normals: Some(vec![Vec3::Z; 6]),
            ..Default::default()
        };
        let mut part = PartRecord::new("quad", PartData::Mesh(mesh));
        part.extra_attributes.push(ExtraAttribute {
            name: "prim_id".into(),
            owner: AttributeOwner::Primitive,
            storage: StorageType::Int,
            tuple_size: 1,
            data: AttributeValues::Int(vec![10, 20]),
        });
        part.extra_attributes.push(ExtraAttribute {
            name: "weight".into(),
            owner: AttributeOwner::Point,
            storage: StorageType::Float,
            tuple_size: 1,
            data: AttributeValues::Float(vec![0.0, 0.1, 0.2, 0.3]),
        });
        part
    }

    #[test]
    fn test_select_mesh_faces() {
        let part = two_triangles();
        let sub = part.select("second", &[1]);
        let mesh = sub.data.as_mesh().unwrap();
        // Points 0, 2, 3 survive, compacted in order.
        assert_eq!(mesh.positions, vec![Vec3::ZERO, Vec3::new(1.0, 1.0, 0.0), Vec3::Y]);
        assert_eq!(mesh.face_counts, vec![3]);
        assert_eq!(mesh.face_indices, vec![2, 1, 0]);
        assert_eq!(mesh.normals.as_ref().map(Vec::len), Some(3));
        assert_eq!(sub.extra_attribute("prim_id").unwrap().data, AttributeValues::Int(vec![20]));
        assert_eq!(
            sub.extra_attribute("weight").unwrap().data,
            AttributeValues::Float(vec![0.0, 0.2, 0.3])
        );
        assert!(sub.groups.is_empty());
    }

    #[test]
    fn test_point_group_selects_enclosed_faces() {
        let part = two_triangles();
        let group = GroupRecord {
            name: "corner".into(),
            group_type: GroupType::Point,
            members: vec![0, 1, 2],
        };
        assert_eq!(part.group_elements(&group), vec![0]);
        let prims = GroupRecord {
            name: "both".into(),
            group_type: GroupType::Primitive,
            members: vec![0, 1, 7],
        };
        assert_eq!(part.group_elements(&prims), vec![0, 1]);
    }

    #[test]
    fn test_select_particles() {
        let particles = ParticleRecord {
            positions: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            radius_pp: Some(vec![1.0, 2.0, 3.0]),
            current_time: 0.5,
            ..Default::default()
        };
        let part = PartRecord::new("pts", PartData::Particle(particles));
        let sub = part.select("pts", &[2, 0]);
        let p = sub.data.as_particle().unwrap();
        assert_eq!(p.positions, vec![Vec3::Y, Vec3::ZERO]);
        assert_eq!(p.radius_pp, Some(vec![3.0, 1.0]));
        assert_eq!(p.current_time, 0.5);
    }

    #[test]
    fn test_select_curves() {
        let curves = CurvesRecord {
            curves: vec![
                CurveRecord { positions: vec![Vec3::ZERO, Vec3::X], order: 2, knots: None },
                CurveRecord { positions: vec![Vec3::Y, Vec3::Z, Vec3::ONE], order: 2, knots: None },
            ],
            ..Default::default()
        };
        let part = PartRecord::new("c", PartData::Curves(curves));
        let group = GroupRecord { name: "g".into(), group_type: GroupType::Point, members: vec![2, 3, 4] };
        assert_eq!(part.group_elements(&group), vec![1]);
        let sub = part.select("g", &[1]);
        assert_eq!(sub.data.as_curves().unwrap().num_points(), 3);
    }

    #[test]
    fn test_select_volume() {
        let volume = VolumeRecord { name: "density".into(), resolution: [1, 1, 1], grid: vec![1.0], ..Default::default() };
        let part = PartRecord::new("v", PartData::Volume(volume.clone()));
        assert_eq!(part.select("v", &[0]).data, PartData::Volume(volume));
        let rest = part.select("v", &[]);
        assert!(rest.data.is_empty());
        assert_eq!(rest.data.as_volume().unwrap().name, "density");
    }

    #[test]
    fn test_select_values_out_of_range() {
        let v = AttributeValues::Float(vec![1.0, 2.0]);
        assert!(select_values(&v, 1, &[2]).is_none());
        assert_eq!(select_values(&v, 2, &[0]), Some(v.clone()));
    }
}
