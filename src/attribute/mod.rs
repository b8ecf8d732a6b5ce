//! Attribute transfer: typed extraction of named engine attributes.
//!
//! [`AttributeReader`] reads one part's attributes into [`TupleArray`]s,
//! converting storage (`int64` to `i32`, `float64` to `f32`...) and checking
//! that the data is a whole number of tuples. Missing attributes are not an
//! error: optional data varies from asset to asset, so readers return
//! `Ok(None)` and log at trace level.
//!
//! Data can then be reshaped for the host:
//! - [`TupleArray::resize_tuple`] pads or truncates tuples (RGB to RGBA, UVW to UV)
//! - [`TupleArray::promote_to_vertex`] / [`TupleArray::promote_to_point`] re-scope
//!   point, primitive and detail data
//! - [`reverse_winding`] flips face-vertex order

use tracing::{trace, warn};

use crate::engine::{AttributeInfo, Engine, GeoId, PartId};
use crate::util::{safe_cast_slice, AttributeOwner, AttributeValues, Error, Result, Vec2, Vec3, Vec4};

pub mod ledger;

pub use ledger::AttributeLedger;

/// Mesh connectivity needed to re-scope attributes.
#[derive(Clone, Copy, Debug)]
pub struct Topology<'a> {
    pub point_count: usize,
    pub face_counts: &'a [i32],
    pub vertex_list: &'a [i32],
}

impl Topology<'_> {
    pub fn face_count(&self) -> usize {
        self.face_counts.len()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_list.len()
    }

    /// Check that face counts cover the vertex list and every vertex refers
    /// to an existing point.
    pub fn validate(&self) -> Result<()> {
        let total: i64 = self.face_counts.iter().map(|&c| c as i64).sum();
        if self.face_counts.iter().any(|&c| c < 0) || total != self.vertex_list.len() as i64 {
            return Err(Error::shape(format!(
                "face counts sum to {total}, vertex list has {}",
                self.vertex_list.len()
            )));
        }
        if let Some(&bad) = self
            .vertex_list
            .iter()
            .find(|&&v| v < 0 || v as usize >= self.point_count)
        {
            return Err(Error::shape(format!(
                "vertex refers to point {bad}, part has {} points",
                self.point_count
            )));
        }
        Ok(())
    }
}

/// Flat tuple data with its owner scope.
#[derive(Clone, Debug, PartialEq)]
pub struct TupleArray<T> {
    pub owner: AttributeOwner,
    pub tuple_size: usize,
    pub data: Vec<T>,
}

impl<T> TupleArray<T> {
    /// Wrap flat data, checking it holds a whole number of tuples.
    pub fn new(owner: AttributeOwner, tuple_size: usize, data: Vec<T>) -> Result<Self> {
        if tuple_size == 0 || data.len() % tuple_size != 0 {
            return Err(Error::shape(format!(
                "{} values do not form tuples of size {tuple_size}",
                data.len()
            )));
        }
        Ok(Self { owner, tuple_size, data })
    }

    /// Number of tuples.
    pub fn len(&self) -> usize {
        self.data.len() / self.tuple_size
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Borrow tuple `i`.
    pub fn tuple(&self, i: usize) -> &[T] {
        &self.data[i * self.tuple_size..(i + 1) * self.tuple_size]
    }
}

impl<T: Copy> TupleArray<T> {

    /// Pad (with `fill`) or truncate every tuple to `size` components.
    pub fn resize_tuple(&self, size: usize, fill: T) -> Self {
        if size == self.tuple_size {
            return self.clone();
        }
        let mut data = Vec::with_capacity(self.len() * size);
        for i in 0..self.len() {
            let t = self.tuple(i);
            data.extend((0..size).map(|c| t.get(c).copied().unwrap_or(fill)));
        }
        Self { owner: self.owner, tuple_size: size, data }
    }

    /// Gather the given tuples, in order.
    pub fn select(&self, indices: &[usize]) -> Self {
        let mut data = Vec::with_capacity(indices.len() * self.tuple_size);
        for &i in indices {
            data.extend_from_slice(self.tuple(i));
        }
        Self { owner: self.owner, tuple_size: self.tuple_size, data }
    }

    fn repeat_tuple(&self, i: usize, times: usize, out: &mut Vec<T>) {
        let t = self.tuple(i);
        for _ in 0..times {
            out.extend_from_slice(t);
        }
    }

    /// Re-scope to one tuple per face-vertex.
    pub fn promote_to_vertex(&self, topo: &Topology<'_>) -> Result<Self> {
        let expected = match self.owner {
            AttributeOwner::Vertex => topo.vertex_count(),
            AttributeOwner::Point => topo.point_count,
            AttributeOwner::Primitive => topo.face_count(),
            AttributeOwner::Detail => 1,
        };
        if self.len() != expected {
            return Err(Error::shape(format!(
                "{} attribute has {} tuples, expected {expected}",
                self.owner,
                self.len()
            )));
        }
        let mut data = Vec::with_capacity(topo.vertex_count() * self.tuple_size);
        match self.owner {
            AttributeOwner::Vertex => return Ok(self.clone()),
            AttributeOwner::Point => {
                for &p in topo.vertex_list {
                    let p = usize::try_from(p)
                        .ok()
                        .filter(|&p| p < expected)
                        .ok_or_else(|| Error::shape(format!("vertex refers to missing point {p}")))?;
                    data.extend_from_slice(self.tuple(p));
                }
            }
            AttributeOwner::Primitive => {
                for (face, &count) in topo.face_counts.iter().enumerate() {
                    self.repeat_tuple(face, count.max(0) as usize, &mut data);
                }
            }
            AttributeOwner::Detail => self.repeat_tuple(0, topo.vertex_count(), &mut data),
        }
        Ok(Self { owner: AttributeOwner::Vertex, tuple_size: self.tuple_size, data })
    }

    /// Re-scope to one tuple per point. Only point and detail data can be
    /// expressed per point.
    pub fn promote_to_point(&self, point_count: usize) -> Result<Self> {
        match self.owner {
            AttributeOwner::Point if self.len() == point_count => Ok(self.clone()),
            AttributeOwner::Detail if self.len() == 1 => {
                let mut data = Vec::with_capacity(point_count * self.tuple_size);
                self.repeat_tuple(0, point_count, &mut data);
                Ok(Self { owner: AttributeOwner::Point, tuple_size: self.tuple_size, data })
            }
            owner => Err(Error::shape(format!(
                "{owner} attribute with {} tuples cannot be expressed on {point_count} points",
                self.len()
            ))),
        }
    }
}

impl TupleArray<f32> {
    fn cast<V: bytemuck::Pod>(&self, size: usize, fill: f32) -> Vec<V> {
        let sized = self.resize_tuple(size, fill);
        safe_cast_slice(&sized.data).map(<[V]>::to_vec).unwrap_or_default()
    }

    /// Tuples as `Vec2`, dropping or zero-filling components.
    pub fn to_vec2(&self) -> Vec<Vec2> {
        self.cast(2, 0.0)
    }

    /// Tuples as `Vec3`, dropping or zero-filling components.
    pub fn to_vec3(&self) -> Vec<Vec3> {
        self.cast(3, 0.0)
    }

    /// Tuples as `Vec4`; a missing fourth component defaults to `w_fill`.
    pub fn to_vec4(&self, w_fill: f32) -> Vec<Vec4> {
        // Vec4 is 16-byte aligned, so tuples are copied rather than cast.
        let sized = self.resize_tuple(4, 0.0);
        let mut out: Vec<Vec4> = sized.data.chunks_exact(4).map(Vec4::from_slice).collect();
        if self.tuple_size < 4 {
            for v in &mut out {
                v.w = w_fill;
            }
        }
        out
    }

    /// First component of every tuple.
    pub fn to_scalars(&self) -> Vec<f32> {
        self.data.chunks_exact(self.tuple_size).map(|t| t[0]).collect()
    }
}

/// Reverse the face-vertex order of every face, in place. `data` holds one
/// tuple of `tuple_size` values per face-vertex.
pub fn reverse_winding<T>(data: &mut [T], face_counts: &[i32], tuple_size: usize) -> Result<()> {
    let total: usize = face_counts.iter().map(|&c| c.max(0) as usize).sum();
    if total * tuple_size != data.len() {
        return Err(Error::shape(format!(
            "{} values for {total} face-vertices of size {tuple_size}",
            data.len()
        )));
    }
    let mut start = 0;
    for &count in face_counts {
        let count = count.max(0) as usize;
        for i in 0..count / 2 {
            let a = (start + i) * tuple_size;
            let b = (start + count - 1 - i) * tuple_size;
            for c in 0..tuple_size {
                data.swap(a + c, b + c);
            }
        }
        start += count;
    }
    Ok(())
}

/// Typed reader over one part's attributes.
#[derive(Clone, Copy)]
pub struct AttributeReader<'a> {
    engine: &'a dyn Engine,
    geo: GeoId,
    part: PartId,
}

impl<'a> AttributeReader<'a> {
    pub fn new(engine: &'a dyn Engine, geo: GeoId, part: PartId) -> Self {
        Self { engine, geo, part }
    }

    /// Attribute names for one owner.
    pub fn names(&self, owner: AttributeOwner) -> Result<Vec<String>> {
        self.engine.attribute_names(self.geo, self.part, owner)
    }

    /// Attribute description for one owner.
    pub fn info(&self, owner: AttributeOwner, name: &str) -> Result<Option<AttributeInfo>> {
        self.engine.attribute_info(self.geo, self.part, owner, name)
    }

    /// Locate an attribute by name. The most specific owner wins:
    /// vertex, then point, primitive, detail.
    pub fn find(&self, name: &str) -> Result<Option<AttributeInfo>> {
        for owner in AttributeOwner::ALL {
            if let Some(info) = self.info(owner, name)? {
                return Ok(Some(info));
            }
        }
        trace!(name, "attribute not present on any owner");
        Ok(None)
    }

    /// Raw values of a described attribute. Missing data maps to `None`.
    pub fn raw(&self, info: &AttributeInfo) -> Result<Option<AttributeValues>> {
        match self.engine.attribute_data(self.geo, self.part, info.owner, &info.name) {
            Ok(values) => Ok(Some(values)),
            Err(Error::AttributeMissing { owner, name }) => {
                trace!(%owner, %name, "attribute vanished between info and data queries");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn read_with<T: Copy>(
        &self,
        owner: AttributeOwner,
        name: &str,
        convert: impl FnOnce(&AttributeValues) -> Option<Vec<T>>,
        expected: &str,
    ) -> Result<Option<TupleArray<T>>> {
        let Some(info) = self.info(owner, name)? else {
            trace!(%owner, name, "attribute missing");
            return Ok(None);
        };
        let Some(values) = self.raw(&info)? else {
            return Ok(None);
        };
        let Some(data) = convert(&values) else {
            warn!(%owner, name, storage = %values.storage(), "attribute is not {expected}, skipped");
            return Ok(None);
        };
        match TupleArray::new(owner, info.tuple_size, data) {
            Ok(array) => Ok(Some(array)),
            Err(e) => {
                warn!(%owner, name, error = %e, "malformed attribute skipped");
                Ok(None)
            }
        }
    }

    /// Read a numeric attribute as `f32` tuples.
    pub fn read_f32(&self, owner: AttributeOwner, name: &str) -> Result<Option<TupleArray<f32>>> {
        self.read_with(owner, name, AttributeValues::to_f32, "numeric")
    }

    /// Read a numeric attribute as `i32` tuples.
    pub fn read_i32(&self, owner: AttributeOwner, name: &str) -> Result<Option<TupleArray<i32>>> {
        self.read_with(owner, name, AttributeValues::to_i32, "numeric")
    }

    /// Read a string attribute.
    pub fn read_strings(&self, owner: AttributeOwner, name: &str) -> Result<Option<TupleArray<String>>> {
        let Some(info) = self.info(owner, name)? else {
            trace!(%owner, name, "attribute missing");
            return Ok(None);
        };
        let Some(values) = self.raw(&info)? else {
            return Ok(None);
        };
        match values {
            AttributeValues::String(data) if info.tuple_size > 0 && data.len() % info.tuple_size == 0 => {
                Ok(Some(TupleArray { owner, tuple_size: info.tuple_size, data }))
            }
            other => {
                warn!(%owner, name, storage = %other.storage(), "attribute is not a string array, skipped");
                Ok(None)
            }
        }
    }

    /// Read a numeric attribute from whichever owner carries it.
    pub fn find_f32(&self, name: &str) -> Result<Option<TupleArray<f32>>> {
        match self.find(name)? {
            Some(info) => self.read_f32(info.owner, name),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad_topology() -> (Vec<i32>, Vec<i32>) {
        // Two triangles sharing an edge.
        (vec![3, 3], vec![0, 1, 2, 0, 2, 3])
    }

    #[test]
    fn test_tuple_array_rejects_partial_tuples() {
        assert!(TupleArray::new(AttributeOwner::Point, 3, vec![0.0f32; 4]).is_err());
        assert!(TupleArray::new(AttributeOwner::Point, 0, Vec::<f32>::new()).is_err());
        let a = TupleArray::new(AttributeOwner::Point, 2, vec![1, 2, 3, 4]).unwrap();
        assert_eq!(a.len(), 2);
        assert_eq!(a.tuple(1), &[3, 4]);
    }

    #[test]
    fn test_string_tuples() {
        let names = TupleArray::new(AttributeOwner::Point, 1, vec!["a".to_string(), "b".to_string()]).unwrap();
        assert_eq!(names.len(), 2);
        assert!(!names.is_empty());
        assert_eq!(names.tuple(1), &["b".to_string()]);
    }

    #[test]
    fn test_resize_tuple() {
        let uvw = TupleArray::new(AttributeOwner::Vertex, 3, vec![0.1f32, 0.2, 0.3, 0.4, 0.5, 0.6]).unwrap();
        assert_eq!(uvw.to_vec2(), vec![Vec2::new(0.1, 0.2), Vec2::new(0.4, 0.5)]);

        let rgb = TupleArray::new(AttributeOwner::Point, 3, vec![1.0f32, 0.0, 0.0]).unwrap();
        assert_eq!(rgb.to_vec4(1.0), vec![Vec4::new(1.0, 0.0, 0.0, 1.0)]);
    }

    #[test]
    fn test_promote_point_to_vertex() {
        let (counts, verts) = quad_topology();
        let topo = Topology { point_count: 4, face_counts: &counts, vertex_list: &verts };
        let ids = TupleArray::new(AttributeOwner::Point, 1, vec![10, 11, 12, 13]).unwrap();
        let v = ids.promote_to_vertex(&topo).unwrap();
        assert_eq!(v.owner, AttributeOwner::Vertex);
        assert_eq!(v.data, vec![10, 11, 12, 10, 12, 13]);
    }

    #[test]
    fn test_promote_primitive_and_detail_to_vertex() {
        let (counts, verts) = quad_topology();
        let topo = Topology { point_count: 4, face_counts: &counts, vertex_list: &verts };
        let prim = TupleArray::new(AttributeOwner::Primitive, 1, vec![7, 8]).unwrap();
        assert_eq!(prim.promote_to_vertex(&topo).unwrap().data, vec![7, 7, 7, 8, 8, 8]);

        let detail = TupleArray::new(AttributeOwner::Detail, 2, vec![1, 2]).unwrap();
        assert_eq!(detail.promote_to_vertex(&topo).unwrap().len(), 6);

        let wrong = TupleArray::new(AttributeOwner::Primitive, 1, vec![7]).unwrap();
        assert!(matches!(wrong.promote_to_vertex(&topo), Err(Error::ShapeMismatch(_))));
    }

    #[test]
    fn test_promote_to_point() {
        let detail = TupleArray::new(AttributeOwner::Detail, 1, vec![0.5f32]).unwrap();
        assert_eq!(detail.promote_to_point(3).unwrap().data, vec![0.5; 3]);
        let prim = TupleArray::new(AttributeOwner::Primitive, 1, vec![0.5f32]).unwrap();
        assert!(prim.promote_to_point(1).is_err());
    }

    #[test]
    fn test_reverse_winding() {
        let (counts, mut verts) = quad_topology();
        reverse_winding(&mut verts, &counts, 1).unwrap();
        assert_eq!(verts, vec![2, 1, 0, 3, 2, 0]);

        let mut uvs = vec![0.0f32, 0.0, 1.0, 0.0, 1.0, 1.0];
        reverse_winding(&mut uvs, &[3], 2).unwrap();
        assert_eq!(uvs, vec![1.0, 1.0, 1.0, 0.0, 0.0, 0.0]);

        assert!(reverse_winding(&mut [0i32; 5], &counts, 1).is_err());
    }

    #[test]
    fn test_topology_validate() {
        let (counts, verts) = quad_topology();
        assert!(Topology { point_count: 4, face_counts: &counts, vertex_list: &verts }.validate().is_ok());
        assert!(Topology { point_count: 3, face_counts: &counts, vertex_list: &verts }.validate().is_err());
        assert!(Topology { point_count: 4, face_counts: &[3], vertex_list: &verts }.validate().is_err());
    }
}
