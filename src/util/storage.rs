//! Storage types, owners and raw value arrays - the vocabulary shared by the
//! engine boundary and the attribute transfer layer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Storage type of an engine attribute.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum StorageType {
    /// Signed 32-bit integer
    Int = 0,
    /// Signed 64-bit integer
    Int64 = 1,
    /// 32-bit floating point
    Float = 2,
    /// 64-bit floating point
    Float64 = 3,
    /// UTF-8 string
    String = 4,
    /// Unknown/invalid type
    #[default]
    Invalid = 127,
}

impl StorageType {
    /// Returns the name of this type as a string.
    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Int64 => "int64",
            Self::Float => "float",
            Self::Float64 => "float64",
            Self::String => "string",
            Self::Invalid => "invalid",
        }
    }

    /// Returns true if this is a numeric type (int or float).
    #[inline]
    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Int | Self::Int64 | Self::Float | Self::Float64)
    }

    /// Returns true if this is an integer type.
    #[inline]
    pub const fn is_integer(self) -> bool {
        matches!(self, Self::Int | Self::Int64)
    }

    /// Returns true if this is a floating point type.
    #[inline]
    pub const fn is_float(self) -> bool {
        matches!(self, Self::Float | Self::Float64)
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Element class an attribute is attached to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AttributeOwner {
    /// One value per face-vertex.
    Vertex,
    /// One value per point.
    Point,
    /// One value per primitive (face, curve, volume...).
    Primitive,
    /// A single value for the whole part.
    Detail,
}

impl AttributeOwner {
    /// All owners, in enumeration order.
    pub const ALL: [Self; 4] = [Self::Vertex, Self::Point, Self::Primitive, Self::Detail];

    /// Returns the name of this owner as a string.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Vertex => "vertex",
            Self::Point => "point",
            Self::Primitive => "primitive",
            Self::Detail => "detail",
        }
    }
}

impl fmt::Display for AttributeOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Element class a named group collects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GroupType {
    /// Group of points.
    Point,
    /// Group of primitives.
    Primitive,
}

impl GroupType {
    /// All group types, in enumeration order.
    pub const ALL: [Self; 2] = [Self::Point, Self::Primitive];

    /// Returns the name of this group type as a string.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Point => "point",
            Self::Primitive => "primitive",
        }
    }
}

impl fmt::Display for GroupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Raw attribute values as handed over by the engine, flattened tuple by tuple.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AttributeValues {
    Int(Vec<i32>),
    Int64(Vec<i64>),
    Float(Vec<f32>),
    Float64(Vec<f64>),
    String(Vec<String>),
}

impl AttributeValues {
    /// Storage type of these values.
    pub fn storage(&self) -> StorageType {
        match self {
            Self::Int(_) => StorageType::Int,
            Self::Int64(_) => StorageType::Int64,
            Self::Float(_) => StorageType::Float,
            Self::Float64(_) => StorageType::Float64,
            Self::String(_) => StorageType::String,
        }
    }

    /// Number of scalar values (tuples * tuple size).
    pub fn len(&self) -> usize {
        match self {
            Self::Int(v) => v.len(),
            Self::Int64(v) => v.len(),
            Self::Float(v) => v.len(),
            Self::Float64(v) => v.len(),
            Self::String(v) => v.len(),
        }
    }

    /// Check if there are no values.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Convert numeric values to `f32`. Returns `None` for strings.
    pub fn to_f32(&self) -> Option<Vec<f32>> {
        match self {
            Self::Int(v) => Some(v.iter().map(|&x| x as f32).collect()),
            Self::Int64(v) => Some(v.iter().map(|&x| x as f32).collect()),
            Self::Float(v) => Some(v.clone()),
            Self::Float64(v) => Some(v.iter().map(|&x| x as f32).collect()),
            Self::String(_) => None,
        }
    }

    /// Convert numeric values to `i32`. Floats are truncated; 64-bit
    /// integers saturate. Returns `None` for strings.
    pub fn to_i32(&self) -> Option<Vec<i32>> {
        match self {
            Self::Int(v) => Some(v.clone()),
            Self::Int64(v) => Some(
                v.iter()
                    .map(|&x| x.clamp(i32::MIN as i64, i32::MAX as i64) as i32)
                    .collect(),
            ),
            Self::Float(v) => Some(v.iter().map(|&x| x as i32).collect()),
            Self::Float64(v) => Some(v.iter().map(|&x| x as i32).collect()),
            Self::String(_) => None,
        }
    }

    /// Borrow string values. Returns `None` for numeric storage.
    pub fn as_strings(&self) -> Option<&[String]> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }
}
