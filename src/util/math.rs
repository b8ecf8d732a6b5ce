//! Math type re-exports and transform conventions.
//!
//! The engine hands out transforms as position / rotation quaternion / scale
//! triples ([`Transform`]). The host wants translate / euler rotate / scale
//! channels ([`TransformRecord`]), with rotations in radians applied in XYZ
//! order (X first).

pub use glam::{EulerRot, Mat4, Quat, Vec2, Vec3, Vec4};

use serde::{Deserialize, Serialize};

/// Engine-space transform.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    /// Identity transform.
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    /// Pure translation.
    pub fn from_translation(position: Vec3) -> Self {
        Self { position, ..Self::IDENTITY }
    }

    /// Compose into a 4x4 matrix (scale, then rotate, then translate).
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Host-space transform channels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TransformRecord {
    pub translate: Vec3,
    /// Euler angles in radians, XYZ rotate order.
    pub rotate: Vec3,
    pub scale: Vec3,
}

impl TransformRecord {
    /// Identity channels.
    pub const IDENTITY: Self = Self {
        translate: Vec3::ZERO,
        rotate: Vec3::ZERO,
        scale: Vec3::ONE,
    };

    /// Decompose an engine transform into host channels.
    pub fn from_transform(t: &Transform) -> Self {
        // XYZ rotate order applies X first, which is glam's intrinsic ZYX.
        let (z, y, x) = t.rotation.normalize().to_euler(EulerRot::ZYX);
        Self {
            translate: t.position,
            rotate: Vec3::new(x, y, z),
            scale: t.scale,
        }
    }

    /// Rebuild the 4x4 matrix these channels describe.
    pub fn matrix(&self) -> Mat4 {
        let rotation = Quat::from_euler(EulerRot::ZYX, self.rotate.z, self.rotate.y, self.rotate.x);
        Mat4::from_scale_rotation_translation(self.scale, rotation, self.translate)
    }
}

impl Default for TransformRecord {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl From<&Transform> for TransformRecord {
    fn from(t: &Transform) -> Self {
        Self::from_transform(t)
    }
}

/// Safely cast a slice to a slice of type T.
/// Returns None if the data is misaligned or has wrong size.
#[inline]
pub fn safe_cast_slice<A: bytemuck::Pod, T: bytemuck::Pod>(data: &[A]) -> Option<&[T]> {
    bytemuck::try_cast_slice(data).ok()
}
