use crate::{EulerRot, Mat3, Mat4, Quat, Vec3};

/// Rigid transform with uniform or non-uniform scale (Euler XYZ).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    /// Euler angles in radians (XYZ order).
    pub rotation_euler: Vec3,
    pub scale: Vec3,
}

impl Transform {
    #[inline]
    pub const fn identity() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation_euler: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }

    #[inline]
    pub fn from_trs(translation: Vec3, rotation_euler: Vec3, scale: Vec3) -> Self {
        Self {
            translation,
            rotation_euler,
            scale,
        }
    }

    /// Placement used for freshly loaded models: position + Euler rotation, unit scale.
    #[inline]
    pub fn from_position_rotation(position: [f32; 3], rotation: [f32; 3]) -> Self {
        Self::from_trs(Vec3::from(position), Vec3::from(rotation), Vec3::ONE)
    }

    #[inline]
    pub fn rotation(&self) -> Quat {
        Quat::from_euler(
            EulerRot::XYZ,
            self.rotation_euler.x,
            self.rotation_euler.y,
            self.rotation_euler.z,
        )
    }

    /// Build matrix = T * R * S (column-major Mat4 per glam).
    #[inline]
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation(), self.translation)
    }

    /// Inverse-transpose of the upper 3x3, for transforming normals.
    pub fn normal_matrix(&self) -> Mat4 {
        let m3 = Mat3::from_mat4(self.matrix());
        let inv_t = if m3.determinant().abs() > f32::EPSILON {
            m3.inverse().transpose()
        } else {
            Mat3::IDENTITY
        };
        Mat4::from_mat3(inv_t)
    }

    #[inline]
    pub fn translate(&mut self, delta: Vec3) {
        self.translation += delta;
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}
