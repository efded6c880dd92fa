use glam::{Mat4, Quat, Vec3};

/// Position, rotation and scale of a model root or a camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    pub fn new(position: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self { position, rotation, scale }
    }

    pub fn from_position(position: Vec3) -> Self {
        Self { position, ..Self::default() }
    }

    /// Model matrix (translation * rotation * scale)
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// View matrix of a camera placed with this transform.
    ///
    /// The camera translation is applied first, then its rotation, so the
    /// position is expressed in the camera's rotated frame.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_quat(self.rotation) * Mat4::from_translation(self.position) * Mat4::from_scale(self.scale)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

#[cfg(test)]
#[path = "transform_tests.rs"]
mod tests;
