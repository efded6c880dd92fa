/// Camera - a viewpoint rendering into one window

use glam::Mat4;
use crate::render::{CameraType, WindowIndex};
use crate::utils::Transform;

/// Projection parameters, tagged by camera type
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    Perspective { fov: f32, aspect: f32, near: f32, far: f32 },
    Orthographic { width: f32, height: f32, near: f32, far: f32 },
}

impl Projection {
    pub fn camera_type(&self) -> CameraType {
        match self {
            Projection::Perspective { .. } => CameraType::PERSPECTIVE,
            Projection::Orthographic { .. } => CameraType::ORTHOGRAPHIC,
        }
    }

    /// Projection matrix (right-handed, depth range 0..1)
    ///
    /// The orthographic volume is centered on the view axis.
    pub fn matrix(&self) -> Mat4 {
        match *self {
            Projection::Perspective { fov, aspect, near, far } => {
                Mat4::perspective_rh(fov, aspect, near, far)
            }
            Projection::Orthographic { width, height, near, far } => Mat4::orthographic_rh(
                -width / 2.0,
                width / 2.0,
                -height / 2.0,
                height / 2.0,
                near,
                far,
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub enabled: bool,
    /// Swapchain slot this camera renders into
    pub window: WindowIndex,
    pub transform: Transform,
    pub projection: Projection,
}

impl Camera {
    pub fn new(window: WindowIndex, projection: Projection, transform: Transform) -> Self {
        Self {
            enabled: true,
            window,
            transform,
            projection,
        }
    }

    pub fn camera_type(&self) -> CameraType {
        self.projection.camera_type()
    }

    pub fn view_matrix(&self) -> Mat4 {
        self.transform.view_matrix()
    }

    /// Follow a new window extent; orthographic cameras keep their explicit size
    pub fn update_aspect(&mut self, aspect_ratio: f32) {
        if let Projection::Perspective { aspect, .. } = &mut self.projection {
            *aspect = aspect_ratio;
        }
    }
}

#[cfg(test)]
#[path = "camera_tests.rs"]
mod tests;
