//! Per-frame draw description handed to a render backend.
//!
//! Components rebuild a [`Frame`] every rendered tick. It holds no resources
//! itself, only handles into the backend that owns them.

use glam::{EulerRot, Mat4, Quat, Vec3};

use crate::backend::{MaterialHandle, MeshHandle};
use crate::visuals::{Color, Light};

/// Position, Euler rotation (radians, XYZ order) and per-axis scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        translation: Vec3::ZERO,
        rotation: Vec3::ZERO,
        scale: Vec3::ONE,
    };

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    pub fn with_rotation(mut self, rotation: Vec3) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_uniform_scale(mut self, scale: f32) -> Self {
        self.scale = Vec3::splat(scale);
        self
    }

    pub fn quat(&self) -> Quat {
        Quat::from_euler(EulerRot::XYZ, self.rotation.x, self.rotation.y, self.rotation.z)
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.quat(), self.translation)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// One mesh instance to draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawItem {
    pub mesh: MeshHandle,
    pub material: MaterialHandle,
    pub model: Mat4,
}

/// Camera matrices for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraView {
    pub view: Mat4,
    pub projection: Mat4,
    pub position: Vec3,
}

impl CameraView {
    pub fn view_proj(&self) -> Mat4 {
        self.projection * self.view
    }
}

/// Everything a backend needs to render one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub camera: CameraView,
    pub lights: Vec<Light>,
    /// Clear colour and alpha; alpha 0 leaves the backdrop transparent.
    pub clear: (Color, f32),
    pub draws: Vec<DrawItem>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_transform_matrix_order() {
        // Scale, then rotate, then translate
        let t = Transform::from_translation(Vec3::new(10.0, 0.0, 0.0))
            .with_rotation(Vec3::new(0.0, 0.0, std::f32::consts::FRAC_PI_2))
            .with_uniform_scale(2.0);
        let p = t.matrix().transform_point3(Vec3::X);
        assert_relative_eq!(p.x, 10.0, epsilon = 1e-5);
        assert_relative_eq!(p.y, 2.0, epsilon = 1e-5);
    }
}
