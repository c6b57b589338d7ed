//! The seam between components and whatever draws them.
//!
//! Components create meshes and materials through a [`RenderBackend`] and
//! refer to them by handle; the backend owns the actual resources. Every
//! `create_*` must be paired with a `release_*` before the component lets
//! go, and [`RenderBackend::release`] tears down the context itself.

use crate::error::BackendError;
use crate::geometry::Mesh;
use crate::scene::Frame;
use crate::visuals::Material;

/// Opaque handle to an uploaded mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshHandle(pub u32);

/// Opaque handle to a material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialHandle(pub u32);

/// Context options fixed at creation, like a WebGL context's attributes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RendererOptions {
    /// Multisample the scene (4x) when true.
    pub antialias: bool,
    /// Clear to transparent and composite with premultiplied alpha if the
    /// surface allows it.
    pub transparent: bool,
}

impl Default for RendererOptions {
    fn default() -> Self {
        Self {
            antialias: true,
            transparent: true,
        }
    }
}

impl RendererOptions {
    pub fn sample_count(&self) -> u32 {
        if self.antialias {
            4
        } else {
            1
        }
    }
}

/// Resource owner and frame renderer.
pub trait RenderBackend {
    fn create_mesh(&mut self, mesh: &Mesh) -> Result<MeshHandle, BackendError>;

    fn create_material(&mut self, material: &Material) -> Result<MaterialHandle, BackendError>;

    /// Replace a material's parameters in place.
    fn update_material(
        &mut self,
        handle: MaterialHandle,
        material: &Material,
    ) -> Result<(), BackendError>;

    /// Releasing an unknown handle is a no-op.
    fn release_mesh(&mut self, handle: MeshHandle);

    fn release_material(&mut self, handle: MaterialHandle);

    /// Render resolution multiplier over the logical output size.
    fn set_pixel_ratio(&mut self, ratio: f32);

    fn pixel_ratio(&self) -> f32;

    /// Set the logical output size.
    fn set_size(&mut self, width: u32, height: u32);

    /// Logical output size as last set.
    fn output_size(&self) -> (u32, u32);

    fn render(&mut self, frame: &Frame) -> Result<(), BackendError>;

    /// Drop every remaining resource and the context. Idempotent.
    fn release(&mut self);
}
