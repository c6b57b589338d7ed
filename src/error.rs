//! Error types for bioscape.
//!
//! Components never surface these to the page: a failed mount is logged and
//! the component stays inert. They exist so the backend and the viewer loop
//! can propagate failures with `?` up to the point where that decision is made.

use std::fmt;

/// Errors that can occur during GPU initialization.
#[derive(Debug)]
pub enum GpuError {
    /// Failed to create a surface for rendering.
    SurfaceCreation(wgpu::CreateSurfaceError),
    /// No compatible GPU adapter found.
    NoAdapter(wgpu::RequestAdapterError),
    /// Failed to create GPU device.
    DeviceCreation(wgpu::RequestDeviceError),
    /// The surface reports no usable texture format.
    NoSurfaceFormat,
}

impl fmt::Display for GpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuError::SurfaceCreation(e) => write!(f, "Failed to create GPU surface: {}", e),
            GpuError::NoAdapter(e) => write!(f, "No compatible GPU adapter found: {}", e),
            GpuError::DeviceCreation(e) => write!(f, "Failed to create GPU device: {}", e),
            GpuError::NoSurfaceFormat => write!(f, "Surface does not expose any texture format"),
        }
    }
}

impl std::error::Error for GpuError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GpuError::SurfaceCreation(e) => Some(e),
            GpuError::NoAdapter(e) => Some(e),
            GpuError::DeviceCreation(e) => Some(e),
            GpuError::NoSurfaceFormat => None,
        }
    }
}

impl From<wgpu::CreateSurfaceError> for GpuError {
    fn from(e: wgpu::CreateSurfaceError) -> Self {
        GpuError::SurfaceCreation(e)
    }
}

impl From<wgpu::RequestAdapterError> for GpuError {
    fn from(e: wgpu::RequestAdapterError) -> Self {
        GpuError::NoAdapter(e)
    }
}

impl From<wgpu::RequestDeviceError> for GpuError {
    fn from(e: wgpu::RequestDeviceError) -> Self {
        GpuError::DeviceCreation(e)
    }
}

/// Errors reported by a [`RenderBackend`](crate::backend::RenderBackend).
#[derive(Debug)]
pub enum BackendError {
    /// Mesh has no vertices, no indices, or indices out of range.
    InvalidMesh(String),
    /// A handle that was never created or was already released.
    UnknownHandle,
    /// The rendering context has been released; nothing more can be created.
    ContextReleased,
    /// Acquiring the next surface texture failed.
    Surface(wgpu::SurfaceError),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::InvalidMesh(msg) => write!(f, "Invalid mesh: {}", msg),
            BackendError::UnknownHandle => write!(f, "Unknown or released resource handle"),
            BackendError::ContextReleased => write!(f, "Rendering context already released"),
            BackendError::Surface(e) => write!(f, "Surface error: {}", e),
        }
    }
}

impl std::error::Error for BackendError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BackendError::Surface(e) => Some(e),
            _ => None,
        }
    }
}

impl From<wgpu::SurfaceError> for BackendError {
    fn from(e: wgpu::SurfaceError) -> Self {
        BackendError::Surface(e)
    }
}

/// Reasons a component declined to mount.
///
/// Never returned from [`Component::mount`](crate::components::Component::mount);
/// logged there instead.
#[derive(Debug)]
pub enum MountError {
    /// The host has no mount element, or it measures zero area.
    NoMountBox,
    /// The component is already mounted.
    AlreadyMounted,
    /// A configuration value the scene cannot be built from.
    InvalidConfig(String),
    /// Creating a graphical resource failed.
    Backend(BackendError),
}

impl fmt::Display for MountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MountError::NoMountBox => write!(f, "No mount element with a measurable box"),
            MountError::AlreadyMounted => write!(f, "Component is already mounted"),
            MountError::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
            MountError::Backend(e) => write!(f, "Resource acquisition failed: {}", e),
        }
    }
}

impl std::error::Error for MountError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MountError::Backend(e) => Some(e),
            _ => None,
        }
    }
}

impl From<BackendError> for MountError {
    fn from(e: BackendError) -> Self {
        MountError::Backend(e)
    }
}

/// Errors that can occur when running the viewer window.
#[derive(Debug)]
pub enum ViewerError {
    /// Failed to create event loop.
    EventLoop(winit::error::EventLoopError),
    /// Failed to create window.
    Window(winit::error::OsError),
}

impl fmt::Display for ViewerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewerError::EventLoop(e) => write!(f, "Failed to create event loop: {}", e),
            ViewerError::Window(e) => write!(f, "Failed to create window: {}", e),
        }
    }
}

impl std::error::Error for ViewerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ViewerError::EventLoop(e) => Some(e),
            ViewerError::Window(e) => Some(e),
        }
    }
}

impl From<winit::error::EventLoopError> for ViewerError {
    fn from(e: winit::error::EventLoopError) -> Self {
        ViewerError::EventLoop(e)
    }
}

impl From<winit::error::OsError> for ViewerError {
    fn from(e: winit::error::OsError) -> Self {
        ViewerError::Window(e)
    }
}
