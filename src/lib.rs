//! # bioscape - decorative biology backdrops
//!
//! Two self-contained 3D components meant to sit behind page content:
//!
//! - [`AmbientParticleField`]: a few translucent red blood cells drifting
//!   slowly, pulsing, and following the page scroll.
//! - [`InteractiveHelixViewer`]: a rotating DNA double helix you can orbit,
//!   zoom, explode into a cloud of atoms and inspect base pair by base pair.
//!
//! ## Quick Start
//!
//! ```no_run
//! use bioscape::prelude::*;
//!
//! let viewer = InteractiveHelixViewer::new(HelixConfig::new().with_speed(1.0));
//! run(viewer, ViewerOptions::new()).unwrap();
//! ```
//!
//! ## Core Concepts
//!
//! ### Hosts
//!
//! A component never talks to the window directly. It is mounted into a
//! [`Host`], which provides the mount element's size, the viewport, the page
//! scroll offset, event listeners, frame callbacks and timeouts. The viewer
//! window implements it on top of winit; [`HeadlessHost`] implements it with
//! a manual clock for tests and benchmarks.
//!
//! ### Backends
//!
//! Meshes and materials are created through a [`RenderBackend`] and referred
//! to by handle. Each frame a component submits a [`Frame`]: camera, lights
//! and a list of draws. [`WgpuBackend`] renders it with wgpu;
//! [`HeadlessBackend`] only records it.
//!
//! ### Lifecycle
//!
//! ```text
//! new(config) -> mount(host, backend) -> events / frames / timers -> unmount
//! ```
//!
//! Mounting never fails loudly: a missing mount element or a backend error
//! is logged and leaves the component inert. Unmounting cancels every frame
//! and timer, removes every listener, releases every mesh and material and
//! then the rendering context itself.
//!
//! ## Helix Controls
//!
//! | Input | Effect |
//! |-------|--------|
//! | Drag | Orbit the camera |
//! | Wheel | Zoom |
//! | Double-click on the helix | Explode / reform |
//! | Click on a base pair | Select it |
//! | Space | Pause / resume rotation |
//! | E | Explode / reform |
//! | R | Reset camera |
//! | C | Toggle detail |
//! | + / - | Rotation speed |
//! | H | Log this help |
//!
//! Built with `--features egui`, the viewer window also shows the helix's
//! on-screen controls: a speed slider (0 to 2), a complexity toggle and a
//! hover card with the table above.
//!
//! ## Performance
//!
//! [`PerformanceMode`] is detected once per component: low-end devices get
//! no antialiasing, pixel ratio 1 and a 30 fps cap on the backdrop.

pub mod backend;
pub mod camera;
pub mod components;
pub mod debounce;
pub mod device;
pub mod error;
pub mod geometry;
mod gpu;
pub mod headless;
pub mod host;
pub mod input;
pub mod scene;
pub mod selection;
pub mod shader;
pub mod spawn;
pub mod time;
pub mod visuals;
pub mod window;

pub use backend::{MaterialHandle, MeshHandle, RenderBackend, RendererOptions};
pub use components::cells::{AmbientParticleField, CellFieldConfig};
pub use components::helix::{Complexity, HelixConfig, InteractiveHelixViewer};
pub use components::Component;
pub use device::PerformanceMode;
pub use error::{BackendError, GpuError, MountError, ViewerError};
pub use glam::{Vec2, Vec3};
pub use gpu::WgpuBackend;
pub use headless::{HeadlessBackend, HeadlessHost};
pub use host::{Host, HostEvent, Viewport};
pub use scene::Frame;
pub use window::{run, ViewerOptions};

#[cfg(feature = "egui")]
pub use egui;

/// Convenient re-exports for common usage.
///
/// # Usage
///
/// ```ignore
/// use bioscape::prelude::*;
/// ```
///
/// This imports:
/// - [`AmbientParticleField`] and [`InteractiveHelixViewer`] with their configs
/// - [`run`] and [`ViewerOptions`] - the desktop viewer
/// - [`Component`], [`Host`], [`RenderBackend`] - the seams, for custom hosts
/// - [`HeadlessHost`], [`HeadlessBackend`] - for tests
pub mod prelude {
    pub use crate::backend::{RenderBackend, RendererOptions};
    pub use crate::components::cells::{AmbientParticleField, CellFieldConfig};
    pub use crate::components::helix::{Complexity, HelixConfig, InteractiveHelixViewer};
    pub use crate::components::Component;
    pub use crate::device::PerformanceMode;
    pub use crate::headless::{HeadlessBackend, HeadlessHost};
    pub use crate::host::{EventKind, Host, HostEvent};
    pub use crate::input::{Key, MouseButton};
    pub use crate::window::{run, ViewerOptions};
    pub use crate::{Vec2, Vec3};
}
