//! Mountable backdrop components.
//!
//! A component owns nothing until [`Component::mount`] and owns nothing
//! again after [`Component::unmount`]. In between, the host calls back
//! into it through the three entry points below, and only for listeners,
//! frames and timers the component itself asked for.
//!
//! - [`cells::AmbientParticleField`]: drifting blood cells behind content.
//! - [`helix::InteractiveHelixViewer`]: a DNA double helix to play with.

pub mod cells;
pub mod helix;

use crate::backend::{RenderBackend, RendererOptions};
use crate::host::{FrameHandle, Host, HostEvent, TimerHandle};

/// Lifecycle and callbacks shared by every component.
pub trait Component {
    /// Short name used in logs and the window title.
    fn name(&self) -> &'static str;

    /// Context options the backend should be created with.
    fn renderer_options(&self) -> RendererOptions {
        RendererOptions::default()
    }

    /// Build the scene and start animating.
    ///
    /// Never fails outward: a missing mount element, an empty one or a
    /// backend error is logged and leaves the component inert.
    fn mount(&mut self, host: &mut dyn Host, backend: &mut dyn RenderBackend);

    fn handle_event(
        &mut self,
        event: &HostEvent,
        host: &mut dyn Host,
        backend: &mut dyn RenderBackend,
    );

    fn on_timer(
        &mut self,
        handle: TimerHandle,
        host: &mut dyn Host,
        backend: &mut dyn RenderBackend,
    );

    /// A requested frame arrived. `timestamp_ms` is the host's clock.
    fn on_frame(
        &mut self,
        handle: FrameHandle,
        timestamp_ms: f64,
        host: &mut dyn Host,
        backend: &mut dyn RenderBackend,
    );

    /// Cancel every callback, remove every listener and release every
    /// resource, including the backend context. Safe to call twice.
    fn unmount(&mut self, host: &mut dyn Host, backend: &mut dyn RenderBackend);

    fn is_mounted(&self) -> bool;

    /// Draw on-screen controls. Called once per redraw, ahead of the frame
    /// callback; the default draws nothing.
    #[cfg(feature = "egui")]
    fn ui(&mut self, _ctx: &egui::Context, _backend: &mut dyn RenderBackend) {}
}
