//! The page a component is mounted into.
//!
//! A [`Host`] is everything a component may ask of its surroundings: the size
//! of its mount element, the viewport, page scroll, event listeners, frame
//! callbacks and timeouts. The viewer window implements it on top of winit
//! ([`crate::window`]) and [`crate::headless::HeadlessHost`] implements it for
//! tests, counting every registration so leaks are observable.
//!
//! Events only reach a component through a listener it registered. Frame and
//! timer callbacks only reach it through a handle it requested.

use glam::Vec2;

use crate::input::{Key, MouseButton};

/// Handle for a registered event listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

/// Handle for a pending next-frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameHandle(pub u64);

/// Handle for a pending timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(pub u64);

/// Event categories a component can listen for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Scroll,
    Resize,
    PointerDown,
    PointerUp,
    PointerMove,
    Wheel,
    DoubleClick,
    KeyDown,
}

/// An input event delivered to a listening component.
///
/// Pointer positions are in logical pixels relative to the mount element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HostEvent {
    /// The page scroll offset changed; read it from [`Host::scroll_offset`].
    Scroll,
    /// The viewport or mount element changed size; read it from the host.
    Resize,
    PointerDown { position: Vec2, button: MouseButton },
    PointerUp { position: Vec2, button: MouseButton },
    PointerMove { position: Vec2 },
    /// Positive `delta_y` scrolls down / zooms out, matching DOM wheel events.
    Wheel { delta_y: f32 },
    DoubleClick { position: Vec2 },
    KeyDown { key: Key },
}

impl HostEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            HostEvent::Scroll => EventKind::Scroll,
            HostEvent::Resize => EventKind::Resize,
            HostEvent::PointerDown { .. } => EventKind::PointerDown,
            HostEvent::PointerUp { .. } => EventKind::PointerUp,
            HostEvent::PointerMove { .. } => EventKind::PointerMove,
            HostEvent::Wheel { .. } => EventKind::Wheel,
            HostEvent::DoubleClick { .. } => EventKind::DoubleClick,
            HostEvent::KeyDown { .. } => EventKind::KeyDown,
        }
    }
}

/// Measured size of the element a component renders into, in logical pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MountBox {
    pub width: f32,
    pub height: f32,
}

impl MountBox {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Width over height. Callers must check [`is_empty`](Self::is_empty) first.
    pub fn aspect(&self) -> f32 {
        self.width / self.height
    }

    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    /// Size rounded to whole pixels for the renderer.
    pub fn pixel_size(&self) -> (u32, u32) {
        (self.width.round().max(1.0) as u32, self.height.round().max(1.0) as u32)
    }
}

/// Browser-window equivalent: inner size in logical pixels and device pixel ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    pub device_pixel_ratio: f32,
}

/// Cursor shapes a component may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorStyle {
    #[default]
    Default,
    Pointer,
}

/// Services a mounted component may use.
pub trait Host {
    /// The mount element's box, or `None` if there is no mount element.
    fn mount_box(&self) -> Option<MountBox>;

    fn viewport(&self) -> Viewport;

    /// Current page scroll offset in logical pixels.
    fn scroll_offset(&self) -> Vec2;

    fn add_listener(&mut self, kind: EventKind) -> ListenerId;

    /// Removing an unknown id is a no-op.
    fn remove_listener(&mut self, id: ListenerId);

    /// Schedule one callback for the next display frame.
    fn request_frame(&mut self) -> FrameHandle;

    fn cancel_frame(&mut self, handle: FrameHandle);

    fn set_timeout(&mut self, delay: std::time::Duration) -> TimerHandle;

    fn clear_timeout(&mut self, handle: TimerHandle);

    fn set_cursor(&mut self, cursor: CursorStyle);
}

/// Listeners owned by one mounted component.
///
/// Registered together on mount and removed together on unmount, so a
/// component can never leave a listener behind.
#[derive(Debug, Default)]
pub struct ListenerSet {
    ids: Vec<(EventKind, ListenerId)>,
}

impl ListenerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one listener per kind.
    pub fn register(host: &mut dyn Host, kinds: &[EventKind]) -> Self {
        let ids = kinds.iter().map(|&kind| (kind, host.add_listener(kind))).collect();
        Self { ids }
    }

    pub fn listens_to(&self, kind: EventKind) -> bool {
        self.ids.iter().any(|(k, _)| *k == kind)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Deregister every listener. Safe to call twice.
    pub fn remove_all(&mut self, host: &mut dyn Host) {
        for (_, id) in self.ids.drain(..) {
            host.remove_listener(id);
        }
    }
}

/// The one outstanding frame callback of a component.
#[derive(Debug, Default)]
pub struct FrameLoop {
    pending: Option<FrameHandle>,
}

impl FrameLoop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request the next frame, replacing any earlier request.
    pub fn schedule(&mut self, host: &mut dyn Host) {
        if let Some(previous) = self.pending.take() {
            host.cancel_frame(previous);
        }
        self.pending = Some(host.request_frame());
    }

    /// Consume `handle` if it is the one this loop is waiting for.
    pub fn accept(&mut self, handle: FrameHandle) -> bool {
        if self.pending == Some(handle) {
            self.pending = None;
            true
        } else {
            false
        }
    }

    pub fn cancel(&mut self, host: &mut dyn Host) {
        if let Some(handle) = self.pending.take() {
            host.cancel_frame(handle);
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kind_mapping() {
        let ev = HostEvent::Wheel { delta_y: 1.0 };
        assert_eq!(ev.kind(), EventKind::Wheel);
        let ev = HostEvent::KeyDown { key: Key::Space };
        assert_eq!(ev.kind(), EventKind::KeyDown);
    }

    #[test]
    fn test_mount_box_empty() {
        assert!(MountBox::new(0.0, 100.0).is_empty());
        assert!(MountBox::new(100.0, f32::NAN).is_empty());
        assert!(!MountBox::new(10.0, 10.0).is_empty());
        assert_eq!(MountBox::new(799.6, 600.2).pixel_size(), (800, 600));
    }
}
