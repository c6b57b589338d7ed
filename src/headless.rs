//! Windowless host and backend.
//!
//! [`HeadlessHost`] runs a virtual clock and records every listener, frame
//! request and timeout; [`HeadlessBackend`] records every resource and the
//! last rendered [`Frame`]. Together they drive a component exactly as the
//! window does, deterministically, and expose the counts that prove an
//! unmount left nothing behind.
//!
//! ```
//! use bioscape::components::{cells::{AmbientParticleField, CellFieldConfig}, Component};
//! use bioscape::headless::{HeadlessBackend, HeadlessHost};
//!
//! let mut host = HeadlessHost::new(1280.0, 720.0);
//! let mut backend = HeadlessBackend::new();
//! let mut field = AmbientParticleField::new(CellFieldConfig::new().with_seed(7));
//!
//! field.mount(&mut host, &mut backend);
//! host.run_frames(&mut field, &mut backend, 10, 20.0);
//! field.unmount(&mut host, &mut backend);
//!
//! assert_eq!(host.listener_count(), 0);
//! assert_eq!(host.pending_frames(), 0);
//! assert_eq!(backend.live_meshes(), 0);
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use glam::Vec2;

use crate::backend::{MaterialHandle, MeshHandle, RenderBackend};
use crate::components::Component;
use crate::error::BackendError;
use crate::geometry::Mesh;
use crate::host::{
    CursorStyle, EventKind, FrameHandle, Host, HostEvent, ListenerId, MountBox, TimerHandle,
    Viewport,
};
use crate::scene::Frame;
use crate::visuals::Material;

/// Host with a virtual clock and instrumented registrations.
#[derive(Debug)]
pub struct HeadlessHost {
    mount: Option<MountBox>,
    viewport: Viewport,
    scroll: Vec2,
    now_ms: f64,
    next_id: u64,
    listeners: BTreeMap<ListenerId, EventKind>,
    frames: BTreeSet<FrameHandle>,
    timers: BTreeMap<TimerHandle, f64>,
    cursor: CursorStyle,
}

impl HeadlessHost {
    /// A page whose mount element fills a `width x height` viewport.
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            mount: Some(MountBox::new(width, height)),
            viewport: Viewport {
                width,
                height,
                device_pixel_ratio: 1.0,
            },
            scroll: Vec2::ZERO,
            now_ms: 0.0,
            next_id: 1,
            listeners: BTreeMap::new(),
            frames: BTreeSet::new(),
            timers: BTreeMap::new(),
            cursor: CursorStyle::Default,
        }
    }

    /// A page with no mount element at all.
    pub fn without_mount(width: f32, height: f32) -> Self {
        Self {
            mount: None,
            ..Self::new(width, height)
        }
    }

    pub fn with_device_pixel_ratio(mut self, ratio: f32) -> Self {
        self.viewport.device_pixel_ratio = ratio;
        self
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    // ========== Instrumentation ==========

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn listener_count_for(&self, kind: EventKind) -> usize {
        self.listeners.values().filter(|&&k| k == kind).count()
    }

    pub fn pending_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    pub fn cursor(&self) -> CursorStyle {
        self.cursor
    }

    pub fn now_ms(&self) -> f64 {
        self.now_ms
    }

    // ========== Page state (no events) ==========

    pub fn set_scroll(&mut self, offset: Vec2) {
        self.scroll = offset;
    }

    /// Resize both the viewport and the mount element.
    pub fn set_size(&mut self, width: f32, height: f32) {
        self.viewport.width = width;
        self.viewport.height = height;
        if self.mount.is_some() {
            self.mount = Some(MountBox::new(width, height));
        }
    }

    /// Timers due at or before `now_ms`, earliest first, removed from the host.
    pub fn take_due_timers(&mut self, now_ms: f64) -> Vec<TimerHandle> {
        let mut due: Vec<(f64, TimerHandle)> = self
            .timers
            .iter()
            .filter(|(_, &deadline)| deadline <= now_ms)
            .map(|(&handle, &deadline)| (deadline, handle))
            .collect();
        due.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        for (_, handle) in &due {
            self.timers.remove(handle);
        }
        due.into_iter().map(|(_, handle)| handle).collect()
    }

    // ========== Driving a component ==========

    /// Deliver `event` if the component has a listener for its kind.
    pub fn dispatch<C: Component + ?Sized>(
        &mut self,
        component: &mut C,
        backend: &mut dyn RenderBackend,
        event: HostEvent,
    ) -> bool {
        let kind = event.kind();
        if !self.listeners.values().any(|&k| k == kind) {
            return false;
        }
        component.handle_event(&event, self, backend);
        true
    }

    /// Scroll the page and fire a Scroll event.
    pub fn scroll_to<C: Component + ?Sized>(
        &mut self,
        component: &mut C,
        backend: &mut dyn RenderBackend,
        offset: Vec2,
    ) -> bool {
        self.scroll = offset;
        self.dispatch(component, backend, HostEvent::Scroll)
    }

    /// Resize the page and fire a Resize event.
    pub fn resize_to<C: Component + ?Sized>(
        &mut self,
        component: &mut C,
        backend: &mut dyn RenderBackend,
        width: f32,
        height: f32,
    ) -> bool {
        self.set_size(width, height);
        self.dispatch(component, backend, HostEvent::Resize)
    }

    /// Move the clock forward by `ms`, firing due timers in order and then
    /// the pending frame callback, if any.
    pub fn advance<C: Component + ?Sized>(
        &mut self,
        component: &mut C,
        backend: &mut dyn RenderBackend,
        ms: f64,
    ) {
        let target = self.now_ms + ms;
        loop {
            let next = self
                .timers
                .iter()
                .map(|(&handle, &deadline)| (deadline, handle))
                .filter(|(deadline, _)| *deadline <= target)
                .min_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
            let Some((deadline, handle)) = next else { break };
            self.timers.remove(&handle);
            self.now_ms = self.now_ms.max(deadline);
            component.on_timer(handle, self, backend);
        }
        self.now_ms = target;

        let pending: Vec<FrameHandle> = std::mem::take(&mut self.frames).into_iter().collect();
        for handle in pending {
            component.on_frame(handle, self.now_ms, self, backend);
        }
    }

    /// `count` frames, `frame_ms` apart.
    pub fn run_frames<C: Component + ?Sized>(
        &mut self,
        component: &mut C,
        backend: &mut dyn RenderBackend,
        count: usize,
        frame_ms: f64,
    ) {
        for _ in 0..count {
            self.advance(component, backend, frame_ms);
        }
    }
}

impl Host for HeadlessHost {
    fn mount_box(&self) -> Option<MountBox> {
        self.mount
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn scroll_offset(&self) -> Vec2 {
        self.scroll
    }

    fn add_listener(&mut self, kind: EventKind) -> ListenerId {
        let id = ListenerId(self.next_id());
        self.listeners.insert(id, kind);
        id
    }

    fn remove_listener(&mut self, id: ListenerId) {
        self.listeners.remove(&id);
    }

    fn request_frame(&mut self) -> FrameHandle {
        let handle = FrameHandle(self.next_id());
        self.frames.insert(handle);
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        self.frames.remove(&handle);
    }

    fn set_timeout(&mut self, delay: Duration) -> TimerHandle {
        let handle = TimerHandle(self.next_id());
        self.timers.insert(handle, self.now_ms + delay.as_secs_f64() * 1000.0);
        handle
    }

    fn clear_timeout(&mut self, handle: TimerHandle) {
        self.timers.remove(&handle);
    }

    fn set_cursor(&mut self, cursor: CursorStyle) {
        self.cursor = cursor;
    }
}

/// Size of an uploaded mesh, kept for inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshInfo {
    pub vertices: usize,
    pub triangles: usize,
}

/// Backend that records resources and frames instead of drawing.
#[derive(Debug)]
pub struct HeadlessBackend {
    meshes: BTreeMap<MeshHandle, MeshInfo>,
    materials: BTreeMap<MaterialHandle, Material>,
    next_handle: u32,
    size: (u32, u32),
    pixel_ratio: f32,
    frames_rendered: u64,
    last_frame: Option<Frame>,
    released: bool,
    /// Meshes and materials still live when the context was released.
    live_at_release: Option<(usize, usize)>,
    /// Creations allowed before every further `create_*` fails.
    fail_after: Option<usize>,
    created: usize,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self {
            meshes: BTreeMap::new(),
            materials: BTreeMap::new(),
            next_handle: 1,
            size: (0, 0),
            pixel_ratio: 1.0,
            frames_rendered: 0,
            last_frame: None,
            released: false,
            live_at_release: None,
            fail_after: None,
            created: 0,
        }
    }

    /// A backend whose resource creation fails after `successes` creations.
    pub fn failing_after(successes: usize) -> Self {
        Self {
            fail_after: Some(successes),
            ..Self::new()
        }
    }

    pub fn live_meshes(&self) -> usize {
        self.meshes.len()
    }

    pub fn live_materials(&self) -> usize {
        self.materials.len()
    }

    pub fn mesh_info(&self, handle: MeshHandle) -> Option<MeshInfo> {
        self.meshes.get(&handle).copied()
    }

    pub fn material(&self, handle: MaterialHandle) -> Option<&Material> {
        self.materials.get(&handle)
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    pub fn last_frame(&self) -> Option<&Frame> {
        self.last_frame.as_ref()
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// `(meshes, materials)` still held when [`RenderBackend::release`]
    /// ran, or `None` if it never did. Releasing the context does not free
    /// handles on the component's behalf, so anything counted here leaked.
    pub fn live_at_release(&self) -> Option<(usize, usize)> {
        self.live_at_release
    }

    fn admit(&mut self) -> Result<u32, BackendError> {
        if self.released {
            return Err(BackendError::ContextReleased);
        }
        if self.fail_after.is_some_and(|limit| self.created >= limit) {
            return Err(BackendError::InvalidMesh("simulated allocation failure".into()));
        }
        self.created += 1;
        let handle = self.next_handle;
        self.next_handle += 1;
        Ok(handle)
    }
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderBackend for HeadlessBackend {
    fn create_mesh(&mut self, mesh: &Mesh) -> Result<MeshHandle, BackendError> {
        mesh.validate().map_err(BackendError::InvalidMesh)?;
        let handle = MeshHandle(self.admit()?);
        self.meshes.insert(
            handle,
            MeshInfo {
                vertices: mesh.vertex_count(),
                triangles: mesh.triangle_count(),
            },
        );
        Ok(handle)
    }

    fn create_material(&mut self, material: &Material) -> Result<MaterialHandle, BackendError> {
        let handle = MaterialHandle(self.admit()?);
        self.materials.insert(handle, *material);
        Ok(handle)
    }

    fn update_material(
        &mut self,
        handle: MaterialHandle,
        material: &Material,
    ) -> Result<(), BackendError> {
        match self.materials.get_mut(&handle) {
            Some(slot) => {
                *slot = *material;
                Ok(())
            }
            None => Err(BackendError::UnknownHandle),
        }
    }

    fn release_mesh(&mut self, handle: MeshHandle) {
        self.meshes.remove(&handle);
    }

    fn release_material(&mut self, handle: MaterialHandle) {
        self.materials.remove(&handle);
    }

    fn set_pixel_ratio(&mut self, ratio: f32) {
        self.pixel_ratio = ratio;
    }

    fn pixel_ratio(&self) -> f32 {
        self.pixel_ratio
    }

    fn set_size(&mut self, width: u32, height: u32) {
        self.size = (width, height);
    }

    fn output_size(&self) -> (u32, u32) {
        self.size
    }

    fn render(&mut self, frame: &Frame) -> Result<(), BackendError> {
        if self.released {
            return Err(BackendError::ContextReleased);
        }
        let dangling = frame
            .draws
            .iter()
            .any(|d| {
                !self.meshes.contains_key(&d.mesh) || !self.materials.contains_key(&d.material)
            });
        if dangling {
            return Err(BackendError::UnknownHandle);
        }
        self.frames_rendered += 1;
        self.last_frame = Some(frame.clone());
        Ok(())
    }

    fn release(&mut self) {
        if !self.released {
            self.live_at_release = Some((self.meshes.len(), self.materials.len()));
        }
        self.last_frame = None;
        self.released = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::uv_sphere;
    use crate::visuals::Color;

    #[test]
    fn test_timers_fire_in_deadline_order() {
        let mut host = HeadlessHost::new(100.0, 100.0);
        let late = host.set_timeout(Duration::from_millis(50));
        let early = host.set_timeout(Duration::from_millis(10));
        assert_eq!(host.take_due_timers(100.0), vec![early, late]);
        assert_eq!(host.pending_timers(), 0);
    }

    #[test]
    fn test_backend_tracks_resources() {
        let mut backend = HeadlessBackend::new();
        let mesh = backend.create_mesh(&uv_sphere(1.0, 8, 6)).unwrap();
        let material = backend.create_material(&Material::new(Color::WHITE)).unwrap();
        assert_eq!(backend.live_meshes(), 1);
        assert_eq!(backend.live_materials(), 1);

        backend.release_mesh(mesh);
        backend.release_material(material);
        assert_eq!(backend.live_meshes(), 0);
        assert_eq!(backend.live_materials(), 0);
    }

    #[test]
    fn test_release_keeps_unreleased_handles_visible() {
        let mut backend = HeadlessBackend::new();
        let kept = backend.create_mesh(&uv_sphere(1.0, 8, 6)).unwrap();
        let freed = backend.create_material(&Material::new(Color::WHITE)).unwrap();
        backend.release_material(freed);
        backend.release();

        assert_eq!(backend.live_at_release(), Some((1, 0)));
        assert_eq!(backend.live_meshes(), 1);
        assert!(backend.mesh_info(kept).is_some());

        // A second release keeps the first snapshot
        backend.release_mesh(kept);
        backend.release();
        assert_eq!(backend.live_at_release(), Some((1, 0)));
    }

    #[test]
    fn test_backend_rejects_after_release() {
        let mut backend = HeadlessBackend::new();
        assert_eq!(backend.live_at_release(), None);
        backend.release();
        assert!(matches!(
            backend.create_material(&Material::new(Color::WHITE)),
            Err(BackendError::ContextReleased)
        ));
    }

    #[test]
    fn test_failing_backend() {
        let mut backend = HeadlessBackend::failing_after(1);
        assert!(backend.create_material(&Material::new(Color::WHITE)).is_ok());
        assert!(backend.create_material(&Material::new(Color::WHITE)).is_err());
    }
}
