//! Ambient blood-cell backdrop.
//!
//! A handful of biconcave discs drift behind the page. Each cell swims
//! around a home position on a slow large orbit, tumbles, and pulses. The
//! camera follows page scroll so cells pass by as the reader moves down.
//! The field registers no pointer or keyboard listeners and never
//! intercepts input.

use std::time::Duration;

use glam::{Vec2, Vec3};
use log::{debug, info, warn};

use crate::backend::{MaterialHandle, MeshHandle, RenderBackend, RendererOptions};
use crate::camera::{Projection, ScrollCamera};
use crate::components::Component;
use crate::debounce::Debouncer;
use crate::device::PerformanceMode;
use crate::error::{BackendError, MountError};
use crate::geometry;
use crate::host::{
    EventKind, FrameHandle, FrameLoop, Host, HostEvent, ListenerSet, TimerHandle, Viewport,
};
use crate::scene::{CameraView, DrawItem, Frame, Transform};
use crate::spawn::SpawnContext;
use crate::time::FrameThrottle;
use crate::visuals::{Color, Light, Material, Side};

/// Peak relative size change of the breathing pulse.
pub const PULSE_AMPLITUDE: f32 = 0.08;
/// Glow shell size relative to the body.
pub const GLOW_SCALE: f32 = 1.08;

const CAMERA_Z: f32 = 1200.0;
const SCROLL_DEBOUNCE: Duration = Duration::from_millis(10);
const RESIZE_DEBOUNCE: Duration = Duration::from_millis(100);

/// Field configuration.
///
/// # Example
///
/// ```
/// use bioscape::components::cells::CellFieldConfig;
///
/// let config = CellFieldConfig::new()
///     .with_cell_count(4)
///     .with_speed(0.5)
///     .with_seed(1);
/// assert_eq!(config.cell_count, 4);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CellFieldConfig {
    pub cell_count: usize,
    /// Base swim speed.
    pub speed: f32,
    /// Sphere radius before flattening.
    pub cell_size: f32,
    /// Horizontal extent home positions are clamped to.
    pub world_width: f32,
    /// Vertical extent home positions are clamped to.
    pub world_height: f32,
    pub seed: Option<u64>,
    /// `None` detects the running device.
    pub performance: Option<PerformanceMode>,
}

impl Default for CellFieldConfig {
    fn default() -> Self {
        Self {
            cell_count: 2,
            speed: 0.3,
            cell_size: 60.0,
            world_width: 2000.0,
            world_height: 5000.0,
            seed: None,
            performance: None,
        }
    }
}

impl CellFieldConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cell_count(mut self, count: usize) -> Self {
        self.cell_count = count;
        self
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_cell_size(mut self, size: f32) -> Self {
        self.cell_size = size;
        self
    }

    pub fn with_world_size(mut self, width: f32, height: f32) -> Self {
        self.world_width = width;
        self.world_height = height;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_performance_mode(mut self, mode: PerformanceMode) -> Self {
        self.performance = Some(mode);
        self
    }
}

/// Motion parameters of one cell, sampled once on mount.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellMotion {
    pub swim_radius: f32,
    pub swim_speed: f32,
    /// Per-frame rotation increment around each axis.
    pub rotation_speed: Vec3,
    pub float_phase: f32,
    pub vertical_phase: f32,
    pub horizontal_phase: f32,
    pub orbit_radius: f32,
    pub orbit_speed: f32,
    pub orbit_phase: f32,
}

impl CellMotion {
    pub fn sample(ctx: &mut SpawnContext, speed: f32) -> Self {
        Self {
            swim_radius: ctx.jitter(3000.0, 200.0),
            swim_speed: speed * ctx.jitter(0.5, 0.8),
            rotation_speed: Vec3::new(
                ctx.jitter(0.02, 0.003),
                ctx.jitter(0.01, 0.002),
                ctx.jitter(0.001, 0.001),
            ),
            float_phase: ctx.random_phase(),
            vertical_phase: ctx.random_phase(),
            horizontal_phase: ctx.random_phase(),
            orbit_radius: ctx.jitter(400.0, 300.0),
            orbit_speed: ctx.jitter(0.0008, 0.0004),
            orbit_phase: ctx.random_phase(),
        }
    }

    /// Offset from home at time `t` (seconds): large orbit plus swim.
    pub fn offset(&self, t: f32) -> Vec3 {
        let angle = t * self.orbit_speed + self.orbit_phase;
        let orbit = Vec3::new(
            angle.cos() * self.orbit_radius,
            angle.sin() * self.orbit_radius * 0.7,
            0.0,
        );

        let (s, r) = (self.swim_speed, self.swim_radius);
        let swim = Vec3::new(
            (t * s + self.horizontal_phase).sin() * r * 0.3,
            (t * s * 0.8 + self.vertical_phase).cos() * r * 0.2,
            (t * s * 0.6 + self.float_phase).sin() * r * 0.15,
        );
        orbit + swim
    }
}

/// Breathing scale of cell `index` at time `t` (seconds).
pub fn pulse_scale(t: f32, index: usize) -> f32 {
    1.0 + (t * 1.5 + index as f32 * 2.0).sin() * PULSE_AMPLITUDE
}

/// Where cell `index` lives, given the viewport at mount time.
pub fn home_position(
    index: usize,
    viewport: Viewport,
    world_width: f32,
    world_height: f32,
) -> Vec3 {
    let (w, h) = (viewport.width, viewport.height);
    let x = if index % 2 == 0 { -w * 0.15 } else { -w * 0.08 };
    let y = match index {
        0 => h * 0.2,
        1 => h * 0.85,
        i => h * (0.2 + 0.65 * i as f32),
    };
    let half_width = world_width / 2.0;
    Vec3::new(x.clamp(-half_width, half_width), y.clamp(0.0, world_height.max(0.0)), 0.0)
}

/// One drifting cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub index: usize,
    pub home: Vec3,
    pub motion: CellMotion,
    pub transform: Transform,
}

impl Cell {
    pub fn new(index: usize, home: Vec3, motion: CellMotion) -> Self {
        Self {
            index,
            home,
            motion,
            transform: Transform::from_translation(home),
        }
    }

    /// Advance one rendered frame to time `t` (seconds).
    pub fn update(&mut self, t: f32) {
        self.transform.translation = self.home + self.motion.offset(t);
        self.transform.rotation += self.motion.rotation_speed;
        self.transform.scale = Vec3::splat(pulse_scale(t, self.index));
    }
}

fn body_material() -> Material {
    Material::new(Color::hex(0xff1a1a))
        .emissive(Color::hex(0x330000), 1.0)
        .shininess(80.0)
        .opacity(0.9)
        .side(Side::Double)
}

fn glow_material() -> Material {
    Material::new(Color::hex(0xff0040))
        .emissive(Color::hex(0xff0020), 1.0)
        .opacity(0.3)
        .side(Side::Back)
}

fn lights() -> Vec<Light> {
    vec![
        Light::Ambient {
            color: Color::hex(0x401010),
            intensity: 0.4,
        },
        Light::Directional {
            color: Color::hex(0xff2040),
            intensity: 1.2,
            position: Vec3::new(100.0, 100.0, 200.0),
        },
        Light::Directional {
            color: Color::hex(0xff4060),
            intensity: 0.6,
            position: Vec3::new(-100.0, -50.0, 100.0),
        },
        Light::Directional {
            color: Color::hex(0xff8080),
            intensity: 0.8,
            position: Vec3::new(0.0, 0.0, -200.0),
        },
    ]
}

/// Handles acquired from the backend, released together.
#[derive(Debug, Clone, Copy)]
struct Resources {
    /// One mesh shared by every body and every glow shell.
    mesh: MeshHandle,
    body: MaterialHandle,
    glow: MaterialHandle,
}

impl Resources {
    /// All three handles or none: a failure hands back what was created.
    fn acquire(
        config: &CellFieldConfig,
        backend: &mut dyn RenderBackend,
    ) -> Result<Self, BackendError> {
        let mesh = backend.create_mesh(&geometry::blood_cell(config.cell_size))?;
        let body = match backend.create_material(&body_material()) {
            Ok(body) => body,
            Err(e) => {
                backend.release_mesh(mesh);
                return Err(e);
            }
        };
        match backend.create_material(&glow_material()) {
            Ok(glow) => Ok(Self { mesh, body, glow }),
            Err(e) => {
                backend.release_material(body);
                backend.release_mesh(mesh);
                Err(e)
            }
        }
    }

    fn release(self, backend: &mut dyn RenderBackend) {
        backend.release_mesh(self.mesh);
        backend.release_material(self.body);
        backend.release_material(self.glow);
    }
}

/// Everything that exists only while mounted.
struct Mounted {
    resources: Resources,
    cells: Vec<Cell>,
    listeners: ListenerSet,
    frames: FrameLoop,
    scroll: Debouncer,
    resize: Debouncer,
    throttle: FrameThrottle,
    camera: ScrollCamera,
    projection: Projection,
}

impl Mounted {
    fn compose(&self) -> Frame {
        let Resources { mesh, body, glow } = self.resources;
        let mut draws = Vec::with_capacity(self.cells.len() * 2);
        for cell in &self.cells {
            draws.push(DrawItem {
                mesh,
                material: body,
                model: cell.transform.matrix(),
            });
            let glow_transform = Transform {
                scale: cell.transform.scale * GLOW_SCALE,
                ..cell.transform
            };
            draws.push(DrawItem {
                mesh,
                material: glow,
                model: glow_transform.matrix(),
            });
        }

        Frame {
            camera: CameraView {
                view: self.camera.view_matrix(),
                projection: self.projection.matrix(),
                position: self.camera.position,
            },
            lights: lights(),
            clear: (Color::BLACK, 0.0),
            draws,
        }
    }

    fn apply_size(&mut self, host: &dyn Host, backend: &mut dyn RenderBackend) {
        if let Some(mount) = host.mount_box().filter(|m| !m.is_empty()) {
            self.projection.fit(mount);
            let (w, h) = mount.pixel_size();
            backend.set_size(w, h);
        }
    }
}

/// Blood cells drifting behind page content.
pub struct AmbientParticleField {
    config: CellFieldConfig,
    mode: PerformanceMode,
    state: Option<Mounted>,
}

impl AmbientParticleField {
    pub fn new(config: CellFieldConfig) -> Self {
        let mode = config.performance.unwrap_or_else(PerformanceMode::detect);
        Self {
            config,
            mode,
            state: None,
        }
    }

    pub fn config(&self) -> &CellFieldConfig {
        &self.config
    }

    pub fn performance_mode(&self) -> PerformanceMode {
        self.mode
    }

    /// Cells of the current mount; empty when unmounted.
    pub fn cells(&self) -> &[Cell] {
        self.state.as_ref().map_or(&[], |s| s.cells.as_slice())
    }

    pub fn camera(&self) -> Option<&ScrollCamera> {
        self.state.as_ref().map(|s| &s.camera)
    }

    pub fn projection(&self) -> Option<&Projection> {
        self.state.as_ref().map(|s| &s.projection)
    }

    fn try_mount(
        &self,
        host: &mut dyn Host,
        backend: &mut dyn RenderBackend,
    ) -> Result<Mounted, MountError> {
        let size = self.config.cell_size;
        if !(size.is_finite() && size > 0.0) {
            return Err(MountError::InvalidConfig(format!("cell size {} must be positive", size)));
        }
        let mount = host.mount_box().filter(|m| !m.is_empty()).ok_or(MountError::NoMountBox)?;
        let viewport = host.viewport();

        backend.set_pixel_ratio(self.mode.pixel_ratio(viewport.device_pixel_ratio));
        let (w, h) = mount.pixel_size();
        backend.set_size(w, h);

        let resources = Resources::acquire(&self.config, backend)?;

        let mut ctx = SpawnContext::new(self.config.seed);
        let cells = (0..self.config.cell_count)
            .map(|i| {
                let home = home_position(
                    i,
                    viewport,
                    self.config.world_width,
                    self.config.world_height,
                );
                Cell::new(i, home, CellMotion::sample(&mut ctx, self.config.speed))
            })
            .collect();

        let mut camera = ScrollCamera::new(CAMERA_Z);
        camera.follow_scroll(host.scroll_offset(), viewport);

        let listeners = ListenerSet::register(host, &[EventKind::Scroll, EventKind::Resize]);
        let mut frames = FrameLoop::new();
        frames.schedule(host);

        Ok(Mounted {
            resources,
            cells,
            listeners,
            frames,
            scroll: Debouncer::new(SCROLL_DEBOUNCE),
            resize: Debouncer::new(RESIZE_DEBOUNCE),
            throttle: FrameThrottle::new(self.mode.frame_interval()),
            camera,
            projection: Projection::new(75.0, mount.aspect(), 1.0, 4000.0),
        })
    }
}

impl Component for AmbientParticleField {
    fn name(&self) -> &'static str {
        "cells"
    }

    fn renderer_options(&self) -> RendererOptions {
        RendererOptions {
            antialias: self.mode.antialias(),
            transparent: true,
        }
    }

    fn mount(&mut self, host: &mut dyn Host, backend: &mut dyn RenderBackend) {
        if self.state.is_some() {
            warn!("cells: {}", MountError::AlreadyMounted);
            return;
        }
        match self.try_mount(host, backend) {
            Ok(state) => {
                info!(
                    "cells: mounted {} cells ({:?} mode)",
                    state.cells.len(),
                    self.mode
                );
                for cell in &state.cells {
                    debug!("cells: cell {} home at {:?}", cell.index, cell.home);
                }
                self.state = Some(state);
            }
            Err(e) => warn!("cells: staying inert: {}", e),
        }
    }

    fn handle_event(
        &mut self,
        event: &HostEvent,
        host: &mut dyn Host,
        _backend: &mut dyn RenderBackend,
    ) {
        let Some(state) = self.state.as_mut() else { return };
        match event {
            HostEvent::Scroll => state.scroll.trigger(host),
            HostEvent::Resize => state.resize.trigger(host),
            _ => {}
        }
    }

    fn on_timer(
        &mut self,
        handle: TimerHandle,
        host: &mut dyn Host,
        backend: &mut dyn RenderBackend,
    ) {
        let Some(state) = self.state.as_mut() else { return };
        if state.scroll.fire(handle) {
            let scroll: Vec2 = host.scroll_offset();
            state.camera.follow_scroll(scroll, host.viewport());
        } else if state.resize.fire(handle) {
            state.apply_size(host, backend);
        }
    }

    fn on_frame(
        &mut self,
        handle: FrameHandle,
        timestamp_ms: f64,
        host: &mut dyn Host,
        backend: &mut dyn RenderBackend,
    ) {
        let Some(state) = self.state.as_mut() else { return };
        if !state.frames.accept(handle) {
            return;
        }
        state.frames.schedule(host);

        if !state.throttle.ready(timestamp_ms) {
            return;
        }
        let t = (timestamp_ms * 0.001) as f32;
        for cell in &mut state.cells {
            cell.update(t);
        }
        if let Err(e) = backend.render(&state.compose()) {
            log::error!("cells: render failed: {}", e);
        }
    }

    fn unmount(&mut self, host: &mut dyn Host, backend: &mut dyn RenderBackend) {
        let Some(mut state) = self.state.take() else { return };
        state.frames.cancel(host);
        state.scroll.cancel(host);
        state.resize.cancel(host);
        state.listeners.remove_all(host);
        state.resources.release(backend);
        backend.release();
        info!("cells: unmounted");
    }

    fn is_mounted(&self) -> bool {
        self.state.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn viewport(width: f32, height: f32) -> Viewport {
        Viewport {
            width,
            height,
            device_pixel_ratio: 1.0,
        }
    }

    #[test]
    fn test_default_config() {
        let config = CellFieldConfig::default();
        assert_eq!(config.cell_count, 2);
        assert_eq!(config.speed, 0.3);
        assert_eq!(config.cell_size, 60.0);
        assert_eq!((config.world_width, config.world_height), (2000.0, 5000.0));
    }

    #[test]
    fn test_pulse_bounds() {
        for index in 0..8 {
            for step in 0..2000 {
                let s = pulse_scale(step as f32 * 0.013, index);
                assert!(s >= 1.0 - PULSE_AMPLITUDE - 1e-6 && s <= 1.0 + PULSE_AMPLITUDE + 1e-6);
            }
        }
    }

    #[test]
    fn test_motion_ranges() {
        let mut ctx = SpawnContext::new(Some(11));
        for _ in 0..200 {
            let m = CellMotion::sample(&mut ctx, 0.3);
            assert!((3000.0..3200.0).contains(&m.swim_radius));
            assert!((0.15..=0.39 + 1e-6).contains(&m.swim_speed));
            assert!((400.0..700.0).contains(&m.orbit_radius));
            assert!((0.0008..0.0012).contains(&m.orbit_speed));
            assert!((0.02..0.023).contains(&m.rotation_speed.x));
            assert!((0.01..0.012).contains(&m.rotation_speed.y));
            assert!((0.001..0.002).contains(&m.rotation_speed.z));
        }
    }

    #[test]
    fn test_home_positions() {
        let vp = viewport(1000.0, 800.0);
        let first = home_position(0, vp, 2000.0, 5000.0);
        assert_relative_eq!(first.x, -150.0);
        assert_relative_eq!(first.y, 160.0);
        let second = home_position(1, vp, 2000.0, 5000.0);
        assert_relative_eq!(second.x, -80.0);
        assert_relative_eq!(second.y, 680.0);
    }

    #[test]
    fn test_home_positions_clamped_to_world() {
        let vp = viewport(1000.0, 800.0);
        for i in 0..20 {
            let p = home_position(i, vp, 200.0, 1000.0);
            assert!(p.x.abs() <= 100.0);
            assert!((0.0..=1000.0).contains(&p.y));
        }
    }

    #[test]
    fn test_cell_update_follows_formula() {
        let mut ctx = SpawnContext::new(Some(5));
        let motion = CellMotion::sample(&mut ctx, 0.3);
        let home = Vec3::new(-150.0, 160.0, 0.0);
        let mut cell = Cell::new(1, home, motion);

        cell.update(2.0);
        let expected = home + motion.offset(2.0);
        assert_relative_eq!(cell.transform.translation.x, expected.x, epsilon = 1e-3);
        assert_relative_eq!(cell.transform.translation.y, expected.y, epsilon = 1e-3);
        assert_relative_eq!(cell.transform.rotation.x, motion.rotation_speed.x);
        assert_relative_eq!(cell.transform.scale.x, pulse_scale(2.0, 1));

        cell.update(2.016);
        assert_relative_eq!(cell.transform.rotation.y, motion.rotation_speed.y * 2.0);
    }

    #[test]
    fn test_materials() {
        let body = body_material();
        assert_eq!(body.color.to_hex(), 0xff1a1a);
        assert_eq!(body.side, Side::Double);
        assert_eq!(body.opacity, 0.9);
        let glow = glow_material();
        assert_eq!(glow.side, Side::Back);
        assert_eq!(glow.opacity, 0.3);
    }
}
