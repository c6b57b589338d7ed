//! Interactive DNA double helix.
//!
//! Drag to orbit, scroll to zoom, double-click the molecule to blow it
//! apart and again to put it back together, click a base pair to highlight
//! it. The keyboard covers the rest:
//!
//! | key       | action                                   |
//! |-----------|------------------------------------------|
//! | Space     | pause / resume rotation                  |
//! | E         | explode / reform                         |
//! | R         | reset view, selection and explosion      |
//! | C         | toggle complexity (rebuilds the helix)   |
//! | + / =     | faster                                   |
//! | -         | slower                                   |
//! | H         | print this help to the log               |
//!
//! With the `egui` feature the viewer also draws the on-screen controls: a
//! speed slider, a complexity toggle and a hover card listing the above.

#[cfg(feature = "egui")]
mod panel;
pub mod structure;

use glam::{Mat4, Vec2, Vec3};
use log::{debug, info, warn};

use crate::backend::{RenderBackend, RendererOptions};
use crate::camera::{pointer_ndc, OrbitCamera, Projection, Ray};
use crate::components::Component;
use crate::device::PerformanceMode;
use crate::error::MountError;
use crate::host::{
    CursorStyle, EventKind, FrameHandle, FrameLoop, Host, HostEvent, ListenerSet, MountBox,
    TimerHandle,
};
use crate::input::{Key, MouseButton, CLICK_SLOP_PX};
use crate::scene::{CameraView, Frame, Transform};
use crate::selection::Selection;
use crate::spawn::SpawnContext;
use crate::time::FrameClock;
use crate::visuals::{Color, Light};

pub use structure::{AtomKind, Complexity, HelixAtom, HelixPreset, HelixStructure, Hit};

pub const DEFAULT_SPEED: f32 = 0.5;
pub const MAX_SPEED: f32 = 3.0;
pub const SPEED_STEP: f32 = 0.2;
/// Top of the on-screen speed slider. Keys can go faster.
pub const SLIDER_MAX_SPEED: f32 = 2.0;
pub const SLIDER_STEP: f32 = 0.1;
pub const MIN_DISTANCE: f32 = 60.0;
pub const MAX_DISTANCE: f32 = 200.0;
/// Wheel delta to distance factor.
pub const ZOOM_FACTOR: f32 = 0.2;
/// Drag pixels to radians.
pub const DRAG_SENSITIVITY: f32 = 0.008;
pub const CAMERA_EASING: f32 = 0.08;
/// Offset of the structure from the orbit centre.
const GROUP_OFFSET: Vec3 = Vec3::new(3.0, 0.0, 0.0);

/// Camera distance at mount and after a reset.
pub fn initial_distance() -> f32 {
    Vec3::new(-100.0, 60.0, 100.0).length()
}

/// Every control, as `(input, action)` pairs.
pub const KEY_HELP: &[(&str, &str)] = &[
    ("Space", "pause / resume rotation"),
    ("E", "explode / reform"),
    ("R", "reset view"),
    ("C", "toggle complexity"),
    ("+ / -", "rotation speed"),
    ("drag", "orbit"),
    ("wheel", "zoom"),
    ("double-click", "explode / reform"),
    ("click", "select base pair"),
];

fn log_key_help() {
    info!("helix controls:");
    for (key, action) in KEY_HELP {
        info!("  {:<14} {}", key, action);
    }
}

/// Viewer configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct HelixConfig {
    pub complexity: Complexity,
    /// Initial rotation speed.
    pub speed: f32,
    pub seed: Option<u64>,
    /// `None` detects the running device.
    pub performance: Option<PerformanceMode>,
}

impl Default for HelixConfig {
    fn default() -> Self {
        Self {
            complexity: Complexity::High,
            speed: DEFAULT_SPEED,
            seed: None,
            performance: None,
        }
    }
}

impl HelixConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_complexity(mut self, complexity: Complexity) -> Self {
        self.complexity = complexity;
        self
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed.clamp(0.0, MAX_SPEED);
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

fn lights() -> Vec<Light> {
    let point = |color: u32, intensity: f32, position: Vec3| Light::Point {
        color: Color::hex(color),
        intensity,
        position,
        range: 400.0,
    };
    vec![
        Light::Ambient {
            color: Color::hex(0x404040),
            intensity: 0.3,
        },
        point(0xff0080, 5.0, Vec3::new(120.0, 120.0, 120.0)),
        point(0x00ffff, 4.5, Vec3::new(-120.0, -120.0, -120.0)),
        point(0x00ff80, 4.0, Vec3::new(0.0, 150.0, 0.0)),
    ]
}

/// Primary-button gesture in progress.
#[derive(Debug, Clone, Copy)]
struct Press {
    origin: Vec2,
    last: Vec2,
    dragged: bool,
}

struct Mounted {
    /// `None` only if a rebuild failed.
    structure: Option<HelixStructure>,
    ctx: SpawnContext,
    complexity: Complexity,
    exploded: bool,
    speed: f32,
    selection: Selection,
    camera: OrbitCamera,
    projection: Projection,
    mount: MountBox,
    clock: FrameClock,
    group_rotation: Vec3,
    group_scale: f32,
    hovering: bool,
    press: Option<Press>,
    listeners: ListenerSet,
    frames: FrameLoop,
}

impl Mounted {
    fn group_matrix(&self) -> Mat4 {
        Transform::from_translation(GROUP_OFFSET)
            .with_rotation(self.group_rotation)
            .with_uniform_scale(self.group_scale)
            .matrix()
    }

    fn camera_view(&self) -> CameraView {
        CameraView {
            view: self.camera.view_matrix(),
            projection: self.projection.matrix(),
            position: self.camera.position(),
        }
    }

    fn pick(&self, position: Vec2) -> Option<Hit> {
        if self.mount.is_empty() {
            return None;
        }
        let structure = self.structure.as_ref()?;
        let ray = Ray::from_ndc(pointer_ndc(position, self.mount), self.camera_view().view_proj());
        structure.hit_test(&ray, self.group_matrix())
    }

    fn compose(&self) -> Frame {
        let draws = self
            .structure
            .as_ref()
            .map(|s| s.draw_items(self.group_matrix()))
            .unwrap_or_default();
        Frame {
            camera: self.camera_view(),
            lights: lights(),
            clear: (Color::BLACK, 0.0),
            draws,
        }
    }

    fn toggle_explode(&mut self) {
        self.exploded = !self.exploded;
        debug!("helix: {}", if self.exploded { "exploding" } else { "reforming" });
    }

    fn reset(&mut self) {
        self.camera.reset(initial_distance());
        self.selection.clear();
        self.exploded = false;
        debug!("helix: view reset");
    }

    /// Tear the current structure down and build the other complexity.
    fn rebuild(&mut self, backend: &mut dyn RenderBackend) {
        if let Some(old) = self.structure.take() {
            old.teardown(backend);
        }
        self.complexity = self.complexity.toggled();
        self.selection.clear();
        match HelixStructure::build(self.complexity, &mut self.ctx, backend) {
            Ok(structure) => {
                info!(
                    "helix: rebuilt at {:?} complexity ({} atoms)",
                    self.complexity,
                    structure.atoms().len()
                );
                self.structure = Some(structure);
            }
            Err(e) => warn!("helix: rebuild failed, nothing to show: {}", e),
        }
    }

    fn apply_size(&mut self, host: &dyn Host, backend: &mut dyn RenderBackend) {
        if let Some(mount) = host.mount_box().filter(|m| !m.is_empty()) {
            self.mount = mount;
            self.projection.fit(mount);
            let (w, h) = mount.pixel_size();
            backend.set_size(w, h);
        }
    }

    fn set_speed(&mut self, speed: f32) {
        if speed.is_finite() {
            self.speed = speed.clamp(0.0, MAX_SPEED);
        }
    }

    fn key_down(&mut self, key: Key, backend: &mut dyn RenderBackend) {
        match key {
            Key::Space => {
                self.speed = if self.speed == 0.0 { DEFAULT_SPEED } else { 0.0 };
            }
            k if k.is_char('e') => self.toggle_explode(),
            k if k.is_char('r') => self.reset(),
            k if k.is_char('c') => self.rebuild(backend),
            k if k.is_char('+') || k.is_char('=') => self.set_speed(self.speed + SPEED_STEP),
            k if k.is_char('-') => self.set_speed(self.speed - SPEED_STEP),
            k if k.is_char('h') => log_key_help(),
            _ => {}
        }
    }

    fn pointer_move(&mut self, position: Vec2, host: &mut dyn Host) {
        if let Some(press) = self.press.as_mut() {
            self.camera.drag(position - press.last, DRAG_SENSITIVITY);
            press.last = position;
            if position.distance(press.origin) > CLICK_SLOP_PX {
                press.dragged = true;
            }
        }

        let hovering = self.pick(position).is_some();
        if hovering != self.hovering {
            host.set_cursor(if hovering {
                CursorStyle::Pointer
            } else {
                CursorStyle::Default
            });
        }
        self.hovering = hovering;
    }

    fn click(&mut self, position: Vec2) {
        match self.pick(position).and_then(|hit| hit.base_pair) {
            Some(ordinal) => {
                self.selection.select(ordinal);
                debug!("helix: selected base pair {}", ordinal);
            }
            None => self.selection.clear(),
        }
    }
}

/// The helix viewer component.
pub struct InteractiveHelixViewer {
    config: HelixConfig,
    mode: PerformanceMode,
    state: Option<Mounted>,
}

impl InteractiveHelixViewer {
    pub fn new(config: HelixConfig) -> Self {
        let mode = config.performance.unwrap_or_else(PerformanceMode::detect);
        Self {
            config,
            mode,
            state: None,
        }
    }

    pub fn config(&self) -> &HelixConfig {
        &self.config
    }

    pub fn is_exploded(&self) -> bool {
        self.state.as_ref().is_some_and(|s| s.exploded)
    }

    pub fn speed(&self) -> Option<f32> {
        self.state.as_ref().map(|s| s.speed)
    }

    pub fn complexity(&self) -> Option<Complexity> {
        self.state.as_ref().map(|s| s.complexity)
    }

    pub fn selected_base_pair(&self) -> Option<usize> {
        self.state.as_ref().and_then(|s| s.selection.selected())
    }

    pub fn is_hovering(&self) -> bool {
        self.state.as_ref().is_some_and(|s| s.hovering)
    }

    pub fn camera(&self) -> Option<&OrbitCamera> {
        self.state.as_ref().map(|s| &s.camera)
    }

    pub fn projection(&self) -> Option<&Projection> {
        self.state.as_ref().map(|s| &s.projection)
    }

    pub fn structure(&self) -> Option<&HelixStructure> {
        self.state.as_ref().and_then(|s| s.structure.as_ref())
    }

    /// Set the rotation speed, clamped to `0..=MAX_SPEED`. No-op while
    /// unmounted.
    pub fn set_speed(&mut self, speed: f32) {
        if let Some(state) = self.state.as_mut() {
            state.set_speed(speed);
        }
    }

    /// Rebuild the helix at the other complexity, like the C key.
    pub fn toggle_complexity(&mut self, backend: &mut dyn RenderBackend) {
        if let Some(state) = self.state.as_mut() {
            state.rebuild(backend);
        }
    }

    /// Structure-to-world transform as of the last frame.
    pub fn group_matrix(&self) -> Option<Mat4> {
        self.state.as_ref().map(|s| s.group_matrix())
    }

    /// World-to-clip transform as of the last frame.
    pub fn view_proj(&self) -> Option<Mat4> {
        self.state.as_ref().map(|s| s.camera_view().view_proj())
    }

    fn try_mount(
        &self,
        host: &mut dyn Host,
        backend: &mut dyn RenderBackend,
    ) -> Result<Mounted, MountError> {
        let mount = host.mount_box().filter(|m| !m.is_empty()).ok_or(MountError::NoMountBox)?;

        backend.set_pixel_ratio(self.mode.pixel_ratio(host.viewport().device_pixel_ratio));
        let (w, h) = mount.pixel_size();
        backend.set_size(w, h);

        let mut ctx = SpawnContext::new(self.config.seed);
        let structure = HelixStructure::build(self.config.complexity, &mut ctx, backend)?;

        let listeners = ListenerSet::register(
            host,
            &[
                EventKind::PointerDown,
                EventKind::PointerUp,
                EventKind::PointerMove,
                EventKind::Wheel,
                EventKind::DoubleClick,
                EventKind::KeyDown,
                EventKind::Resize,
            ],
        );
        let mut frames = FrameLoop::new();
        frames.schedule(host);

        Ok(Mounted {
            structure: Some(structure),
            ctx,
            complexity: self.config.complexity,
            exploded: false,
            speed: self.config.speed,
            selection: Selection::new(),
            camera: OrbitCamera::new(initial_distance(), MIN_DISTANCE, MAX_DISTANCE, CAMERA_EASING),
            projection: Projection::new(20.0, mount.aspect(), 0.1, 1000.0),
            mount,
            clock: FrameClock::new(),
            group_rotation: Vec3::new(0.0, 0.0, 0.3),
            group_scale: 1.0,
            hovering: false,
            press: None,
            listeners,
            frames,
        })
    }
}

impl Component for InteractiveHelixViewer {
    fn name(&self) -> &'static str {
        "helix"
    }

    fn renderer_options(&self) -> RendererOptions {
        RendererOptions {
            antialias: self.mode.antialias(),
            transparent: true,
        }
    }

    fn mount(&mut self, host: &mut dyn Host, backend: &mut dyn RenderBackend) {
        if self.state.is_some() {
            warn!("helix: {}", MountError::AlreadyMounted);
            return;
        }
        match self.try_mount(host, backend) {
            Ok(state) => {
                info!(
                    "helix: mounted at {:?} complexity, press H for controls",
                    state.complexity
                );
                self.state = Some(state);
            }
            Err(e) => warn!("helix: staying inert: {}", e),
        }
    }

    fn handle_event(
        &mut self,
        event: &HostEvent,
        host: &mut dyn Host,
        backend: &mut dyn RenderBackend,
    ) {
        let Some(state) = self.state.as_mut() else { return };
        match *event {
            HostEvent::PointerDown {
                position,
                button: MouseButton::Left,
            } => {
                state.press = Some(Press {
                    origin: position,
                    last: position,
                    dragged: false,
                });
            }
            HostEvent::PointerUp {
                position,
                button: MouseButton::Left,
            } => {
                if let Some(press) = state.press.take() {
                    if !press.dragged {
                        state.click(position);
                    }
                }
            }
            HostEvent::PointerMove { position } => state.pointer_move(position, host),
            HostEvent::Wheel { delta_y } => state.camera.zoom(delta_y, ZOOM_FACTOR),
            HostEvent::DoubleClick { position } => {
                if state.pick(position).is_some() {
                    state.toggle_explode();
                }
            }
            HostEvent::KeyDown { key } => state.key_down(key, backend),
            HostEvent::Resize => state.apply_size(host, backend),
            _ => {}
        }
    }

    fn on_timer(
        &mut self,
        _handle: TimerHandle,
        _host: &mut dyn Host,
        _backend: &mut dyn RenderBackend,
    ) {
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

        let (t, _) = state.clock.tick(timestamp_ms);
        state.camera.update();

        let exploded = state.exploded;
        if let Some(structure) = state.structure.as_mut() {
            structure.update(exploded);
            if let Err(e) = structure.apply_selection(&state.selection, t, backend) {
                log::error!("helix: material update failed: {}", e);
            }
        }

        // Rotation freezes while exploded
        if !exploded {
            state.group_rotation = Vec3::new((t * 0.5).sin() * 0.1, t * 0.08 * state.speed, 0.3);
        }
        state.group_scale = if state.hovering {
            1.0 + (t * 6.0).sin() * 0.03
        } else {
            1.0
        };

        if let Err(e) = backend.render(&state.compose()) {
            log::error!("helix: render failed: {}", e);
        }
    }

    fn unmount(&mut self, host: &mut dyn Host, backend: &mut dyn RenderBackend) {
        let Some(mut state) = self.state.take() else { return };
        state.frames.cancel(host);
        state.listeners.remove_all(host);
        if let Some(structure) = state.structure.take() {
            structure.teardown(backend);
        }
        host.set_cursor(CursorStyle::Default);
        backend.release();
        info!("helix: unmounted");
    }

    fn is_mounted(&self) -> bool {
        self.state.is_some()
    }

    #[cfg(feature = "egui")]
    fn ui(&mut self, ctx: &egui::Context, backend: &mut dyn RenderBackend) {
        let Some(state) = self.state.as_mut() else { return };
        let actions = panel::show(ctx, state.speed, state.complexity);
        if let Some(speed) = actions.speed {
            state.set_speed(speed);
        }
        if actions.toggle_complexity {
            state.rebuild(backend);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_initial_distance() {
        assert_relative_eq!(initial_distance(), 153.622, epsilon = 1e-3);
        assert!((MIN_DISTANCE..=MAX_DISTANCE).contains(&initial_distance()));
    }

    #[test]
    fn test_config_speed_clamped() {
        assert_eq!(HelixConfig::new().with_speed(10.0).speed, MAX_SPEED);
        assert_eq!(HelixConfig::new().with_speed(-1.0).speed, 0.0);
        assert_eq!(HelixConfig::default().complexity, Complexity::High);
    }

    #[test]
    fn test_help_covers_every_key() {
        let keys: Vec<&str> = KEY_HELP.iter().map(|(k, _)| *k).collect();
        for key in ["Space", "E", "R", "C", "+ / -"] {
            assert!(keys.contains(&key));
        }
    }

    #[test]
    fn test_lights() {
        let lights = lights();
        assert_eq!(lights.len(), 4);
        assert!(matches!(lights[0], Light::Ambient { .. }));
    }
}
