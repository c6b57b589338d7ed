//! Desktop viewer: a winit window acting as the page a component lives in.
//!
//! The window's inner area is the mount element. Behind it sits a virtual
//! page taller than the window; the mouse wheel and the arrow/page keys
//! scroll it whenever the component is not listening for those inputs
//! itself, which is what the scroll-following backdrop needs to come alive.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use glam::Vec2;
use log::{debug, error, info, warn};
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{self, NamedKey},
    window::{CursorIcon, Window, WindowId},
};

use crate::components::Component;
use crate::error::ViewerError;
use crate::gpu::WgpuBackend;
use crate::host::{
    CursorStyle, EventKind, FrameHandle, Host, HostEvent, ListenerId, MountBox, TimerHandle,
    Viewport,
};
use crate::input::{Input, Key};
use crate::time::FrameClock;

/// How often the window title's frame rate refreshes.
const STATS_INTERVAL_MS: f64 = 1000.0;

/// Viewer window settings.
///
/// # Example
///
/// ```no_run
/// use bioscape::components::helix::{HelixConfig, InteractiveHelixViewer};
/// use bioscape::window::{run, ViewerOptions};
///
/// let viewer = InteractiveHelixViewer::new(HelixConfig::new());
/// run(viewer, ViewerOptions::new().with_size(1024, 768)).unwrap();
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerOptions {
    pub title: String,
    /// Initial inner size in logical pixels.
    pub width: u32,
    pub height: u32,
    /// Size of the virtual page behind the window.
    pub page_size: Vec2,
    /// Pixels scrolled per arrow key press.
    pub scroll_step: f32,
}

impl Default for ViewerOptions {
    fn default() -> Self {
        Self {
            title: "bioscape".to_string(),
            width: 1280,
            height: 720,
            page_size: Vec2::new(2000.0, 5000.0),
            scroll_step: 100.0,
        }
    }
}

impl ViewerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_page_size(mut self, width: f32, height: f32) -> Self {
        self.page_size = Vec2::new(width, height);
        self
    }
}

/// [`Host`] backed by a winit window and a wall clock.
pub struct WindowHost {
    start: Instant,
    mount: Option<MountBox>,
    viewport: Viewport,
    scroll: Vec2,
    page_size: Vec2,
    next_id: u64,
    listeners: BTreeMap<ListenerId, EventKind>,
    frames: BTreeSet<FrameHandle>,
    timers: BTreeMap<TimerHandle, Instant>,
    cursor: CursorStyle,
}

impl WindowHost {
    pub fn new(page_size: Vec2) -> Self {
        Self {
            start: Instant::now(),
            mount: None,
            viewport: Viewport {
                width: 0.0,
                height: 0.0,
                device_pixel_ratio: 1.0,
            },
            scroll: Vec2::ZERO,
            page_size,
            next_id: 1,
            listeners: BTreeMap::new(),
            frames: BTreeSet::new(),
            timers: BTreeMap::new(),
            cursor: CursorStyle::Default,
        }
    }

    /// Milliseconds since the host was created.
    pub fn now_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    /// Take the window's current logical size as mount box and viewport.
    pub fn sync_window(&mut self, window: &Window) {
        let scale = window.scale_factor();
        let logical = window.inner_size().to_logical::<f32>(scale);
        self.mount = Some(MountBox::new(logical.width, logical.height));
        self.viewport = Viewport {
            width: logical.width,
            height: logical.height,
            device_pixel_ratio: scale as f32,
        };
        self.scroll = self.clamp_scroll(self.scroll);
    }

    pub fn listens_to(&self, kind: EventKind) -> bool {
        self.listeners.values().any(|&k| k == kind)
    }

    pub fn cursor(&self) -> CursorStyle {
        self.cursor
    }

    fn clamp_scroll(&self, scroll: Vec2) -> Vec2 {
        let visible = Vec2::new(self.viewport.width, self.viewport.height);
        let max = (self.page_size - visible).max(Vec2::ZERO);
        scroll.clamp(Vec2::ZERO, max)
    }

    /// Scroll the virtual page. Returns whether the offset changed.
    pub fn scroll_by(&mut self, delta: Vec2) -> bool {
        let next = self.clamp_scroll(self.scroll + delta);
        let changed = next != self.scroll;
        self.scroll = next;
        changed
    }

    fn take_due_timers(&mut self, now: Instant) -> Vec<TimerHandle> {
        let mut due: Vec<(Instant, TimerHandle)> = self
            .timers
            .iter()
            .filter(|(_, &deadline)| deadline <= now)
            .map(|(&handle, &deadline)| (deadline, handle))
            .collect();
        due.sort();
        for (_, handle) in &due {
            self.timers.remove(handle);
        }
        due.into_iter().map(|(_, handle)| handle).collect()
    }

    fn take_frames(&mut self) -> Vec<FrameHandle> {
        std::mem::take(&mut self.frames).into_iter().collect()
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

impl Host for WindowHost {
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
        self.timers.insert(handle, Instant::now() + delay);
        handle
    }

    fn clear_timeout(&mut self, handle: TimerHandle) {
        self.timers.remove(&handle);
    }

    fn set_cursor(&mut self, cursor: CursorStyle) {
        self.cursor = cursor;
    }
}

struct App<C: Component> {
    component: C,
    options: ViewerOptions,
    window: Option<Arc<Window>>,
    host: WindowHost,
    backend: Option<WgpuBackend>,
    input: Input,
    stats: FrameClock,
    last_stats_ms: f64,
    applied_cursor: CursorStyle,
}

impl<C: Component> App<C> {
    fn new(component: C, options: ViewerOptions) -> Self {
        Self {
            component,
            host: WindowHost::new(options.page_size),
            options,
            window: None,
            backend: None,
            input: Input::new(1.0),
            stats: FrameClock::new(),
            last_stats_ms: 0.0,
            applied_cursor: CursorStyle::Default,
        }
    }

    fn title(&self) -> String {
        format!("{} - {}", self.options.title, self.component.name())
    }

    /// Deliver an event, or let the page handle it when nobody listens.
    fn route(&mut self, event: HostEvent) {
        let Some(backend) = self.backend.as_mut() else { return };

        let page_scroll = match event {
            HostEvent::Wheel { delta_y } if !self.host.listens_to(EventKind::Wheel) => {
                Some(Vec2::new(0.0, delta_y))
            }
            HostEvent::KeyDown { key } if !self.host.listens_to(EventKind::KeyDown) => {
                let step = self.options.scroll_step;
                let page = self.host.viewport().height;
                match key {
                    Key::ArrowDown => Some(Vec2::new(0.0, step)),
                    Key::ArrowUp => Some(Vec2::new(0.0, -step)),
                    Key::ArrowRight => Some(Vec2::new(step, 0.0)),
                    Key::ArrowLeft => Some(Vec2::new(-step, 0.0)),
                    Key::PageDown | Key::Space => Some(Vec2::new(0.0, page)),
                    Key::PageUp => Some(Vec2::new(0.0, -page)),
                    Key::Home => Some(Vec2::new(0.0, -self.options.page_size.y)),
                    Key::End => Some(Vec2::new(0.0, self.options.page_size.y)),
                    _ => None,
                }
            }
            _ => None,
        };

        if let Some(delta) = page_scroll {
            if self.host.scroll_by(delta) && self.host.listens_to(EventKind::Scroll) {
                self.component.handle_event(&HostEvent::Scroll, &mut self.host, backend);
            }
            return;
        }

        if self.host.listens_to(event.kind()) {
            self.component.handle_event(&event, &mut self.host, backend);
        }
    }

    fn run_callbacks(&mut self) {
        let Some(backend) = self.backend.as_mut() else { return };

        for handle in self.host.take_due_timers(Instant::now()) {
            self.component.on_timer(handle, &mut self.host, backend);
        }

        let now = self.host.now_ms();
        for handle in self.host.take_frames() {
            self.component.on_frame(handle, now, &mut self.host, backend);
        }
    }

    fn apply_cursor(&mut self) {
        let cursor = self.host.cursor();
        if cursor == self.applied_cursor {
            return;
        }
        if let Some(window) = &self.window {
            window.set_cursor(match cursor {
                CursorStyle::Default => CursorIcon::Default,
                CursorStyle::Pointer => CursorIcon::Pointer,
            });
        }
        self.applied_cursor = cursor;
    }

    fn report_stats(&mut self) {
        let now = self.host.now_ms();
        self.stats.tick(now);
        if now - self.last_stats_ms < STATS_INTERVAL_MS {
            return;
        }
        self.last_stats_ms = now;
        debug!("{:.0} fps", self.stats.fps());
        if let Some(window) = &self.window {
            window.set_title(&format!("{} ({:.0} fps)", self.title(), self.stats.fps()));
        }
    }

    /// Build this redraw's overlay; it is painted with the next frame.
    #[cfg(feature = "egui")]
    fn run_overlay(&mut self) {
        let (Some(backend), Some(window)) = (self.backend.as_mut(), self.window.as_ref()) else {
            return;
        };
        let Some(ctx) = backend.egui_begin(window) else { return };
        self.component.ui(&ctx, backend);
        backend.egui_end(window);
    }

    fn shut_down(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(backend) = self.backend.as_mut() {
            self.component.unmount(&mut self.host, backend);
        }
        event_loop.exit();
    }
}

impl<C: Component> ApplicationHandler for App<C> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_attrs = Window::default_attributes()
            .with_title(self.title())
            .with_inner_size(winit::dpi::LogicalSize::new(self.options.width, self.options.height));

        let window = match event_loop.create_window(window_attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                error!("Failed to create window: {}", e);
                event_loop.exit();
                return;
            }
        };
        self.input.set_scale_factor(window.scale_factor());
        self.host.sync_window(&window);
        self.window = Some(window.clone());

        let options = self.component.renderer_options();
        match pollster::block_on(WgpuBackend::new(window.clone(), options)) {
            Ok(mut backend) => {
                self.component.mount(&mut self.host, &mut backend);
                self.backend = Some(backend);
            }
            // The window stays open and empty
            Err(e) => warn!("Rendering unavailable, showing an empty window: {}", e),
        }

        window.request_redraw();
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match &event {
            WindowEvent::CloseRequested => {
                self.shut_down(event_loop);
                return;
            }
            WindowEvent::Resized(physical_size) => {
                if let Some(backend) = self.backend.as_mut() {
                    backend.resize_surface(physical_size.width, physical_size.height);
                }
                if let Some(window) = self.window.clone() {
                    self.host.sync_window(&window);
                }
                self.route(HostEvent::Resize);
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                self.input.set_scale_factor(*scale_factor);
                if let Some(window) = self.window.clone() {
                    self.host.sync_window(&window);
                }
            }
            WindowEvent::KeyboardInput { event: key_event, .. }
                if key_event.state.is_pressed()
                    && key_event.logical_key == keyboard::Key::Named(NamedKey::Escape) =>
            {
                info!("Escape pressed, closing");
                self.shut_down(event_loop);
                return;
            }
            WindowEvent::RedrawRequested => {
                #[cfg(feature = "egui")]
                self.run_overlay();
                self.run_callbacks();
                self.apply_cursor();
                self.report_stats();

                if self.backend.as_ref().is_some_and(|b| b.is_out_of_memory()) {
                    error!("Out of GPU memory, exiting");
                    self.shut_down(event_loop);
                    return;
                }
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
                return;
            }
            _ => {}
        }

        #[cfg(feature = "egui")]
        if let (Some(backend), Some(window)) = (self.backend.as_mut(), self.window.as_ref()) {
            if backend.egui_event(window, &event) {
                return;
            }
        }

        let now = self.host.now_ms();
        for host_event in self.input.translate(&event, now) {
            self.route(host_event);
        }
        self.apply_cursor();
    }
}

/// Open a window and run `component` in it until the window closes.
pub fn run<C: Component + 'static>(
    component: C,
    options: ViewerOptions,
) -> Result<(), ViewerError> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    info!("Starting {} viewer", component.name());
    let mut app = App::new(component, options);
    event_loop.run_app(&mut app)?;
    Ok(())
}
