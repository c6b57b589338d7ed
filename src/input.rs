//! Translation of raw window events into [`HostEvent`]s.
//!
//! winit reports presses, releases and cursor motion; the components expect
//! the DOM vocabulary they were designed around: pointer down/up/move, wheel
//! deltas in pixels with positive meaning "down", double-clicks and logical
//! keys. [`Input`] keeps the small amount of state needed for that mapping.

use glam::Vec2;
use winit::event::{ElementState, MouseButton as WinitMouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{Key as WinitKey, NamedKey};

use crate::host::HostEvent;

/// Two clicks closer together than this form a double-click.
pub const DOUBLE_CLICK_WINDOW_MS: f64 = 300.0;
/// Pointer travel (logical px) beyond which a press/release is a drag, not a click.
pub const CLICK_SLOP_PX: f32 = 4.0;
/// Pixels reported per wheel "line" notch, as browsers do.
const PIXELS_PER_LINE: f32 = 100.0;

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl From<WinitMouseButton> for MouseButton {
    fn from(btn: WinitMouseButton) -> Self {
        match btn {
            WinitMouseButton::Left => MouseButton::Left,
            WinitMouseButton::Right => MouseButton::Right,
            WinitMouseButton::Middle => MouseButton::Middle,
            _ => MouseButton::Left, // Default for other buttons
        }
    }
}

/// Logical keys, i.e. what the key types rather than where it sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Space,
    Enter,
    Escape,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    PageUp,
    PageDown,
    Home,
    End,
    Character(char),
    Other,
}

impl Key {
    /// Case-insensitive match against a typed character.
    pub fn is_char(&self, c: char) -> bool {
        match self {
            Key::Character(k) => k.eq_ignore_ascii_case(&c),
            _ => false,
        }
    }
}

impl From<&WinitKey> for Key {
    fn from(key: &WinitKey) -> Self {
        match key {
            WinitKey::Named(NamedKey::Space) => Key::Space,
            WinitKey::Named(NamedKey::Enter) => Key::Enter,
            WinitKey::Named(NamedKey::Escape) => Key::Escape,
            WinitKey::Named(NamedKey::ArrowUp) => Key::ArrowUp,
            WinitKey::Named(NamedKey::ArrowDown) => Key::ArrowDown,
            WinitKey::Named(NamedKey::ArrowLeft) => Key::ArrowLeft,
            WinitKey::Named(NamedKey::ArrowRight) => Key::ArrowRight,
            WinitKey::Named(NamedKey::PageUp) => Key::PageUp,
            WinitKey::Named(NamedKey::PageDown) => Key::PageDown,
            WinitKey::Named(NamedKey::Home) => Key::Home,
            WinitKey::Named(NamedKey::End) => Key::End,
            WinitKey::Character(s) => s.as_str().chars().next().map_or(Key::Other, Key::Character),
            _ => Key::Other,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Click {
    position: Vec2,
    timestamp_ms: f64,
}

/// Pointer state tracking for event translation.
#[derive(Debug, Default)]
pub struct Input {
    /// Cursor position in logical pixels.
    pointer: Vec2,
    /// Where the left button went down, if it is held.
    press_origin: Option<Vec2>,
    /// Set once a held press has moved beyond the click slop.
    dragged: bool,
    last_click: Option<Click>,
    scale_factor: f64,
}

impl Input {
    /// Create a new input tracker for a window with the given scale factor.
    pub fn new(scale_factor: f64) -> Self {
        Self {
            scale_factor,
            ..Default::default()
        }
    }

    pub fn set_scale_factor(&mut self, scale_factor: f64) {
        self.scale_factor = scale_factor;
    }

    /// Cursor position in logical pixels.
    pub fn pointer(&self) -> Vec2 {
        self.pointer
    }

    /// Translate one window event. Returns zero, one or two host events.
    pub fn translate(&mut self, event: &WindowEvent, timestamp_ms: f64) -> Vec<HostEvent> {
        match event {
            WindowEvent::CursorMoved { position, .. } => {
                let logical = position.to_logical::<f32>(self.scale_factor);
                vec![self.cursor_moved(Vec2::new(logical.x, logical.y))]
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let button = MouseButton::from(*button);
                match state {
                    ElementState::Pressed => vec![self.button_pressed(button)],
                    ElementState::Released => self.button_released(button, timestamp_ms),
                }
            }
            WindowEvent::MouseWheel { delta, .. } => vec![self.wheel(*delta)],
            WindowEvent::KeyboardInput { event, .. } if event.state == ElementState::Pressed => {
                vec![HostEvent::KeyDown {
                    key: Key::from(&event.logical_key),
                }]
            }
            _ => Vec::new(),
        }
    }

    pub fn cursor_moved(&mut self, position: Vec2) -> HostEvent {
        self.pointer = position;
        if let Some(origin) = self.press_origin {
            if origin.distance(position) > CLICK_SLOP_PX {
                self.dragged = true;
            }
        }
        HostEvent::PointerMove { position }
    }

    pub fn button_pressed(&mut self, button: MouseButton) -> HostEvent {
        if button == MouseButton::Left {
            self.press_origin = Some(self.pointer);
            self.dragged = false;
        }
        HostEvent::PointerDown {
            position: self.pointer,
            button,
        }
    }

    /// A left release that completes a second click within the window also
    /// yields a [`HostEvent::DoubleClick`].
    pub fn button_released(&mut self, button: MouseButton, timestamp_ms: f64) -> Vec<HostEvent> {
        let position = self.pointer;
        let mut events = vec![HostEvent::PointerUp { position, button }];

        if button != MouseButton::Left {
            return events;
        }

        let was_click = self.press_origin.take().is_some() && !self.dragged;
        self.dragged = false;
        if !was_click {
            self.last_click = None;
            return events;
        }

        let is_double = self.last_click.is_some_and(|prev| {
            timestamp_ms - prev.timestamp_ms <= DOUBLE_CLICK_WINDOW_MS
                && prev.position.distance(position) <= CLICK_SLOP_PX
        });

        if is_double {
            events.push(HostEvent::DoubleClick { position });
            self.last_click = None;
        } else {
            self.last_click = Some(Click { position, timestamp_ms });
        }
        events
    }

    /// Wheel delta in DOM convention: pixels, positive when scrolling down.
    pub fn wheel(&mut self, delta: MouseScrollDelta) -> HostEvent {
        let delta_y = match delta {
            MouseScrollDelta::LineDelta(_, y) => -y * PIXELS_PER_LINE,
            MouseScrollDelta::PixelDelta(pos) => -(pos.y / self.scale_factor.max(1.0)) as f32,
        };
        HostEvent::Wheel { delta_y }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn click(input: &mut Input, at: Vec2, timestamp_ms: f64) -> Vec<HostEvent> {
        input.cursor_moved(at);
        input.button_pressed(MouseButton::Left);
        input.button_released(MouseButton::Left, timestamp_ms)
    }

    #[test]
    fn test_double_click_detected() {
        let mut input = Input::new(1.0);
        let first = click(&mut input, Vec2::new(10.0, 10.0), 0.0);
        assert_eq!(first.len(), 1);

        let second = click(&mut input, Vec2::new(11.0, 10.0), 200.0);
        assert_eq!(second.len(), 2);
        assert!(matches!(second[1], HostEvent::DoubleClick { .. }));
    }

    #[test]
    fn test_slow_clicks_are_not_double() {
        let mut input = Input::new(1.0);
        click(&mut input, Vec2::ZERO, 0.0);
        let second = click(&mut input, Vec2::ZERO, 400.0);
        assert_eq!(second.len(), 1);
    }

    #[test]
    fn test_drag_is_not_a_click() {
        let mut input = Input::new(1.0);
        click(&mut input, Vec2::ZERO, 0.0);

        input.button_pressed(MouseButton::Left);
        input.cursor_moved(Vec2::new(50.0, 0.0));
        let events = input.button_released(MouseButton::Left, 100.0);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_wheel_uses_dom_sign() {
        let mut input = Input::new(1.0);
        // Scrolling the wheel towards the user (down) is a negative line delta in winit
        match input.wheel(MouseScrollDelta::LineDelta(0.0, -1.0)) {
            HostEvent::Wheel { delta_y } => assert_eq!(delta_y, 100.0),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_key_char_match() {
        assert!(Key::Character('E').is_char('e'));
        assert!(!Key::Space.is_char(' '));
    }
}
