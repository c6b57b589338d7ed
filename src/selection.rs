//! Base-pair selection highlight.
//!
//! At most one base pair is selected at a time. The selected one blinks
//! yellow and grows; every frame all others are put back to their default
//! look, so clearing or moving the selection never leaves a stale highlight.

use crate::visuals::{Color, Material};

/// Colour and emissive colour of the highlighted base pair.
pub const HIGHLIGHT_COLOR: u32 = 0xffff00;
/// Scale applied to the highlighted base pair.
pub const HIGHLIGHT_SCALE: f32 = 1.5;

/// Which base pair, by index into the structure's base-pair list, is selected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Selection {
    selected: Option<usize>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(&mut self, base_pair: usize) {
        self.selected = Some(base_pair);
    }

    pub fn clear(&mut self) {
        self.selected = None;
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn is_selected(&self, base_pair: usize) -> bool {
        self.selected == Some(base_pair)
    }

    /// Material and scale for base pair `index` at time `t` (seconds).
    pub fn appearance(&self, index: usize, base: &Material, t: f32) -> (Material, f32) {
        if self.is_selected(index) {
            (highlight(base, t), HIGHLIGHT_SCALE)
        } else {
            (*base, 1.0)
        }
    }
}

/// The blinking highlight derived from a base-pair material.
pub fn highlight(base: &Material, t: f32) -> Material {
    let yellow = Color::hex(HIGHLIGHT_COLOR);
    Material {
        color: yellow,
        emissive: yellow,
        emissive_intensity: 0.9 + (t * 12.0).sin() * 0.3,
        ..*base
    }
}
