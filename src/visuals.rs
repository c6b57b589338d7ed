//! Colours, materials and lights.
//!
//! Materials follow the Phong-style model the backdrops were designed with:
//! a base colour lit by the scene's lights, an emissive colour added on top
//! regardless of lighting, a specular exponent and an opacity.

use glam::Vec3;

/// Linear-ish RGB colour with components in 0.0-1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color(pub Vec3);

impl Color {
    pub const BLACK: Color = Color(Vec3::ZERO);
    pub const WHITE: Color = Color(Vec3::ONE);

    /// From a `0xRRGGBB` literal.
    pub fn hex(rgb: u32) -> Self {
        let r = ((rgb >> 16) & 0xff) as f32 / 255.0;
        let g = ((rgb >> 8) & 0xff) as f32 / 255.0;
        let b = (rgb & 0xff) as f32 / 255.0;
        Color(Vec3::new(r, g, b))
    }

    /// Back to `0xRRGGBB`, rounding each channel.
    pub fn to_hex(self) -> u32 {
        let c = (self.0.clamp(Vec3::ZERO, Vec3::ONE) * 255.0).round();
        ((c.x as u32) << 16) | ((c.y as u32) << 8) | c.z as u32
    }

    pub fn rgb(self) -> Vec3 {
        self.0
    }
}

/// Which faces of a mesh are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Side {
    /// Outward-facing triangles only.
    #[default]
    Front,
    /// Inward-facing triangles only (halo shells).
    Back,
    Double,
}

/// Surface appearance of a mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub color: Color,
    pub emissive: Color,
    pub emissive_intensity: f32,
    /// Specular exponent; 0 disables highlights.
    pub shininess: f32,
    pub opacity: f32,
    pub side: Side,
}

impl Material {
    pub fn new(color: Color) -> Self {
        Self {
            color,
            emissive: Color::BLACK,
            emissive_intensity: 1.0,
            shininess: 30.0,
            opacity: 1.0,
            side: Side::Front,
        }
    }

    pub fn emissive(mut self, emissive: Color, intensity: f32) -> Self {
        self.emissive = emissive;
        self.emissive_intensity = intensity;
        self
    }

    pub fn shininess(mut self, shininess: f32) -> Self {
        self.shininess = shininess;
        self
    }

    pub fn opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        self
    }

    pub fn side(mut self, side: Side) -> Self {
        self.side = side;
        self
    }

    pub fn is_transparent(&self) -> bool {
        self.opacity < 1.0
    }
}

/// A light source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Light {
    /// Uniform light on every surface.
    Ambient { color: Color, intensity: f32 },
    /// Parallel rays shining from `position` toward the origin.
    Directional {
        color: Color,
        intensity: f32,
        position: Vec3,
    },
    /// Light radiating from `position`, fading to zero at `range`.
    Point {
        color: Color,
        intensity: f32,
        position: Vec3,
        range: f32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_round_trip() {
        for hex in [0xff1a1a, 0x6366f1, 0x000000, 0xffffff, 0x10b981] {
            assert_eq!(Color::hex(hex).to_hex(), hex);
        }
    }

    #[test]
    fn test_hex_channels() {
        let c = Color::hex(0xff0000);
        assert_eq!(c.rgb(), Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_opacity_clamped() {
        let m = Material::new(Color::WHITE).opacity(1.5);
        assert_eq!(m.opacity, 1.0);
        assert!(!m.is_transparent());
        assert!(Material::new(Color::WHITE).opacity(0.3).is_transparent());
    }
}
