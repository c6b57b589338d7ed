//! Procedural triangle meshes.
//!
//! Winding is counter-clockwise seen from outside, so back-face culling
//! keeps the outer surface.

use glam::Vec3;
use std::f32::consts::{PI, TAU};

/// Indexed triangle mesh with per-vertex normals.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mesh {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Check that the mesh can be uploaded as-is.
    pub fn validate(&self) -> Result<(), String> {
        if self.positions.is_empty() {
            return Err("mesh has no vertices".into());
        }
        if self.indices.is_empty() || self.indices.len() % 3 != 0 {
            return Err(format!(
                "index count {} is not a positive multiple of 3",
                self.indices.len()
            ));
        }
        if self.normals.len() != self.positions.len() {
            return Err(format!(
                "{} normals for {} vertices",
                self.normals.len(),
                self.positions.len()
            ));
        }
        let n = self.positions.len() as u32;
        if let Some(bad) = self.indices.iter().find(|&&i| i >= n) {
            return Err(format!("index {} out of range for {} vertices", bad, n));
        }
        let non_finite = self.positions.iter().filter(|p| !p.is_finite()).count();
        if non_finite > 0 {
            return Err(format!("{} of {} positions are not finite", non_finite, n));
        }
        Ok(())
    }

    /// Largest distance of any vertex from the local origin.
    pub fn bounding_radius(&self) -> f32 {
        self.positions.iter().map(|p| p.length()).fold(0.0, f32::max)
    }

    /// Recompute normals by averaging the area-weighted normals of the
    /// faces around each vertex.
    pub fn compute_vertex_normals(&mut self) {
        let mut normals = vec![Vec3::ZERO; self.positions.len()];
        for tri in self.indices.chunks_exact(3) {
            let (a, b, c) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
            let (pa, pb, pc) = (self.positions[a], self.positions[b], self.positions[c]);
            let face = (pb - pa).cross(pc - pa);
            normals[a] += face;
            normals[b] += face;
            normals[c] += face;
        }
        // Pole vertices only touch degenerate faces; point them along y.
        for (normal, position) in normals.iter_mut().zip(&self.positions) {
            *normal = normal
                .try_normalize()
                .unwrap_or_else(|| if position.y < 0.0 { Vec3::NEG_Y } else { Vec3::Y });
        }
        self.normals = normals;
    }
}

/// UV sphere with `width_segments` around and `height_segments` pole to pole.
pub fn uv_sphere(radius: f32, width_segments: u32, height_segments: u32) -> Mesh {
    let ws = width_segments.max(3);
    let hs = height_segments.max(2);

    let mut positions = Vec::with_capacity(((ws + 1) * (hs + 1)) as usize);
    let mut normals = Vec::with_capacity(positions.capacity());
    for iy in 0..=hs {
        let v = iy as f32 / hs as f32;
        for ix in 0..=ws {
            let u = ix as f32 / ws as f32;
            let p = Vec3::new(
                -radius * (u * TAU).cos() * (v * PI).sin(),
                radius * (v * PI).cos(),
                radius * (u * TAU).sin() * (v * PI).sin(),
            );
            positions.push(p);
            normals.push(p.normalize_or_zero());
        }
    }

    let row = ws + 1;
    let mut indices = Vec::with_capacity((ws * hs * 6) as usize);
    for iy in 0..hs {
        for ix in 0..ws {
            let a = iy * row + ix + 1;
            let b = iy * row + ix;
            let c = (iy + 1) * row + ix;
            let d = (iy + 1) * row + ix + 1;
            if iy != 0 {
                indices.extend_from_slice(&[a, b, d]);
            }
            if iy != hs - 1 {
                indices.extend_from_slice(&[b, c, d]);
            }
        }
    }

    Mesh {
        positions,
        normals,
        indices,
    }
}

/// Flatten a sphere of radius `radius` into a biconcave disc.
///
/// Each vertex's height is scaled by `0.3 - 0.4 * d^2`, where `d` is its
/// distance from the vertical axis over `radius`: the rim keeps a little
/// thickness while the centre pinches in. Normals are recomputed.
pub fn deform_biconcave(mesh: &mut Mesh, radius: f32) {
    for p in &mut mesh.positions {
        let d = (p.x * p.x + p.z * p.z).sqrt() / radius;
        p.y *= 0.3 - d * d * 0.4;
    }
    mesh.compute_vertex_normals();
}

/// Red blood cell body: a 120x96 sphere squashed into a biconcave disc.
pub fn blood_cell(radius: f32) -> Mesh {
    let mut mesh = uv_sphere(radius, 120, 96);
    deform_biconcave(&mut mesh, radius);
    mesh
}

/// Capped cylinder along the y axis, centred on the origin.
pub fn cylinder(radius: f32, height: f32, radial_segments: u32) -> Mesh {
    let segments = radial_segments.max(3);
    let half = height / 2.0;
    let mut mesh = Mesh::default();

    // Side wall: top ring then bottom ring
    for y in [half, -half] {
        for ix in 0..=segments {
            let theta = ix as f32 / segments as f32 * TAU;
            let (sin, cos) = theta.sin_cos();
            mesh.positions.push(Vec3::new(radius * sin, y, radius * cos));
            mesh.normals.push(Vec3::new(sin, 0.0, cos));
        }
    }
    let row = segments + 1;
    for ix in 0..segments {
        let a = ix;
        let b = row + ix;
        let c = row + ix + 1;
        let d = ix + 1;
        mesh.indices.extend_from_slice(&[a, b, d, b, c, d]);
    }

    // Caps
    for (y, normal) in [(half, Vec3::Y), (-half, Vec3::NEG_Y)] {
        let center = mesh.positions.len() as u32;
        mesh.positions.push(Vec3::new(0.0, y, 0.0));
        mesh.normals.push(normal);
        let first = center + 1;
        for ix in 0..=segments {
            let theta = ix as f32 / segments as f32 * TAU;
            mesh.positions.push(Vec3::new(radius * theta.sin(), y, radius * theta.cos()));
            mesh.normals.push(normal);
        }
        for ix in 0..segments {
            let (p, q) = (first + ix, first + ix + 1);
            if normal.y > 0.0 {
                mesh.indices.extend_from_slice(&[center, p, q]);
            } else {
                mesh.indices.extend_from_slice(&[center, q, p]);
            }
        }
    }

    mesh
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn outward_fraction(mesh: &Mesh) -> f32 {
        let mut outward = 0;
        let mut total = 0;
        for tri in mesh.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| mesh.positions[i as usize]);
            let n = (b - a).cross(c - a);
            if n.length_squared() < 1e-12 {
                continue;
            }
            total += 1;
            if n.dot((a + b + c) / 3.0) > 0.0 {
                outward += 1;
            }
        }
        outward as f32 / total as f32
    }

    #[test]
    fn test_sphere_counts() {
        let mesh = uv_sphere(1.0, 16, 12);
        assert_eq!(mesh.vertex_count(), 17 * 13);
        // Pole rows contribute one triangle per quad
        assert_eq!(mesh.triangle_count(), (16 * 12 * 2 - 2 * 16) as usize);
        assert!(mesh.validate().is_ok());
        assert_relative_eq!(mesh.bounding_radius(), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_sphere_winding_is_outward() {
        assert_eq!(outward_fraction(&uv_sphere(2.0, 24, 16)), 1.0);
    }

    #[test]
    fn test_cylinder_winding_is_outward() {
        let mesh = cylinder(0.5, 3.0, 8);
        assert!(mesh.validate().is_ok());
        assert_eq!(outward_fraction(&mesh), 1.0);
    }

    #[test]
    fn test_biconcave_is_flat_and_pinched() {
        let radius = 60.0;
        let mesh = blood_cell(radius);
        assert!(mesh.validate().is_ok());

        let max_y = mesh.positions.iter().map(|p| p.y.abs()).fold(0.0, f32::max);
        // Thickness never exceeds 0.3 of the radius
        assert!(max_y <= radius * 0.3 + 1e-3);

        // Poles sit on the axis and keep 0.3 of their height
        let pole = mesh.positions[0];
        assert_relative_eq!(pole.y, radius * 0.3, epsilon = 1e-3);

        for n in &mesh.normals {
            assert_relative_eq!(n.length(), 1.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_validate_rejects_bad_index() {
        let mut mesh = uv_sphere(1.0, 8, 4);
        mesh.indices.push(10_000);
        mesh.indices.push(0);
        mesh.indices.push(1);
        assert!(mesh.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_degenerate_blood_cell() {
        // Zero radius divides by zero in the flattening
        let err = blood_cell(0.0).validate().unwrap_err();
        assert!(err.contains("not finite"), "{}", err);

        let mut mesh = uv_sphere(1.0, 8, 4);
        mesh.positions[3].x = f32::INFINITY;
        assert!(mesh.validate().is_err());
    }
}
