//! Double-helix geometry and per-atom motion.
//!
//! A [`HelixStructure`] owns every backend resource of one build: a shared
//! sphere mesh, a shared rod mesh, one material per strand and one material
//! per base pair. Changing complexity tears the whole thing down and builds
//! a fresh one.

use std::f32::consts::{PI, TAU};

use glam::{Mat4, Vec3};

use crate::backend::{MaterialHandle, MeshHandle, RenderBackend};
use crate::camera::Ray;
use crate::error::BackendError;
use crate::geometry;
use crate::scene::{DrawItem, Transform};
use crate::selection::Selection;
use crate::spawn::SpawnContext;
use crate::visuals::{Color, Material};

pub const ATOM_RADIUS: f32 = 0.25;
pub const ROD_RADIUS: f32 = 0.08;
/// Every this many indices along the helix carries a base-pair rod.
pub const BASE_PAIR_STRIDE: usize = 6;
/// Fraction of the remaining distance covered per frame.
pub const POSITION_LERP: f32 = 0.08;
/// Per-frame spin increment while exploded.
pub const EXPLODED_SPIN: Vec3 = Vec3::new(0.03, 0.04, 0.02);
/// Per-frame spin decay while settled.
pub const SPIN_DECAY: f32 = 0.9;

/// Level of detail. Switching rebuilds the structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Complexity {
    #[default]
    High,
    Low,
}

/// Helix dimensions for a complexity level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HelixPreset {
    pub height: f32,
    pub radius: f32,
    pub turns: f32,
    pub segments: usize,
}

impl Complexity {
    pub fn preset(self) -> HelixPreset {
        match self {
            Complexity::High => HelixPreset {
                height: 25.0,
                radius: 5.0,
                turns: 8.0,
                segments: 200,
            },
            Complexity::Low => HelixPreset {
                height: 15.0,
                radius: 5.0,
                turns: 5.0,
                segments: 100,
            },
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Complexity::High => Complexity::Low,
            Complexity::Low => Complexity::High,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtomKind {
    StrandA,
    StrandB,
    BasePair,
}

/// One rendered element of the helix and where it is heading.
#[derive(Debug, Clone, PartialEq)]
pub struct HelixAtom {
    pub kind: AtomKind,
    /// Position along the helix, `0..=segments`.
    pub index: usize,
    pub original: Vec3,
    pub exploded: Vec3,
    pub position: Vec3,
    /// Orientation at rest; base-pair rods lie along x.
    pub rest_rotation: Vec3,
    /// Extra tumbling accumulated while exploded.
    pub spin: Vec3,
    /// Scale of the last drawn frame.
    pub scale: f32,
}

impl HelixAtom {
    fn new(kind: AtomKind, index: usize, original: Vec3, exploded: Vec3) -> Self {
        let rest_rotation = match kind {
            AtomKind::BasePair => Vec3::new(0.0, 0.0, PI / 2.0),
            _ => Vec3::ZERO,
        };
        Self {
            kind,
            index,
            original,
            exploded,
            position: original,
            rest_rotation,
            spin: Vec3::ZERO,
            scale: 1.0,
        }
    }

    pub fn target(&self, exploded: bool) -> Vec3 {
        if exploded {
            self.exploded
        } else {
            self.original
        }
    }

    /// One frame of easing toward the active target.
    pub fn update(&mut self, exploded: bool) {
        self.position = self.position.lerp(self.target(exploded), POSITION_LERP);
        if exploded {
            self.spin += EXPLODED_SPIN;
        } else {
            self.spin *= SPIN_DECAY;
        }
    }

    /// Transform relative to the structure group.
    pub fn transform(&self) -> Transform {
        Transform::from_translation(self.position)
            .with_rotation(self.rest_rotation + self.spin)
            .with_uniform_scale(self.scale)
    }
}

/// What a pointer ray struck.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    /// Index into [`HelixStructure::atoms`].
    pub atom: usize,
    /// Base-pair ordinal if the atom is a rod.
    pub base_pair: Option<usize>,
    /// Distance along the ray, in structure-local units.
    pub distance: f32,
}

fn strand_a_material() -> Material {
    Material::new(Color::hex(0x6366f1)).emissive(Color::hex(0x4338ca), 0.3)
}

fn strand_b_material() -> Material {
    Material::new(Color::hex(0xec4899)).emissive(Color::hex(0xdb2777), 0.3)
}

/// Default look of every base pair.
pub fn base_pair_material() -> Material {
    Material::new(Color::hex(0x10b981)).emissive(Color::hex(0x059669), 0.4)
}

/// Positions and explode targets for one complexity level.
pub fn layout(complexity: Complexity, ctx: &mut SpawnContext) -> Vec<HelixAtom> {
    let p = complexity.preset();
    let mut atoms = Vec::with_capacity((p.segments + 1) * 2 + p.segments / BASE_PAIR_STRIDE + 1);

    for i in 0..=p.segments {
        let progress = i as f32 / p.segments as f32;
        let y = progress * p.height - p.height / 2.0;
        let angle = progress * p.turns * TAU;

        let a = Vec3::new(angle.cos() * p.radius, y, angle.sin() * p.radius);
        let b = Vec3::new((angle + PI).cos() * p.radius, y, (angle + PI).sin() * p.radius);
        atoms.push(HelixAtom::new(AtomKind::StrandA, i, a, a * 4.0 + ctx.random_in_cube(10.0)));
        atoms.push(HelixAtom::new(AtomKind::StrandB, i, b, b * 4.0 + ctx.random_in_cube(10.0)));

        if i % BASE_PAIR_STRIDE == 0 {
            let center = Vec3::new(0.0, y, 0.0);
            atoms.push(HelixAtom::new(
                AtomKind::BasePair,
                i,
                center,
                center + ctx.random_in_cube(12.5),
            ));
        }
    }
    atoms
}

/// A built helix and the backend resources behind it.
#[derive(Debug)]
pub struct HelixStructure {
    complexity: Complexity,
    atoms: Vec<HelixAtom>,
    /// Atom index of each base pair, in order.
    base_pairs: Vec<usize>,
    sphere: MeshHandle,
    rod: MeshHandle,
    strand_a: MaterialHandle,
    strand_b: MaterialHandle,
    base_pair_materials: Vec<MaterialHandle>,
    rod_half_length: f32,
}

/// Partially acquired resources, released on a failed build.
#[derive(Default)]
struct Acquired {
    meshes: Vec<MeshHandle>,
    materials: Vec<MaterialHandle>,
}

impl Acquired {
    fn mesh(
        &mut self,
        backend: &mut dyn RenderBackend,
        mesh: &geometry::Mesh,
    ) -> Result<MeshHandle, BackendError> {
        let handle = backend.create_mesh(mesh)?;
        self.meshes.push(handle);
        Ok(handle)
    }

    fn material(
        &mut self,
        backend: &mut dyn RenderBackend,
        material: &Material,
    ) -> Result<MaterialHandle, BackendError> {
        let handle = backend.create_material(material)?;
        self.materials.push(handle);
        Ok(handle)
    }

    fn release(self, backend: &mut dyn RenderBackend) {
        for mesh in self.meshes {
            backend.release_mesh(mesh);
        }
        for material in self.materials {
            backend.release_material(material);
        }
    }
}

impl HelixStructure {
    /// Lay out the helix and create its resources. On failure nothing is
    /// left allocated.
    pub fn build(
        complexity: Complexity,
        ctx: &mut SpawnContext,
        backend: &mut dyn RenderBackend,
    ) -> Result<Self, BackendError> {
        let atoms = layout(complexity, ctx);
        let base_pairs: Vec<usize> = atoms
            .iter()
            .enumerate()
            .filter(|(_, a)| a.kind == AtomKind::BasePair)
            .map(|(i, _)| i)
            .collect();
        let radius = complexity.preset().radius;

        let mut acquired = Acquired::default();
        let result = (|| -> Result<_, BackendError> {
            let sphere = acquired.mesh(backend, &geometry::uv_sphere(ATOM_RADIUS, 16, 16))?;
            let rod = acquired.mesh(backend, &geometry::cylinder(ROD_RADIUS, radius * 2.0, 8))?;
            let strand_a = acquired.material(backend, &strand_a_material())?;
            let strand_b = acquired.material(backend, &strand_b_material())?;
            let mut base_pair_materials = Vec::with_capacity(base_pairs.len());
            for _ in &base_pairs {
                base_pair_materials.push(acquired.material(backend, &base_pair_material())?);
            }
            Ok((sphere, rod, strand_a, strand_b, base_pair_materials))
        })();

        match result {
            Ok((sphere, rod, strand_a, strand_b, base_pair_materials)) => Ok(Self {
                complexity,
                atoms,
                base_pairs,
                sphere,
                rod,
                strand_a,
                strand_b,
                base_pair_materials,
                rod_half_length: radius,
            }),
            Err(e) => {
                acquired.release(backend);
                Err(e)
            }
        }
    }

    /// Release every mesh and material of this build.
    pub fn teardown(self, backend: &mut dyn RenderBackend) {
        backend.release_mesh(self.sphere);
        backend.release_mesh(self.rod);
        backend.release_material(self.strand_a);
        backend.release_material(self.strand_b);
        for material in self.base_pair_materials {
            backend.release_material(material);
        }
    }

    pub fn complexity(&self) -> Complexity {
        self.complexity
    }

    pub fn atoms(&self) -> &[HelixAtom] {
        &self.atoms
    }

    pub fn base_pair_count(&self) -> usize {
        self.base_pairs.len()
    }

    /// The atom of base pair `ordinal`.
    pub fn base_pair(&self, ordinal: usize) -> Option<&HelixAtom> {
        self.base_pairs.get(ordinal).map(|&i| &self.atoms[i])
    }

    pub fn base_pair_material_handle(&self, ordinal: usize) -> Option<MaterialHandle> {
        self.base_pair_materials.get(ordinal).copied()
    }

    /// Advance every atom one frame.
    pub fn update(&mut self, exploded: bool) {
        for atom in &mut self.atoms {
            atom.update(exploded);
        }
    }

    /// Largest distance of any atom from its active target.
    pub fn max_target_error(&self, exploded: bool) -> f32 {
        self.atoms
            .iter()
            .map(|a| a.position.distance(a.target(exploded)))
            .fold(0.0, f32::max)
    }

    /// Reset every base pair to its default look, then highlight the
    /// selected one. Runs every frame.
    pub fn apply_selection(
        &mut self,
        selection: &Selection,
        t: f32,
        backend: &mut dyn RenderBackend,
    ) -> Result<(), BackendError> {
        let base = base_pair_material();
        let pairs = self.base_pairs.iter().zip(&self.base_pair_materials);
        for (ordinal, (&atom, &material)) in pairs.enumerate() {
            let (look, scale) = selection.appearance(ordinal, &base, t);
            backend.update_material(material, &look)?;
            self.atoms[atom].scale = scale;
        }
        Ok(())
    }

    /// Draw list with every atom placed inside `group`.
    pub fn draw_items(&self, group: Mat4) -> Vec<DrawItem> {
        let mut base_pair_ordinal = 0;
        self.atoms
            .iter()
            .map(|atom| {
                let (mesh, material) = match atom.kind {
                    AtomKind::StrandA => (self.sphere, self.strand_a),
                    AtomKind::StrandB => (self.sphere, self.strand_b),
                    AtomKind::BasePair => {
                        let material = self.base_pair_materials[base_pair_ordinal];
                        base_pair_ordinal += 1;
                        (self.rod, material)
                    }
                };
                DrawItem {
                    mesh,
                    material,
                    model: group * atom.transform().matrix(),
                }
            })
            .collect()
    }

    /// Nearest atom or rod along a world-space ray.
    pub fn hit_test(&self, ray: &Ray, group: Mat4) -> Option<Hit> {
        let local = ray.transformed(group.inverse());
        let mut nearest: Option<Hit> = None;
        let mut base_pair_ordinal = 0;

        for (i, atom) in self.atoms.iter().enumerate() {
            let (distance, base_pair) = match atom.kind {
                AtomKind::StrandA | AtomKind::StrandB => {
                    (local.intersect_sphere(atom.position, ATOM_RADIUS * atom.scale), None)
                }
                AtomKind::BasePair => {
                    let model = atom.transform().matrix();
                    let a = model.transform_point3(Vec3::new(0.0, -self.rod_half_length, 0.0));
                    let b = model.transform_point3(Vec3::new(0.0, self.rod_half_length, 0.0));
                    let ordinal = base_pair_ordinal;
                    base_pair_ordinal += 1;
                    (local.intersect_capsule(a, b, ROD_RADIUS * atom.scale), Some(ordinal))
                }
            };
            if let Some(distance) = distance {
                if nearest.map_or(true, |h| distance < h.distance) {
                    nearest = Some(Hit {
                        atom: i,
                        base_pair,
                        distance,
                    });
                }
            }
        }
        nearest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessBackend;
    use approx::assert_relative_eq;

    #[test]
    fn test_layout_counts() {
        let mut ctx = SpawnContext::new(Some(1));
        let atoms = layout(Complexity::High, &mut ctx);
        let strands = atoms.iter().filter(|a| a.kind != AtomKind::BasePair).count();
        let pairs = atoms.iter().filter(|a| a.kind == AtomKind::BasePair).count();
        assert_eq!(strands, 201 * 2);
        // 0, 6, ..., 198
        assert_eq!(pairs, 34);

        let low = layout(Complexity::Low, &mut ctx);
        assert_eq!(low.iter().filter(|a| a.kind == AtomKind::BasePair).count(), 17);
    }

    #[test]
    fn test_strands_are_opposite() {
        let mut ctx = SpawnContext::new(Some(2));
        let atoms = layout(Complexity::Low, &mut ctx);
        let a = atoms.iter().find(|a| a.kind == AtomKind::StrandA && a.index == 7).unwrap();
        let b = atoms.iter().find(|a| a.kind == AtomKind::StrandB && a.index == 7).unwrap();
        assert_relative_eq!(a.original.x, -b.original.x, epsilon = 1e-4);
        assert_relative_eq!(a.original.z, -b.original.z, epsilon = 1e-4);
        assert_relative_eq!(a.original.y, b.original.y);
        let radial = Vec3::new(a.original.x, 0.0, a.original.z).length();
        assert_relative_eq!(radial, 5.0, epsilon = 1e-4);
    }

    #[test]
    fn test_explode_targets_within_jitter() {
        let mut ctx = SpawnContext::new(Some(3));
        for atom in layout(Complexity::High, &mut ctx) {
            let (center, jitter) = match atom.kind {
                AtomKind::BasePair => (atom.original, 12.5),
                _ => (atom.original * 4.0, 10.0),
            };
            assert!((atom.exploded - center).abs().max_element() <= jitter);
        }
    }

    #[test]
    fn test_rest_rotation_survives_spin_decay() {
        let mut ctx = SpawnContext::new(Some(4));
        let mut atom = layout(Complexity::Low, &mut ctx)
            .into_iter()
            .find(|a| a.kind == AtomKind::BasePair)
            .unwrap();
        for _ in 0..30 {
            atom.update(true);
        }
        for _ in 0..400 {
            atom.update(false);
        }
        let rotation = atom.transform().rotation;
        assert_relative_eq!(rotation.z, PI / 2.0, epsilon = 1e-4);
        assert_relative_eq!(rotation.x, 0.0, epsilon = 1e-4);
    }

    #[test]
    fn test_build_and_teardown_balance() {
        let mut ctx = SpawnContext::new(Some(5));
        let mut backend = HeadlessBackend::new();
        let structure = HelixStructure::build(Complexity::High, &mut ctx, &mut backend).unwrap();
        assert_eq!(backend.live_meshes(), 2);
        assert_eq!(backend.live_materials(), 2 + structure.base_pair_count());

        structure.teardown(&mut backend);
        assert_eq!(backend.live_meshes(), 0);
        assert_eq!(backend.live_materials(), 0);
    }

    #[test]
    fn test_failed_build_releases_partial_resources() {
        let mut ctx = SpawnContext::new(Some(6));
        let mut backend = HeadlessBackend::failing_after(5);
        assert!(HelixStructure::build(Complexity::Low, &mut ctx, &mut backend).is_err());
        assert_eq!(backend.live_meshes(), 0);
        assert_eq!(backend.live_materials(), 0);
    }

    #[test]
    fn test_hit_test_finds_rod() {
        let mut ctx = SpawnContext::new(Some(7));
        let mut backend = HeadlessBackend::new();
        let structure = HelixStructure::build(Complexity::Low, &mut ctx, &mut backend).unwrap();

        // Straight down -z through the middle of the first rod, which lies along x
        let rod = structure.base_pair(0).unwrap();
        let ray = Ray::new(rod.position + Vec3::new(2.0, 0.0, 50.0), Vec3::NEG_Z);
        let hit = structure.hit_test(&ray, Mat4::IDENTITY).unwrap();
        assert_eq!(hit.base_pair, Some(0));

        let miss = Ray::new(Vec3::new(0.0, 1000.0, 50.0), Vec3::NEG_Z);
        assert!(structure.hit_test(&miss, Mat4::IDENTITY).is_none());
    }
}
