//! Behaviour of the helix viewer driven through the headless host.

use approx::assert_relative_eq;
use glam::{Vec2, Vec4};

use bioscape::camera::{pointer_ndc, Ray};
use bioscape::components::helix::structure::{base_pair_material, EXPLODED_SPIN};
use bioscape::components::helix::{MAX_DISTANCE, MAX_SPEED, MIN_DISTANCE, SLIDER_MAX_SPEED};
use bioscape::host::{CursorStyle, MountBox};
use bioscape::prelude::*;
use bioscape::selection::{HIGHLIGHT_COLOR, HIGHLIGHT_SCALE};

const WIDTH: f32 = 1280.0;
const HEIGHT: f32 = 720.0;
const FRAME_MS: f64 = 16.0;
/// A point in the window corner, far from the molecule.
const EMPTY_SPOT: Vec2 = Vec2::new(2.0, 2.0);

struct Rig {
    host: HeadlessHost,
    backend: HeadlessBackend,
    viewer: InteractiveHelixViewer,
}

impl Rig {
    fn new(config: HelixConfig) -> Self {
        let mut host = HeadlessHost::new(WIDTH, HEIGHT);
        let mut backend = HeadlessBackend::new();
        let config = config
            .with_seed(11)
            .with_performance_mode(PerformanceMode::High);
        let mut viewer = InteractiveHelixViewer::new(config);
        viewer.mount(&mut host, &mut backend);
        assert!(viewer.is_mounted());
        let mut rig = Self { host, backend, viewer };
        rig.frames(1);
        rig
    }

    fn frames(&mut self, count: usize) {
        self.host.run_frames(&mut self.viewer, &mut self.backend, count, FRAME_MS);
    }

    fn send(&mut self, event: HostEvent) -> bool {
        self.host.dispatch(&mut self.viewer, &mut self.backend, event)
    }

    fn key(&mut self, key: Key) {
        self.send(HostEvent::KeyDown { key });
    }

    fn click(&mut self, position: Vec2) {
        self.send(HostEvent::PointerDown {
            position,
            button: MouseButton::Left,
        });
        self.send(HostEvent::PointerUp {
            position,
            button: MouseButton::Left,
        });
    }

    /// Screen position of a structure-local point.
    fn screen_of(&self, local: Vec3) -> Vec2 {
        let group = self.viewer.group_matrix().unwrap();
        let view_proj = self.viewer.view_proj().unwrap();
        let clip = view_proj * (group.transform_point3(local)).extend(1.0);
        let ndc = Vec4::new(clip.x / clip.w, clip.y / clip.w, 0.0, 0.0);
        Vec2::new((ndc.x + 1.0) * 0.5 * WIDTH, (1.0 - ndc.y) * 0.5 * HEIGHT)
    }

    /// A screen point whose ray's nearest hit is base pair `ordinal`.
    fn base_pair_on_screen(&self) -> (usize, Vec2) {
        let structure = self.viewer.structure().unwrap();
        let group = self.viewer.group_matrix().unwrap();
        let view_proj = self.viewer.view_proj().unwrap();
        (0..structure.base_pair_count())
            .find_map(|ordinal| {
                let position = self.screen_of(structure.base_pair(ordinal).unwrap().position);
                let ndc = pointer_ndc(position, MountBox::new(WIDTH, HEIGHT));
                let ray = Ray::from_ndc(ndc, view_proj);
                let hit = structure.hit_test(&ray, group)?;
                (hit.base_pair == Some(ordinal)).then_some((ordinal, position))
            })
            .expect("at least one base pair faces the camera")
    }

    /// Screen position of the strand atom closest to the camera.
    fn strand_atom_on_screen(&self) -> Vec2 {
        let structure = self.viewer.structure().unwrap();
        let atom = structure
            .atoms()
            .iter()
            .find(|a| a.kind != bioscape::components::helix::AtomKind::BasePair)
            .unwrap();
        self.screen_of(atom.position)
    }
}

#[test]
fn test_explode_converges_then_reforms() {
    let mut rig = Rig::new(HelixConfig::new());

    rig.key(Key::Character('e'));
    assert!(rig.viewer.is_exploded());
    rig.frames(300);
    assert!(rig.viewer.structure().unwrap().max_target_error(true) < 1e-2);

    rig.key(Key::Character('E'));
    assert!(!rig.viewer.is_exploded());
    rig.frames(300);
    let structure = rig.viewer.structure().unwrap();
    assert!(structure.max_target_error(false) < 1e-2);
    for atom in structure.atoms() {
        assert!(atom.position.distance(atom.original) < 1e-2);
    }
}

fn max_spin(viewer: &InteractiveHelixViewer) -> f32 {
    let structure = viewer.structure().unwrap();
    structure.atoms().iter().map(|a| a.spin.length()).fold(0.0, f32::max)
}

#[test]
fn test_rotation_freezes_while_exploded_and_spin_settles() {
    let mut rig = Rig::new(HelixConfig::new());
    rig.frames(5);
    assert_eq!(max_spin(&rig.viewer), 0.0);

    rig.key(Key::Character('e'));
    let frozen = rig.viewer.group_matrix().unwrap();
    let mut last_spin = 0.0;
    for _ in 0..20 {
        rig.frames(1);
        assert_eq!(rig.viewer.group_matrix().unwrap(), frozen);
        let spin = max_spin(&rig.viewer);
        assert!(spin > last_spin, "spin {} after {}", spin, last_spin);
        last_spin = spin;
    }
    // Every atom has picked up the same per-frame spin
    let expected = (EXPLODED_SPIN * 20.0).length();
    for atom in rig.viewer.structure().unwrap().atoms() {
        assert_relative_eq!(atom.spin.length(), expected, epsilon = 1e-4);
    }

    rig.key(Key::Character('e'));
    rig.frames(1);
    let resumed = rig.viewer.group_matrix().unwrap();
    assert_ne!(resumed, frozen);
    rig.frames(1);
    assert_ne!(rig.viewer.group_matrix().unwrap(), resumed);

    rig.frames(60);
    let settled = max_spin(&rig.viewer);
    assert!(settled < last_spin * 0.01, "spin {} did not decay", settled);
}

#[test]
fn test_exploded_targets_differ_from_rest() {
    let rig = Rig::new(HelixConfig::new());
    let structure = rig.viewer.structure().unwrap();
    assert!(structure.atoms().iter().any(|a| a.exploded.distance(a.original) > 1.0));
}

#[test]
fn test_wheel_keeps_distance_in_range() {
    let mut rig = Rig::new(HelixConfig::new());
    for delta_y in [1e6, -1e6, 350.0, -35.0, 0.0, f32::MAX, -f32::MAX, f32::NAN, 120.0] {
        rig.send(HostEvent::Wheel { delta_y });
        let distance = rig.viewer.camera().unwrap().distance();
        assert!((MIN_DISTANCE..=MAX_DISTANCE).contains(&distance), "distance {}", distance);
    }
}

#[test]
fn test_double_click_on_empty_space_does_nothing() {
    let mut rig = Rig::new(HelixConfig::new());
    assert!(rig.send(HostEvent::DoubleClick { position: EMPTY_SPOT }));
    assert!(!rig.viewer.is_exploded());
}

#[test]
fn test_double_click_on_molecule_toggles() {
    let mut rig = Rig::new(HelixConfig::new());
    let position = rig.strand_atom_on_screen();

    rig.send(HostEvent::DoubleClick { position });
    assert!(rig.viewer.is_exploded());

    // Atoms have not moved yet, so the same spot still hits
    rig.send(HostEvent::DoubleClick { position });
    assert!(!rig.viewer.is_exploded());
}

#[test]
fn test_resize_updates_output_and_aspect() {
    let mut rig = Rig::new(HelixConfig::new());
    assert_eq!(rig.backend.output_size(), (1280, 720));

    assert!(rig.host.resize_to(&mut rig.viewer, &mut rig.backend, 800.0, 600.0));
    assert_eq!(rig.backend.output_size(), (800, 600));
    assert_relative_eq!(rig.viewer.projection().unwrap().aspect, 800.0 / 600.0);
}

#[test]
fn test_select_then_deselect_restores_defaults() {
    let mut rig = Rig::new(HelixConfig::new());
    let (ordinal, position) = rig.base_pair_on_screen();

    rig.click(position);
    assert_eq!(rig.viewer.selected_base_pair(), Some(ordinal));
    rig.frames(1);
    {
        let structure = rig.viewer.structure().unwrap();
        let handle = structure.base_pair_material_handle(ordinal).unwrap();
        assert_eq!(rig.backend.material(handle).unwrap().color.to_hex(), HIGHLIGHT_COLOR);
        assert_eq!(structure.base_pair(ordinal).unwrap().scale, HIGHLIGHT_SCALE);
    }

    rig.click(EMPTY_SPOT);
    assert_eq!(rig.viewer.selected_base_pair(), None);
    rig.frames(1);

    let structure = rig.viewer.structure().unwrap();
    let default = base_pair_material();
    for k in 0..structure.base_pair_count() {
        let handle = structure.base_pair_material_handle(k).unwrap();
        assert_eq!(rig.backend.material(handle), Some(&default));
        assert_eq!(structure.base_pair(k).unwrap().scale, 1.0);
    }
}

#[test]
fn test_drag_orbits_without_selecting() {
    let mut rig = Rig::new(HelixConfig::new());
    let start = Vec2::new(100.0, 100.0);

    rig.send(HostEvent::PointerDown {
        position: start,
        button: MouseButton::Left,
    });
    rig.send(HostEvent::PointerMove {
        position: start + Vec2::new(100.0, 0.0),
    });
    rig.send(HostEvent::PointerUp {
        position: start + Vec2::new(100.0, 0.0),
        button: MouseButton::Left,
    });

    let (yaw, pitch) = rig.viewer.camera().unwrap().target_angles();
    assert_relative_eq!(yaw, 0.8, epsilon = 1e-5);
    assert_eq!(pitch, 0.0);
    assert_eq!(rig.viewer.selected_base_pair(), None);
}

#[test]
fn test_hover_switches_cursor() {
    let mut rig = Rig::new(HelixConfig::new());
    let over = rig.strand_atom_on_screen();

    rig.send(HostEvent::PointerMove { position: over });
    assert!(rig.viewer.is_hovering());
    assert_eq!(rig.host.cursor(), CursorStyle::Pointer);

    rig.send(HostEvent::PointerMove { position: EMPTY_SPOT });
    assert!(!rig.viewer.is_hovering());
    assert_eq!(rig.host.cursor(), CursorStyle::Default);
}

#[test]
fn test_speed_keys() {
    let mut rig = Rig::new(HelixConfig::new());
    assert_eq!(rig.viewer.speed(), Some(0.5));

    rig.key(Key::Space);
    assert_eq!(rig.viewer.speed(), Some(0.0));
    rig.key(Key::Space);
    assert_eq!(rig.viewer.speed(), Some(0.5));

    for _ in 0..30 {
        rig.key(Key::Character('+'));
    }
    assert_eq!(rig.viewer.speed(), Some(MAX_SPEED));

    for _ in 0..30 {
        rig.key(Key::Character('-'));
    }
    assert_eq!(rig.viewer.speed(), Some(0.0));
}

#[test]
fn test_set_speed_clamps() {
    let mut rig = Rig::new(HelixConfig::new());
    rig.viewer.set_speed(1.3);
    assert_eq!(rig.viewer.speed(), Some(1.3));
    rig.viewer.set_speed(SLIDER_MAX_SPEED);
    assert_eq!(rig.viewer.speed(), Some(2.0));
    rig.viewer.set_speed(99.0);
    assert_eq!(rig.viewer.speed(), Some(MAX_SPEED));
    rig.viewer.set_speed(-1.0);
    assert_eq!(rig.viewer.speed(), Some(0.0));
    rig.viewer.set_speed(f32::NAN);
    assert_eq!(rig.viewer.speed(), Some(0.0));

    let mut idle = InteractiveHelixViewer::new(HelixConfig::new());
    idle.set_speed(1.0);
    assert_eq!(idle.speed(), None);
}

#[test]
fn test_toggle_complexity_matches_key() {
    let mut rig = Rig::new(HelixConfig::new());
    rig.viewer.toggle_complexity(&mut rig.backend);
    assert_eq!(rig.viewer.complexity(), Some(Complexity::Low));
    assert_eq!(rig.backend.live_materials(), 2 + 17);

    rig.viewer.toggle_complexity(&mut rig.backend);
    assert_eq!(rig.viewer.complexity(), Some(Complexity::High));
    assert_eq!(rig.backend.live_meshes(), 2);
    assert_eq!(rig.backend.live_materials(), 2 + 34);
}

#[test]
fn test_reset_key() {
    let mut rig = Rig::new(HelixConfig::new());
    rig.send(HostEvent::Wheel { delta_y: 500.0 });
    rig.key(Key::Character('e'));
    rig.send(HostEvent::PointerDown {
        position: Vec2::ZERO,
        button: MouseButton::Left,
    });
    rig.send(HostEvent::PointerMove {
        position: Vec2::new(50.0, 50.0),
    });

    rig.key(Key::Character('r'));
    let camera = rig.viewer.camera().unwrap();
    assert_eq!(camera.target_angles(), (0.0, 0.0));
    assert_relative_eq!(camera.distance(), bioscape::components::helix::initial_distance());
    assert!(!rig.viewer.is_exploded());
}

#[test]
fn test_complexity_rebuild_balances_resources() {
    let mut rig = Rig::new(HelixConfig::new());
    assert_eq!(rig.backend.live_meshes(), 2);
    assert_eq!(rig.backend.live_materials(), 2 + 34);

    rig.key(Key::Character('c'));
    assert_eq!(rig.viewer.complexity(), Some(Complexity::Low));
    assert_eq!(rig.viewer.structure().unwrap().base_pair_count(), 17);
    assert_eq!(rig.backend.live_meshes(), 2);
    assert_eq!(rig.backend.live_materials(), 2 + 17);

    rig.frames(3);
    rig.key(Key::Character('c'));
    assert_eq!(rig.viewer.complexity(), Some(Complexity::High));
    assert_eq!(rig.backend.live_materials(), 2 + 34);
}

#[test]
fn test_rebuild_keeps_explode_clears_selection() {
    let mut rig = Rig::new(HelixConfig::new());
    let (_, position) = rig.base_pair_on_screen();
    rig.click(position);
    assert!(rig.viewer.selected_base_pair().is_some());
    rig.key(Key::Character('e'));

    rig.key(Key::Character('c'));
    assert!(rig.viewer.is_exploded());
    assert_eq!(rig.viewer.selected_base_pair(), None);
}

#[test]
fn test_frames_render_every_atom() {
    let mut rig = Rig::new(HelixConfig::new().with_complexity(Complexity::Low));
    rig.frames(2);
    let atoms = rig.viewer.structure().unwrap().atoms().len();
    let frame = rig.backend.last_frame().unwrap();
    assert_eq!(frame.draws.len(), atoms);
    assert_eq!(frame.clear.1, 0.0);
}

#[test]
fn test_unmount_resets_cursor() {
    let mut rig = Rig::new(HelixConfig::new());
    let over = rig.strand_atom_on_screen();
    rig.send(HostEvent::PointerMove { position: over });
    assert_eq!(rig.host.cursor(), CursorStyle::Pointer);

    rig.viewer.unmount(&mut rig.host, &mut rig.backend);
    assert_eq!(rig.host.cursor(), CursorStyle::Default);
}
