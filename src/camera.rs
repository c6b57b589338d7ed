//! Cameras and picking rays.
//!
//! - [`Projection`]: perspective frustum; `aspect` follows the mount box.
//! - [`OrbitCamera`]: spherical-angle camera with eased drag and clamped zoom.
//! - [`ScrollCamera`]: follows the page scroll offset directly.
//! - [`Ray`]: pointer ray for hit-testing rendered objects.

use glam::{Mat4, Vec2, Vec3};

use crate::host::{MountBox, Viewport};

/// Perspective projection parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    /// Vertical field of view in degrees.
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Projection {
    pub fn new(fov_y: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self { fov_y, aspect, near, far }
    }

    /// Projection matrix for a 0..1 depth range.
    pub fn matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y.to_radians(), self.aspect, self.near, self.far)
    }

    /// Match the aspect ratio to a mount box. Empty boxes are ignored.
    pub fn fit(&mut self, mount: MountBox) {
        if !mount.is_empty() {
            self.aspect = mount.aspect();
        }
    }
}

/// Orbit camera looking at a fixed point.
///
/// Dragging moves the *target* angles; [`update`](Self::update) eases the
/// current angles a fixed fraction of the way there each frame, which keeps
/// the motion smooth under jittery pointer input.
#[derive(Debug, Clone)]
pub struct OrbitCamera {
    /// Horizontal angle in radians.
    pub yaw: f32,
    /// Vertical angle in radians.
    pub pitch: f32,
    target_yaw: f32,
    target_pitch: f32,
    distance: f32,
    min_distance: f32,
    max_distance: f32,
    /// Fraction of the remaining angle covered per frame.
    easing: f32,
    /// Point the camera orbits around.
    pub look_at: Vec3,
}

/// Keep the pitch target off the poles so `look_at` never degenerates.
const PITCH_LIMIT: f32 = std::f32::consts::FRAC_PI_2 - 0.01;

impl OrbitCamera {
    pub fn new(distance: f32, min_distance: f32, max_distance: f32, easing: f32) -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.0,
            target_yaw: 0.0,
            target_pitch: 0.0,
            distance: distance.clamp(min_distance, max_distance),
            min_distance,
            max_distance,
            easing,
            look_at: Vec3::ZERO,
        }
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    pub fn distance_range(&self) -> (f32, f32) {
        (self.min_distance, self.max_distance)
    }

    pub fn target_angles(&self) -> (f32, f32) {
        (self.target_yaw, self.target_pitch)
    }

    /// Add a pointer drag, in pixels, to the target angles.
    pub fn drag(&mut self, delta: Vec2, sensitivity: f32) {
        self.target_yaw += delta.x * sensitivity;
        self.target_pitch =
            (self.target_pitch + delta.y * sensitivity).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    /// Move along the view axis. The result always lies within the clamp,
    /// whatever the sign or magnitude of the input.
    pub fn zoom(&mut self, wheel_delta: f32, factor: f32) {
        let next = self.distance + wheel_delta * factor;
        if next.is_finite() {
            self.distance = next.clamp(self.min_distance, self.max_distance);
        }
    }

    /// Ease the current angles toward the targets. Call once per frame.
    pub fn update(&mut self) {
        self.yaw += (self.target_yaw - self.yaw) * self.easing;
        self.pitch += (self.target_pitch - self.pitch) * self.easing;
    }

    /// Zero the target angles and restore `distance`.
    pub fn reset(&mut self, distance: f32) {
        self.target_yaw = 0.0;
        self.target_pitch = 0.0;
        self.distance = distance.clamp(self.min_distance, self.max_distance);
    }

    /// Calculate the camera's world position.
    pub fn position(&self) -> Vec3 {
        let x = self.yaw.cos() * self.pitch.cos() * self.distance;
        let y = self.pitch.sin() * self.distance;
        let z = self.yaw.sin() * self.pitch.cos() * self.distance;
        self.look_at + Vec3::new(x, y, z)
    }

    /// Calculate the view matrix for rendering.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), self.look_at, Vec3::Y)
    }
}

/// Camera whose x/y track the page scroll offset, looking straight down -Z.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollCamera {
    pub position: Vec3,
}

impl ScrollCamera {
    pub fn new(z: f32) -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, z),
        }
    }

    /// Map page scroll to camera x/y. Page y grows downward, world y upward.
    pub fn follow_scroll(&mut self, scroll: Vec2, viewport: Viewport) {
        self.position.x = (scroll.x - viewport.width / 2.0) * 0.5;
        self.position.y = -(scroll.y - viewport.height / 5.0) * 1.2;
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, Vec3::NEG_Z, Vec3::Y)
    }
}

/// Convert a pointer position inside the mount box to normalized device
/// coordinates (-1..1, y up).
pub fn pointer_ndc(position: Vec2, mount: MountBox) -> Vec2 {
    Vec2::new(
        (position.x / mount.width) * 2.0 - 1.0,
        1.0 - (position.y / mount.height) * 2.0,
    )
}

/// A half-line with a normalized direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    /// Ray through `ndc` for the given view-projection matrix.
    pub fn from_ndc(ndc: Vec2, view_proj: Mat4) -> Self {
        let inverse = view_proj.inverse();
        let near = inverse.project_point3(Vec3::new(ndc.x, ndc.y, 0.0));
        let far = inverse.project_point3(Vec3::new(ndc.x, ndc.y, 1.0));
        Self::new(near, far - near)
    }

    /// Transform into another space (e.g. an object's local frame).
    pub fn transformed(&self, matrix: Mat4) -> Self {
        let origin = matrix.transform_point3(self.origin);
        let direction = matrix.transform_vector3(self.direction);
        Self::new(origin, direction)
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Distance along the ray to the first hit on a sphere.
    pub fn intersect_sphere(&self, center: Vec3, radius: f32) -> Option<f32> {
        let oc = self.origin - center;
        let b = oc.dot(self.direction);
        let c = oc.length_squared() - radius * radius;
        let discriminant = b * b - c;
        if discriminant < 0.0 {
            return None;
        }
        let root = discriminant.sqrt();
        let near = -b - root;
        if near >= 0.0 {
            return Some(near);
        }
        let far = -b + root;
        (far >= 0.0).then_some(far)
    }

    /// Distance along the ray to its closest approach with a capsule
    /// (segment `a..b` swept by `radius`), if it passes within the radius.
    pub fn intersect_capsule(&self, a: Vec3, b: Vec3, radius: f32) -> Option<f32> {
        let u = self.direction;
        let v = b - a;
        let w = self.origin - a;
        let vv = v.length_squared();
        if vv < 1e-12 {
            return self.intersect_sphere(a, radius);
        }

        let uv = u.dot(v);
        let uw = u.dot(w);
        let vw = v.dot(w);
        let denom = vv - uv * uv;

        let (mut t, mut s) = if denom < 1e-9 {
            (0.0, vw / vv)
        } else {
            ((uv * vw - vv * uw) / denom, (vw - uv * uw) / denom)
        };

        if t < 0.0 {
            t = 0.0;
            s = vw / vv;
        }
        if !(0.0..=1.0).contains(&s) {
            s = s.clamp(0.0, 1.0);
            t = (a + v * s - self.origin).dot(u).max(0.0);
        }
        let s = s.clamp(0.0, 1.0);

        let on_ray = self.at(t);
        let on_segment = a + v * s;
        (on_ray.distance(on_segment) <= radius).then_some(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_zoom_stays_clamped() {
        let mut camera = OrbitCamera::new(150.0, 60.0, 200.0, 0.08);
        for delta in [1e6, -1e6, 37.0, -3.0, f32::INFINITY, f32::NAN, -250.0] {
            camera.zoom(delta, 0.2);
            let d = camera.distance();
            assert!((60.0..=200.0).contains(&d), "distance {} escaped clamp", d);
        }
    }

    #[test]
    fn test_easing_converges() {
        let mut camera = OrbitCamera::new(100.0, 10.0, 200.0, 0.08);
        camera.drag(Vec2::new(100.0, 50.0), 0.008);
        camera.update();
        assert_relative_eq!(camera.yaw, 0.8 * 0.08, epsilon = 1e-6);

        for _ in 0..300 {
            camera.update();
        }
        assert_relative_eq!(camera.yaw, 0.8, epsilon = 1e-4);
        assert_relative_eq!(camera.pitch, 0.4, epsilon = 1e-4);
    }

    #[test]
    fn test_pitch_target_clamped() {
        let mut camera = OrbitCamera::new(100.0, 10.0, 200.0, 0.08);
        camera.drag(Vec2::new(0.0, 10_000.0), 0.008);
        assert!(camera.target_angles().1 < std::f32::consts::FRAC_PI_2);
    }

    #[test]
    fn test_orbit_position_at_rest() {
        let camera = OrbitCamera::new(100.0, 10.0, 200.0, 0.08);
        let p = camera.position();
        assert_relative_eq!(p.x, 100.0, epsilon = 1e-4);
        assert_relative_eq!(p.y, 0.0, epsilon = 1e-4);
    }

    #[test]
    fn test_scroll_mapping() {
        let mut camera = ScrollCamera::new(1200.0);
        let viewport = Viewport {
            width: 1000.0,
            height: 500.0,
            device_pixel_ratio: 1.0,
        };
        camera.follow_scroll(Vec2::new(0.0, 600.0), viewport);
        assert_relative_eq!(camera.position.x, -250.0);
        assert_relative_eq!(camera.position.y, -(600.0 - 100.0) * 1.2);
        assert_eq!(camera.position.z, 1200.0);
    }

    #[test]
    fn test_ray_sphere() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::NEG_Z);
        assert_relative_eq!(ray.intersect_sphere(Vec3::ZERO, 1.0).unwrap(), 9.0, epsilon = 1e-5);
        assert!(ray.intersect_sphere(Vec3::new(3.0, 0.0, 0.0), 1.0).is_none());
        // Sphere behind the origin
        assert!(ray.intersect_sphere(Vec3::new(0.0, 0.0, 20.0), 1.0).is_none());
    }

    #[test]
    fn test_ray_capsule() {
        let ray = Ray::new(Vec3::new(0.5, 0.0, 10.0), Vec3::NEG_Z);
        let a = Vec3::new(-1.0, 0.0, 0.0);
        let b = Vec3::new(1.0, 0.0, 0.0);
        assert!(ray.intersect_capsule(a, b, 0.1).is_some());

        let miss = Ray::new(Vec3::new(0.5, 0.5, 10.0), Vec3::NEG_Z);
        assert!(miss.intersect_capsule(a, b, 0.1).is_none());

        let past_end = Ray::new(Vec3::new(1.5, 0.0, 10.0), Vec3::NEG_Z);
        assert!(past_end.intersect_capsule(a, b, 0.1).is_none());
    }

    #[test]
    fn test_center_ray_points_at_target() {
        let camera = OrbitCamera::new(50.0, 10.0, 200.0, 0.08);
        let projection = Projection::new(20.0, 1.5, 0.1, 1000.0);
        let view_proj = projection.matrix() * camera.view_matrix();
        let ray = Ray::from_ndc(Vec2::ZERO, view_proj);
        assert!(ray.intersect_sphere(Vec3::ZERO, 0.5).is_some());
    }

    #[test]
    fn test_pointer_ndc() {
        let ndc = pointer_ndc(Vec2::new(400.0, 300.0), MountBox::new(800.0, 600.0));
        assert_relative_eq!(ndc.x, 0.0);
        assert_relative_eq!(ndc.y, 0.0);
        let corner = pointer_ndc(Vec2::ZERO, MountBox::new(800.0, 600.0));
        assert_eq!(corner, Vec2::new(-1.0, 1.0));
    }
}
