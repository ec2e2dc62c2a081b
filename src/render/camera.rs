//! Orbit camera producing the view-projection transform for marker output
//!
//! The camera looks at a target from spherical coordinates (distance,
//! azimuth, elevation). Layouts live roughly inside the unit sphere, so the
//! defaults frame that region.

use std::f32::consts::{FRAC_PI_2, PI};

use glam::{Mat4, Vec3};

/// Default field of view in radians (45 degrees)
pub const DEFAULT_FOV: f32 = PI / 4.0;

/// Default near clip plane
pub const DEFAULT_NEAR: f32 = 0.01;

/// Default far clip plane
pub const DEFAULT_FAR: f32 = 100.0;

/// Default camera distance from target
pub const DEFAULT_DISTANCE: f32 = 4.0;

/// Minimum camera distance (zoom limit)
pub const MIN_DISTANCE: f32 = 0.1;

/// Maximum camera distance (zoom limit)
pub const MAX_DISTANCE: f32 = 50.0;

/// Elevation angle limit (prevent gimbal lock)
const ELEVATION_LIMIT: f32 = FRAC_PI_2 - 0.01;

/// Camera orbiting a target point
#[derive(Debug, Clone)]
pub struct OrbitCamera {
    /// Distance from target (spherical radius)
    pub distance: f32,
    /// Horizontal angle in radians (0 = looking along -Z from +Z)
    pub azimuth: f32,
    /// Vertical angle in radians (positive = above the target)
    pub elevation: f32,
    /// Point the camera looks at
    pub target: Vec3,
    /// Field of view in radians
    pub fov: f32,
    /// Aspect ratio (width / height)
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl OrbitCamera {
    /// Create a camera with the given aspect ratio
    pub fn new(aspect: f32) -> Self {
        Self {
            distance: DEFAULT_DISTANCE,
            azimuth: 0.0,
            elevation: 0.3,
            target: Vec3::ZERO,
            fov: DEFAULT_FOV,
            aspect,
            near: DEFAULT_NEAR,
            far: DEFAULT_FAR,
        }
    }

    /// Camera position in world space
    pub fn position(&self) -> Vec3 {
        let (sin_elev, cos_elev) = self.elevation.sin_cos();
        let (sin_azim, cos_azim) = self.azimuth.sin_cos();
        self.target
            + Vec3::new(
                cos_elev * sin_azim,
                sin_elev,
                cos_elev * cos_azim,
            ) * self.distance
    }

    /// World to camera space
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), self.target, Vec3::Y)
    }

    /// Camera to clip space
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov, self.aspect, self.near, self.far)
    }

    /// Combined world to clip transform
    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Orbit around the target, wrapping azimuth and clamping elevation
    pub fn orbit(&mut self, delta_azimuth: f32, delta_elevation: f32) {
        self.azimuth = (self.azimuth + delta_azimuth + PI).rem_euclid(2.0 * PI) - PI;
        self.elevation =
            (self.elevation + delta_elevation).clamp(-ELEVATION_LIMIT, ELEVATION_LIMIT);
    }

    /// Exponential zoom (positive = closer)
    pub fn zoom(&mut self, delta: f32) {
        let factor = 1.0 - delta * 0.1;
        self.distance = (self.distance * factor).clamp(MIN_DISTANCE, MAX_DISTANCE);
    }

    /// Pan the target in screen space, scaled by distance
    pub fn pan(&mut self, delta_x: f32, delta_y: f32) {
        let forward = (self.target - self.position()).normalize_or(Vec3::NEG_Z);
        let right = forward.cross(Vec3::Y).normalize_or(Vec3::X);
        let up = right.cross(forward);
        self.target += (right * delta_x + up * delta_y) * self.distance * 0.001;
    }

    /// Look at a specific point
    pub fn focus(&mut self, point: Vec3) {
        self.target = point;
    }
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::new(4.0 / 3.0)
    }
}
