//! Orthographic camera and orbit controls.
//!
//! The loops frame their scene with an orthographic camera sized by its
//! vertical half-extent; the horizontal extent follows the viewport aspect.
//! `OrbitControls` rotates the eye around the target on drag and changes the
//! orthographic zoom on scroll, for the live player.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::maf::{clamp, PI, TAU};

// ============================================================================
// Camera
// ============================================================================

/// Orthographic camera looking from `position` at `target`.
#[derive(Clone, Debug)]
pub struct OrthoCamera {
    /// Vertical half-extent of the view volume at zoom 1.
    pub half_height: f32,
    /// Near clip plane. May be negative so geometry behind the eye still draws.
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Magnification; the view volume shrinks as zoom grows.
    pub zoom: f32,
}

impl OrthoCamera {
    /// Camera spanning `[-half_height, half_height]` vertically, with the
    /// wide near/far range the loops use.
    pub fn new(half_height: f32) -> Self {
        Self {
            half_height,
            near: -100.0,
            far: 100.0,
            position: Vec3::new(0.0, 0.0, 1.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            zoom: 1.0,
        }
    }

    pub fn look_at(&mut self, target: Vec3) {
        self.target = target;
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        let hh = self.half_height / self.zoom;
        let hw = hh * aspect;
        Mat4::orthographic_rh(-hw, hw, -hh, hh, self.near, self.far)
    }

    pub fn view_projection_matrix(&self, aspect: f32) -> Mat4 {
        self.projection_matrix(aspect) * self.view_matrix()
    }

    /// Unit vector from the target towards the eye.
    pub fn view_direction(&self) -> Vec3 {
        let dir = (self.position - self.target).normalize_or_zero();
        if dir == Vec3::ZERO {
            Vec3::Z
        } else {
            dir
        }
    }

    pub fn to_uniforms(&self, aspect: f32) -> CameraUniforms {
        let dir = self.view_direction();
        CameraUniforms {
            view_proj: self.view_projection_matrix(aspect).to_cols_array_2d(),
            view: self.view_matrix().to_cols_array_2d(),
            position: [self.position.x, self.position.y, self.position.z, 1.0],
            view_direction: [dir.x, dir.y, dir.z, 0.0],
        }
    }
}

// ============================================================================
// Camera Uniforms
// ============================================================================

/// Evaluated camera matrices, laid out for a uniform buffer.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct CameraUniforms {
    pub view_proj: [[f32; 4]; 4],
    /// View matrix, used for fog depth.
    pub view: [[f32; 4]; 4],
    pub position: [f32; 4],
    /// Towards the eye; constant across the frame for an orthographic view.
    pub view_direction: [f32; 4],
}

impl Default for CameraUniforms {
    fn default() -> Self {
        OrthoCamera::new(1.0).to_uniforms(1.0)
    }
}

// ============================================================================
// Orbit Controls
// ============================================================================

/// Keep the polar angle away from the poles so `up` never aligns with the view.
const POLAR_EPSILON: f32 = 1e-3;

/// Spherical orbit around the camera target.
#[derive(Clone, Debug)]
pub struct OrbitControls {
    pub target: Vec3,
    radius: f32,
    /// Angle around +Y, measured from +Z towards +X.
    azimuth: f32,
    /// Angle from +Y.
    polar: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub min_zoom: f32,
    pub max_zoom: f32,
}

impl OrbitControls {
    /// Derive the orbit from the camera's current eye and target.
    pub fn from_camera(camera: &OrthoCamera) -> Self {
        let offset = camera.position - camera.target;
        let radius = offset.length().max(f32::EPSILON);
        Self {
            target: camera.target,
            radius,
            azimuth: offset.x.atan2(offset.z),
            polar: clamp((offset.y / radius).acos(), POLAR_EPSILON, PI - POLAR_EPSILON),
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            min_zoom: 0.1,
            max_zoom: 20.0,
        }
    }

    /// Rotate by a pointer drag of `(dx, dy)` pixels in a viewport `height` pixels tall.
    ///
    /// A drag across the full height turns the camera once around.
    pub fn rotate(&mut self, dx: f32, dy: f32, height: f32) {
        if height <= 0.0 {
            return;
        }
        self.azimuth -= TAU * dx / height * self.rotate_speed;
        self.polar = clamp(
            self.polar - TAU * dy / height * self.rotate_speed,
            POLAR_EPSILON,
            PI - POLAR_EPSILON,
        );
    }

    /// Scroll zoom. Positive `steps` zoom in.
    pub fn zoom(&self, camera: &mut OrthoCamera, steps: f32) {
        let scale = 0.95f32.powf(self.zoom_speed * steps);
        camera.zoom = clamp(camera.zoom / scale, self.min_zoom, self.max_zoom);
    }

    /// Write the orbit back into the camera's eye position.
    pub fn apply(&self, camera: &mut OrthoCamera) {
        let sin_polar = self.polar.sin();
        let offset = Vec3::new(
            self.radius * sin_polar * self.azimuth.sin(),
            self.radius * self.polar.cos(),
            self.radius * sin_polar * self.azimuth.cos(),
        );
        camera.target = self.target;
        camera.position = self.target + offset;
    }
}
