//! Rings of cylinders streaming around a figure-eight.
//!
//! `rings * parts` instances: every ring is a cross-section of `parts`
//! cylinders spun around the curve's tangent, successive rings trail the head
//! by a quarter turn in total, and the tube they sweep breathes over the loop.

use std::time::Duration;

use glam::{Mat3, Quat, Vec3};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::camera::OrthoCamera;
use crate::easing::Easing;
use crate::gradient::{Color, GradientError, GradientLinear};
use crate::instanced::InstancedGeometry;
use crate::lemniscate::lemniscate_point;
use crate::lighting::{
    AmbientLight, DirectionalLight, FogExp2, HemisphereLight, LightingConfig, ShadowCamera,
};
use crate::loops::{Loop, LoopClock};
use crate::maf::{modulo, parabola, random_in_range, TAU};
use crate::palette::{Palette, FLORIANDELOOIJ_2};
use crate::scene::{BaseMesh, MaterialParams, SceneSetup};

/// Parameter step used to estimate the curve tangent.
const TANGENT_STEP: f32 = 0.001;

fn default_rings() -> usize {
    200
}

fn default_parts() -> usize {
    10
}

fn default_loop_duration() -> f64 {
    3.0
}

/// Tunables of the loop. Defaults reproduce the reference animation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoopConfig {
    /// Rings along the curve.
    #[serde(default = "default_rings")]
    pub rings: usize,

    /// Cylinders per ring.
    #[serde(default = "default_parts")]
    pub parts: usize,

    /// Loop length in seconds.
    #[serde(default = "default_loop_duration")]
    pub loop_duration: f64,

    /// Seed for the per-part phase offsets. None draws from OS entropy.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            rings: default_rings(),
            parts: default_parts(),
            loop_duration: default_loop_duration(),
            seed: None,
        }
    }
}

impl LoopConfig {
    pub fn instance_count(&self) -> usize {
        self.rings * self.parts
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.rings == 0 || self.parts == 0 {
            return Err("Rings and parts must be positive".to_string());
        }
        if !(self.loop_duration > 0.0) || !self.loop_duration.is_finite() {
            return Err("Loop duration must be a positive number of seconds".to_string());
        }
        if Duration::try_from_secs_f64(self.loop_duration).is_err() {
            return Err(format!(
                "Loop duration of {} seconds is too long",
                self.loop_duration
            ));
        }
        Ok(())
    }
}

pub struct LemniscateRings {
    config: LoopConfig,
    duration: Duration,
    setup: SceneSetup,
    instances: InstancedGeometry,
    /// Constant phase offset of each part along the curve.
    offsets: Vec<f32>,
    /// Gradient colour of each part, sampled once.
    part_colors: Vec<Color>,
    radius_easing: Easing,
    scale_easing: Easing,
}

impl LemniscateRings {
    pub fn new(config: LoopConfig) -> Result<Self, GradientError> {
        let palette = Palette::from_hex(&FLORIANDELOOIJ_2)?;

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let offsets = (0..config.parts)
            .map(|_| random_in_range(&mut rng, 0.0, 0.25 * TAU))
            .collect();

        Ok(Self::with_offsets(config, offsets, &palette))
    }

    /// Build with explicit phase offsets (one per part) instead of random ones.
    pub fn with_offsets(config: LoopConfig, offsets: Vec<f32>, palette: &Palette) -> Self {
        let mut offsets = offsets;
        offsets.resize(config.parts, 0.0);

        let part_colors = (0..config.parts)
            .map(|part| part_color(palette.gradient(), part, config.parts))
            .collect();

        let mut instances = InstancedGeometry::new(config.instance_count());
        instances.update(config.instance_count());

        log::debug!(
            "lemniscate rings: {} rings x {} parts, offsets {:?}",
            config.rings,
            config.parts,
            offsets
        );

        Self {
            setup: scene_setup(palette),
            duration: LoopClock::from_secs_f64(config.loop_duration).duration(),
            config,
            instances,
            offsets,
            part_colors,
            radius_easing: Easing::OutQuint,
            scale_easing: Easing::Linear,
        }
    }

    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    pub fn phase_offsets(&self) -> &[f32] {
        &self.offsets
    }

    /// Buffer index of a ring/part pair.
    pub fn instance_index(&self, ring: usize, part: usize) -> usize {
        ring * self.config.parts + part
    }

    /// Tube radius of `ring` at phase `t`: grows towards the tail and pulses over the loop.
    pub fn ring_radius(&self, t: f32, ring: usize) -> f32 {
        let progress = ring as f32 / self.config.rings as f32;
        0.05 + 0.15 * progress
            + 0.1
                * parabola(t, 1.0)
                * (0.5 + 0.5 * (2.0 * t * TAU).sin())
                * self.radius_easing.apply(progress)
    }

    /// Uniform scale of the cylinders in `ring`; zero at the head, bulging mid-way, fading at the tail.
    pub fn ring_scale(&self, ring: usize) -> f32 {
        let progress = ring as f32 / self.config.rings as f32;
        (0.05 * parabola(progress, 1.0)) * 2.0 * self.scale_easing.apply(1.0 - progress)
    }
}

impl Loop for LemniscateRings {
    fn name(&self) -> &str {
        "lemniscate-rings"
    }

    fn loop_duration(&self) -> Duration {
        self.duration
    }

    fn setup(&self) -> &SceneSetup {
        &self.setup
    }

    fn instances(&self) -> &InstancedGeometry {
        &self.instances
    }

    fn instances_mut(&mut self) -> &mut InstancedGeometry {
        &mut self.instances
    }

    fn update(&mut self, t: f32) {
        let rings = self.config.rings;
        let parts = self.config.parts;

        for ring in 0..rings {
            let a = t * TAU - 0.25 * ring as f32 * TAU / rings as f32;
            let radius = self.ring_radius(t, ring);
            let scale = self.ring_scale(ring);

            for part in 0..parts {
                let index = ring * parts + part;
                let a2 = a + self.offsets[part];
                let p = lemniscate_point(a2).extend(0.0);
                let ahead = lemniscate_point(a2 + TANGENT_STEP).extend(0.0);

                let axis = (p - ahead).normalize_or_zero();
                let spin = part as f32 * TAU / parts as f32 + t * TAU;
                let mut offset = Vec3::new(radius, 0.0, radius);
                if axis != Vec3::ZERO {
                    offset = Quat::from_axis_angle(axis, spin) * offset;
                }
                let position = p + offset;
                self.instances.positions.set(index, &position.to_array());

                let q = look_at_quat(p, ahead, Vec3::Y);
                self.instances.quaternions.set(index, &q.to_array());

                self.instances.scales.set(index, &[scale, scale, scale]);

                let c = self.part_colors[part];
                let color = &mut self.instances.colors.values[index * 4..index * 4 + 3];
                color.copy_from_slice(&c.to_array());
            }
        }

        self.instances.update(self.config.instance_count());
    }
}

/// Gradient colour for `part`, cycling once across the gradient per ring.
fn part_color(gradient: &GradientLinear, part: usize, parts: usize) -> Color {
    gradient.get_at(modulo(part as f32 / parts as f32, 1.0))
}

/// Orientation whose local +Z points from `target` back to `eye`, with `up` as the roll reference.
///
/// When `up` is parallel to the view direction the direction is nudged so the
/// basis stays well defined.
pub fn look_at_quat(eye: Vec3, target: Vec3, up: Vec3) -> Quat {
    let mut z = eye - target;
    if z.length_squared() == 0.0 {
        z.z = 1.0;
    }
    z = z.normalize();

    let mut x = up.cross(z);
    if x.length_squared() == 0.0 {
        if up.z.abs() == 1.0 {
            z.x += 0.0001;
        } else {
            z.z += 0.0001;
        }
        z = z.normalize();
        x = up.cross(z);
    }
    x = x.normalize();
    let y = z.cross(x);

    Quat::from_mat3(&Mat3::from_cols(x, y, z)).normalize()
}

/// Camera, lights, fog and material of the loop.
fn scene_setup(palette: &Palette) -> SceneSetup {
    let background = palette.get(0);

    let mut camera = OrthoCamera::new(0.5);
    camera.position = Vec3::new(1.0, 1.0, -1.0);
    camera.look_at(Vec3::ZERO);

    let mut key = DirectionalLight::new(Color::WHITE, 0.5);
    key.position = Vec3::new(-2.0, 2.0, 2.0);
    key.cast_shadow = true;
    key.shadow = ShadowCamera {
        near: -1.0,
        far: 10.0,
        ..ShadowCamera::default()
    };

    let mut fill = DirectionalLight::new(Color::WHITE, 0.5);
    fill.position = Vec3::new(1.0, 2.0, 1.0);
    fill.cast_shadow = true;
    fill.shadow = ShadowCamera {
        near: -4.0,
        far: 10.0,
        ..ShadowCamera::default()
    };

    let lighting = LightingConfig {
        directional: vec![key, fill],
        ambient: Some(AmbientLight {
            color: Color::from_rgb_u32(0x808080),
            intensity: 0.5,
        }),
        hemisphere: Some(HemisphereLight {
            sky: palette.get(2),
            ground: palette.get(1),
            intensity: 0.5,
        }),
        fog: Some(FogExp2 {
            color: background,
            density: 0.35,
        }),
        soft_shadows: true,
        ..LightingConfig::default()
    };

    SceneSetup {
        camera,
        lighting,
        clear_color: background,
        material: MaterialParams {
            color: Color::WHITE,
            metalness: 0.4,
            roughness: 0.5,
            cast_shadow: true,
            receive_shadow: true,
        },
        base_mesh: BaseMesh::cylinder_along_z(0.5, 0.5, 8),
        group_scale: 0.45,
        shadow_map_size: 512,
    }
}
