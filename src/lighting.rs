//! Light rig: shadow-casting directional lights, ambient and hemisphere
//! fill, and exponential-squared fog.
//!
//! `LightingConfig` is the authored description; `to_uniforms` flattens it
//! into the block the lit and shadow shaders read, including each light's
//! shadow-camera view-projection.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::gradient::Color;

/// Shadow map layers, and the most directional lights the shader evaluates.
pub const MAX_DIRECTIONAL_LIGHTS: usize = 2;

// ============================================================================
// Lighting Configuration
// ============================================================================

/// Orthographic box the shadow map is rendered through.
#[derive(Clone, Debug)]
pub struct ShadowCamera {
    pub near: f32,
    pub far: f32,
    /// Half-size of the square shadow frustum.
    pub half_extent: f32,
}

impl Default for ShadowCamera {
    fn default() -> Self {
        Self {
            near: 0.5,
            far: 500.0,
            half_extent: 5.0,
        }
    }
}

/// Parallel light shining from `position` towards `target`.
#[derive(Clone, Debug)]
pub struct DirectionalLight {
    pub color: Color,
    pub intensity: f32,
    pub position: Vec3,
    pub target: Vec3,
    pub cast_shadow: bool,
    pub shadow: ShadowCamera,
}

impl DirectionalLight {
    pub fn new(color: Color, intensity: f32) -> Self {
        Self {
            color,
            intensity,
            position: Vec3::Y,
            target: Vec3::ZERO,
            cast_shadow: false,
            shadow: ShadowCamera::default(),
        }
    }

    /// Unit vector pointing from the lit surface towards the light.
    pub fn direction(&self) -> Vec3 {
        let dir = (self.position - self.target).normalize_or_zero();
        if dir == Vec3::ZERO {
            Vec3::Y
        } else {
            dir
        }
    }

    /// View-projection of the shadow camera.
    pub fn shadow_view_projection(&self) -> Mat4 {
        let dir = self.direction();
        // look_at_rh degenerates when looking straight along the up vector.
        let up = if dir.abs_diff_eq(Vec3::Y, 1e-4) || dir.abs_diff_eq(-Vec3::Y, 1e-4) {
            Vec3::Z
        } else {
            Vec3::Y
        };
        let view = Mat4::look_at_rh(self.position, self.target, up);
        let e = self.shadow.half_extent;
        let proj = Mat4::orthographic_rh(-e, e, -e, e, self.shadow.near, self.shadow.far);
        proj * view
    }
}

#[derive(Clone, Debug)]
pub struct AmbientLight {
    pub color: Color,
    pub intensity: f32,
}

/// Sky/ground blend by surface normal.
#[derive(Clone, Debug)]
pub struct HemisphereLight {
    pub sky: Color,
    pub ground: Color,
    pub intensity: f32,
}

/// `1 - exp(-(density * depth)^2)` fog.
#[derive(Clone, Debug)]
pub struct FogExp2 {
    pub color: Color,
    pub density: f32,
}

#[derive(Clone, Debug)]
pub struct LightingConfig {
    pub directional: Vec<DirectionalLight>,
    pub ambient: Option<AmbientLight>,
    pub hemisphere: Option<HemisphereLight>,
    pub fog: Option<FogExp2>,
    /// Soft (PCF) shadow filtering.
    pub soft_shadows: bool,
    /// Depth bias applied when comparing against the shadow map.
    pub shadow_bias: f32,
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            directional: Vec::new(),
            ambient: None,
            hemisphere: None,
            fog: None,
            soft_shadows: true,
            shadow_bias: 0.002,
        }
    }
}

impl LightingConfig {
    /// Lights that render into the shadow map, in layer order.
    pub fn shadow_casters(&self) -> impl Iterator<Item = &DirectionalLight> {
        self.directional
            .iter()
            .take(MAX_DIRECTIONAL_LIGHTS)
            .filter(|l| l.cast_shadow)
    }

    /// Flatten into GPU uniforms. Lights past `MAX_DIRECTIONAL_LIGHTS` are dropped.
    pub fn to_uniforms(&self) -> LightingUniforms {
        if self.directional.len() > MAX_DIRECTIONAL_LIGHTS {
            log::warn!(
                "{} directional lights configured, only the first {} are rendered",
                self.directional.len(),
                MAX_DIRECTIONAL_LIGHTS
            );
        }

        let mut uniforms = LightingUniforms::default();
        let mut shadow_layer = 0;
        for (slot, light) in self
            .directional
            .iter()
            .take(MAX_DIRECTIONAL_LIGHTS)
            .enumerate()
        {
            let dir = light.direction();
            let layer = if light.cast_shadow {
                shadow_layer += 1;
                (shadow_layer - 1) as f32
            } else {
                -1.0
            };
            uniforms.lights[slot] = GpuDirectionalLight {
                view_proj: light.shadow_view_projection().to_cols_array_2d(),
                direction: [dir.x, dir.y, dir.z, 0.0],
                color: light.color.scaled(light.intensity).to_rgba(layer),
            };
        }
        uniforms.light_count = self.directional.len().min(MAX_DIRECTIONAL_LIGHTS) as u32;

        if let Some(ambient) = &self.ambient {
            uniforms.ambient = ambient.color.scaled(ambient.intensity).to_rgba(1.0);
        }
        if let Some(hemi) = &self.hemisphere {
            uniforms.hemisphere_sky = hemi.sky.scaled(hemi.intensity).to_rgba(1.0);
            uniforms.hemisphere_ground = hemi.ground.scaled(hemi.intensity).to_rgba(1.0);
        }
        if let Some(fog) = &self.fog {
            uniforms.fog = fog.color.to_rgba(fog.density);
        }
        uniforms.soft_shadows = u32::from(self.soft_shadows);
        uniforms.shadow_bias = self.shadow_bias;
        uniforms
    }
}

// ============================================================================
// GPU Uniforms
// ============================================================================

/// One directional light as the shader sees it. 96 bytes.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, Pod, Zeroable)]
pub struct GpuDirectionalLight {
    /// Shadow camera view-projection.
    pub view_proj: [[f32; 4]; 4],
    /// Towards the light (xyz), w unused.
    pub direction: [f32; 4],
    /// Colour premultiplied by intensity (rgb); w is the shadow layer, -1 when unshadowed.
    pub color: [f32; 4],
}

/// Lighting block for the lit and shadow shaders. 288 bytes, 16-byte aligned.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct LightingUniforms {
    pub lights: [GpuDirectionalLight; MAX_DIRECTIONAL_LIGHTS], // 192 bytes
    pub ambient: [f32; 4],                                     // 16 bytes
    pub hemisphere_sky: [f32; 4],                              // 16 bytes
    pub hemisphere_ground: [f32; 4],                           // 16 bytes
    /// Fog colour (rgb) and exp2 density (a). Density 0 disables fog.
    pub fog: [f32; 4], // 16 bytes
    pub light_count: u32,
    pub soft_shadows: u32,
    pub shadow_bias: f32,
    pub _padding: u32, // 16 bytes
    pub _padding2: [f32; 4], // 16 bytes
}

impl Default for LightingUniforms {
    fn default() -> Self {
        Self {
            lights: [GpuDirectionalLight::default(); MAX_DIRECTIONAL_LIGHTS],
            ambient: [0.0; 4],
            hemisphere_sky: [0.0; 4],
            hemisphere_ground: [0.0; 4],
            fog: [0.0; 4],
            light_count: 0,
            soft_shadows: 1,
            shadow_bias: 0.002,
            _padding: 0,
            _padding2: [0.0; 4],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shadowed(position: Vec3) -> DirectionalLight {
        let mut light = DirectionalLight::new(Color::WHITE, 0.5);
        light.position = position;
        light.cast_shadow = true;
        light
    }

    #[test]
    fn test_uniforms_size() {
        assert_eq!(std::mem::size_of::<GpuDirectionalLight>(), 96);
        assert_eq!(std::mem::size_of::<LightingUniforms>(), 288);
        assert_eq!(std::mem::size_of::<LightingUniforms>() % 16, 0);
    }

    #[test]
    fn test_direction_points_at_light() {
        let light = shadowed(Vec3::new(-2.0, 2.0, 2.0));
        let dir = light.direction();
        assert!((dir.length() - 1.0).abs() < 1e-6);
        assert!(dir.x < 0.0 && dir.y > 0.0 && dir.z > 0.0);
    }

    #[test]
    fn test_shadow_layers_assigned_in_order() {
        let mut config = LightingConfig::default();
        config.directional.push(shadowed(Vec3::new(-2.0, 2.0, 2.0)));
        let mut unshadowed = shadowed(Vec3::new(1.0, 2.0, 1.0));
        unshadowed.cast_shadow = false;
        config.directional.push(unshadowed);

        let uniforms = config.to_uniforms();
        assert_eq!(uniforms.light_count, 2);
        assert_eq!(uniforms.lights[0].color[3], 0.0);
        assert_eq!(uniforms.lights[1].color[3], -1.0);
        assert!((uniforms.lights[0].color[0] - 0.5).abs() < 1e-6);
        assert_eq!(config.shadow_casters().count(), 1);
    }

    #[test]
    fn test_shadow_camera_contains_origin() {
        let mut light = shadowed(Vec3::new(1.0, 2.0, 1.0));
        light.shadow.near = -4.0;
        light.shadow.far = 10.0;
        let p = light.shadow_view_projection().project_point3(Vec3::ZERO);
        assert!(p.x.abs() < 1e-5 && p.y.abs() < 1e-5);
        assert!((0.0..=1.0).contains(&p.z));
    }

    #[test]
    fn test_fog_packs_density() {
        let config = LightingConfig {
            fog: Some(FogExp2 {
                color: Color::new(1.0, 0.5, 0.0),
                density: 0.35,
            }),
            ..Default::default()
        };
        let uniforms = config.to_uniforms();
        assert_eq!(uniforms.fog, [1.0, 0.5, 0.0, 0.35]);
    }
}
