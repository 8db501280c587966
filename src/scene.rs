//! One-time scene description a loop hands to the renderer.
//!
//! Everything here is static for the lifetime of a loop: camera placement,
//! light rig, clear colour, the instanced mesh's base geometry and material,
//! and the scale of the group the instances live in.

use glam::{Mat4, Quat, Vec3};

use crate::camera::OrthoCamera;
use crate::gradient::Color;
use crate::lighting::LightingConfig;

/// Surface response of the instanced mesh.
#[derive(Clone, Debug)]
pub struct MaterialParams {
    /// Base colour, multiplied with the per-instance colour.
    pub color: Color,
    pub metalness: f32,
    pub roughness: f32,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

impl Default for MaterialParams {
    fn default() -> Self {
        Self {
            color: Color::WHITE,
            metalness: 0.0,
            roughness: 1.0,
            cast_shadow: false,
            receive_shadow: false,
        }
    }
}

/// Base geometry every instance is drawn with.
#[derive(Clone, Debug)]
pub enum BaseMesh {
    /// Capped cylinder along local +Y, then transformed.
    Cylinder {
        radius_top: f32,
        radius_bottom: f32,
        height: f32,
        radial_segments: u32,
        transform: Mat4,
    },
}

impl BaseMesh {
    /// Cylinder of the given radius and height lying along Z.
    pub fn cylinder_along_z(radius: f32, height: f32, radial_segments: u32) -> Self {
        BaseMesh::Cylinder {
            radius_top: radius,
            radius_bottom: radius,
            height,
            radial_segments,
            transform: Mat4::from_quat(Quat::from_rotation_x(std::f32::consts::FRAC_PI_2)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct SceneSetup {
    pub camera: OrthoCamera,
    pub lighting: LightingConfig,
    pub clear_color: Color,
    pub material: MaterialParams,
    pub base_mesh: BaseMesh,
    /// Uniform scale of the group holding the instances.
    pub group_scale: f32,
    /// Square shadow map resolution.
    pub shadow_map_size: u32,
}

impl SceneSetup {
    /// Model matrix of the instance group.
    pub fn group_matrix(&self) -> Mat4 {
        Mat4::from_scale(Vec3::splat(self.group_scale))
    }

    /// Light rig as rendered. A material that does not cast shadows leaves
    /// every light without a shadow map.
    pub fn effective_lighting(&self) -> LightingConfig {
        let mut lighting = self.lighting.clone();
        if !self.material.cast_shadow {
            for light in &mut lighting.directional {
                light.cast_shadow = false;
            }
        }
        lighting
    }
}

impl Default for SceneSetup {
    fn default() -> Self {
        Self {
            camera: OrthoCamera::new(1.0),
            lighting: LightingConfig::default(),
            clear_color: Color::new(0.0, 0.0, 0.0),
            material: MaterialParams::default(),
            base_mesh: BaseMesh::cylinder_along_z(0.5, 0.5, 8),
            group_scale: 1.0,
            shadow_map_size: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lighting::DirectionalLight;

    fn shadowed_setup(cast_shadow: bool) -> SceneSetup {
        let mut light = DirectionalLight::new(Color::WHITE, 1.0);
        light.cast_shadow = true;
        let mut setup = SceneSetup::default();
        setup.lighting.directional = vec![light.clone(), light];
        setup.material.cast_shadow = cast_shadow;
        setup
    }

    #[test]
    fn test_non_casting_material_disables_shadow_maps() {
        let lighting = shadowed_setup(false).effective_lighting();
        assert_eq!(lighting.shadow_casters().count(), 0);
        let uniforms = lighting.to_uniforms();
        assert_eq!(uniforms.lights[0].color[3], -1.0);
        assert_eq!(uniforms.lights[1].color[3], -1.0);
    }

    #[test]
    fn test_casting_material_keeps_light_shadows() {
        let setup = shadowed_setup(true);
        let lighting = setup.effective_lighting();
        assert_eq!(lighting.shadow_casters().count(), 2);
        let uniforms = lighting.to_uniforms();
        assert_eq!(uniforms.lights[0].color[3], 0.0);
        assert_eq!(uniforms.lights[1].color[3], 1.0);
    }
}
