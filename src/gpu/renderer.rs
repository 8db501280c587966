//! GPU renderer for an instanced loop.
//!
//! Draws the loop's base mesh once per instance, reading the four per-instance
//! attribute buffers uploaded from `InstancedGeometry`. Each frame renders one
//! depth-only pass per shadow-casting light into a layer of the shadow map,
//! then the lit pass into the target view.

use wgpu::util::DeviceExt;

use crate::camera::CameraUniforms;
use crate::gpu::mesh;
use crate::gpu::pipeline::{self, DEPTH_FORMAT};
use crate::instanced::{
    InstancedGeometry, COLOR_SIZE, POSITION_SIZE, QUATERNION_SIZE, SCALE_SIZE,
};
use crate::lighting::LightingUniforms;
use crate::scene::SceneSetup;
use bytemuck::{Pod, Zeroable};

/// Per-frame scene block. 256 bytes.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct SceneUniforms {
    view_proj: [[f32; 4]; 4],
    view: [[f32; 4]; 4],
    model: [[f32; 4]; 4],
    camera_position: [f32; 4],
    view_direction: [f32; 4],
    base_color: [f32; 4],
    /// metalness, roughness, receive_shadow, shadow_map_size
    material: [f32; 4],
}

impl SceneUniforms {
    fn new(setup: &SceneSetup) -> Self {
        let camera = CameraUniforms::default();
        Self {
            view_proj: camera.view_proj,
            view: camera.view,
            model: setup.group_matrix().to_cols_array_2d(),
            camera_position: camera.position,
            view_direction: camera.view_direction,
            base_color: setup.material.color.to_rgba(1.0),
            material: [
                setup.material.metalness,
                setup.material.roughness,
                if setup.material.receive_shadow { 1.0 } else { 0.0 },
                setup.shadow_map_size as f32,
            ],
        }
    }

    fn update_camera(&mut self, camera: &CameraUniforms) {
        self.view_proj = camera.view_proj;
        self.view = camera.view;
        self.camera_position = camera.position;
        self.view_direction = camera.view_direction;
    }
}

/// Uniforms of one shadow pass.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct ShadowPassUniforms {
    light_view_proj: [[f32; 4]; 4],
    model: [[f32; 4]; 4],
}

/// Shared geometry of the base mesh.
struct MeshGeometry {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    num_indices: u32,
}

/// One GPU vertex buffer per instance attribute, in shader slot order.
struct InstanceBuffers {
    positions: wgpu::Buffer,
    quaternions: wgpu::Buffer,
    scales: wgpu::Buffer,
    colors: wgpu::Buffer,
    capacity: usize,
}

impl InstanceBuffers {
    fn new(device: &wgpu::Device, capacity: usize) -> Self {
        // wgpu rejects zero-sized vertex buffers.
        let capacity = capacity.max(1);
        let create = |label: &str, item_size: usize| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size: (capacity * item_size * std::mem::size_of::<f32>()) as u64,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        };
        Self {
            positions: create("Instance Positions", POSITION_SIZE),
            quaternions: create("Instance Quaternions", QUATERNION_SIZE),
            scales: create("Instance Scales", SCALE_SIZE),
            colors: create("Instance Colors", COLOR_SIZE),
            capacity,
        }
    }

    fn in_slot_order(&self) -> [&wgpu::Buffer; 4] {
        [&self.positions, &self.quaternions, &self.scales, &self.colors]
    }
}

/// A shadow map layer: render target view plus the bind group of its pass uniforms.
struct ShadowLayer {
    view: wgpu::TextureView,
    bind_group: wgpu::BindGroup,
}

pub struct Renderer {
    device: wgpu::Device,
    queue: wgpu::Queue,
    size: wgpu::Extent3d,

    lit_pipeline: wgpu::RenderPipeline,
    shadow_pipeline: wgpu::RenderPipeline,

    scene_uniforms: SceneUniforms,
    scene_uniform_buffer: wgpu::Buffer,
    scene_bind_group: wgpu::BindGroup,

    shadow_layers: Vec<ShadowLayer>,
    #[allow(dead_code)]
    shadow_texture: wgpu::Texture,

    depth_texture: wgpu::Texture,
    depth_view: wgpu::TextureView,

    mesh: MeshGeometry,
    instances: InstanceBuffers,
    instance_count: u32,

    clear_color: wgpu::Color,
}

impl Renderer {
    pub fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        setup: &SceneSetup,
        instance_capacity: usize,
    ) -> Self {
        let size = wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        };

        // === Uniforms ===

        let scene_uniforms = SceneUniforms::new(setup);
        let scene_uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Scene Uniform Buffer"),
            contents: bytemuck::cast_slice(&[scene_uniforms]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let lighting_config = setup.effective_lighting();
        let lighting: LightingUniforms = lighting_config.to_uniforms();
        let lighting_uniform_buffer =
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Lighting Uniform Buffer"),
                contents: bytemuck::cast_slice(&[lighting]),
                usage: wgpu::BufferUsages::UNIFORM,
            });

        // === Shadow Map ===

        let shadow_casters: Vec<_> = lighting_config.shadow_casters().collect();
        let layer_count = shadow_casters.len().max(1) as u32;
        let map_size = setup.shadow_map_size.max(1);
        let shadow_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Shadow Map"),
            size: wgpu::Extent3d {
                width: map_size,
                height: map_size,
                depth_or_array_layers: layer_count,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let shadow_array_view = shadow_texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("Shadow Map Array View"),
            dimension: Some(wgpu::TextureViewDimension::D2Array),
            ..Default::default()
        });
        let shadow_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Shadow Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        });

        // === Lit Pipeline ===

        let scene_bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("scene_bind_group_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(
                            std::mem::size_of::<SceneUniforms>() as u64,
                        ),
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(
                            std::mem::size_of::<LightingUniforms>() as u64,
                        ),
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Depth,
                        view_dimension: wgpu::TextureViewDimension::D2Array,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                    count: None,
                },
            ],
        });

        let scene_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("scene_bind_group"),
            layout: &scene_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: scene_uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: lighting_uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&shadow_array_view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&shadow_sampler),
                },
            ],
        });

        let lit_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Instanced Pipeline Layout"),
            bind_group_layouts: &[&scene_bind_group_layout],
            push_constant_ranges: &[],
        });
        let lit_pipeline = pipeline::create_instanced_pipeline(&device, &lit_pipeline_layout, format);

        // === Shadow Pipeline ===

        let shadow_bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("shadow_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(
                        std::mem::size_of::<ShadowPassUniforms>() as u64,
                    ),
                },
                count: None,
            }],
        });
        let shadow_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Shadow Pipeline Layout"),
            bind_group_layouts: &[&shadow_bind_group_layout],
            push_constant_ranges: &[],
        });
        let shadow_pipeline = pipeline::create_shadow_pipeline(&device, &shadow_pipeline_layout);

        let model = setup.group_matrix();
        let shadow_layers = shadow_casters
            .iter()
            .enumerate()
            .map(|(layer, light)| {
                let uniforms = ShadowPassUniforms {
                    light_view_proj: light.shadow_view_projection().to_cols_array_2d(),
                    model: model.to_cols_array_2d(),
                };
                let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Shadow Pass Uniform Buffer"),
                    contents: bytemuck::cast_slice(&[uniforms]),
                    usage: wgpu::BufferUsages::UNIFORM,
                });
                let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("shadow_bind_group"),
                    layout: &shadow_bind_group_layout,
                    entries: &[wgpu::BindGroupEntry {
                        binding: 0,
                        resource: uniform_buffer.as_entire_binding(),
                    }],
                });
                let view = shadow_texture.create_view(&wgpu::TextureViewDescriptor {
                    label: Some("Shadow Map Layer View"),
                    dimension: Some(wgpu::TextureViewDimension::D2),
                    base_array_layer: layer as u32,
                    array_layer_count: Some(1),
                    ..Default::default()
                });
                ShadowLayer { view, bind_group }
            })
            .collect();

        // === Geometry Setup ===

        let (vertices, indices) = mesh::create_base_geometry(&setup.base_mesh);
        let mesh = MeshGeometry {
            vertex_buffer: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Base Mesh Vertex Buffer"),
                contents: bytemuck::cast_slice(&vertices),
                usage: wgpu::BufferUsages::VERTEX,
            }),
            index_buffer: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Base Mesh Index Buffer"),
                contents: bytemuck::cast_slice(&indices),
                usage: wgpu::BufferUsages::INDEX,
            }),
            num_indices: indices.len() as u32,
        };

        let instances = InstanceBuffers::new(&device, instance_capacity);
        let (depth_texture, depth_view) = create_depth_texture(&device, size);

        log::info!(
            "Renderer ready: {}x{}, {} instances, {} shadow layer(s) at {}px",
            size.width,
            size.height,
            instance_capacity,
            shadow_casters.len(),
            map_size
        );

        Self {
            device,
            queue,
            size,
            lit_pipeline,
            shadow_pipeline,
            scene_uniforms,
            scene_uniform_buffer,
            scene_bind_group,
            shadow_layers,
            shadow_texture,
            depth_texture,
            depth_view,
            mesh,
            instances,
            instance_count: 0,
            clear_color: setup.clear_color.to_wgpu(),
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn size(&self) -> wgpu::Extent3d {
        self.size
    }

    pub fn aspect(&self) -> f32 {
        self.size.width as f32 / self.size.height as f32
    }

    pub fn instance_count(&self) -> u32 {
        self.instance_count
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        if width == self.size.width && height == self.size.height {
            return;
        }
        self.size.width = width;
        self.size.height = height;
        let (depth_texture, depth_view) = create_depth_texture(&self.device, self.size);
        self.depth_texture = depth_texture;
        self.depth_view = depth_view;
        log::debug!(
            "Renderer resized to {}x{} (depth {:?})",
            width,
            height,
            self.depth_texture.size()
        );
    }

    /// Upload the pending ranges of each instance attribute and clear them.
    pub fn upload_instances(&mut self, geometry: &mut InstancedGeometry) {
        let count = geometry.count().min(self.instances.capacity);
        if geometry.count() > self.instances.capacity {
            log::warn!(
                "Too many instances ({} > {}), some will not be rendered",
                geometry.count(),
                self.instances.capacity
            );
        }

        let buffers = self.instances.in_slot_order();
        for (attr, buffer) in geometry.attributes_mut().into_iter().zip(buffers) {
            let Some(range) = attr.take_pending() else {
                continue;
            };
            let limit = count * attr.item_size();
            let range = range.start.min(limit)..range.end.min(limit);
            if range.is_empty() {
                continue;
            }
            let offset = (range.start * std::mem::size_of::<f32>()) as wgpu::BufferAddress;
            self.queue
                .write_buffer(buffer, offset, bytemuck::cast_slice(&attr.values[range]));
        }
        self.instance_count = count as u32;
    }

    pub fn render(&mut self, view: &wgpu::TextureView, camera: &CameraUniforms) {
        self.scene_uniforms.update_camera(camera);
        self.queue.write_buffer(
            &self.scene_uniform_buffer,
            0,
            bytemuck::cast_slice(&[self.scene_uniforms]),
        );

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });

        // === Shadow Passes ===
        for layer in &self.shadow_layers {
            let mut shadow_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Shadow Pass"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &layer.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            shadow_pass.set_pipeline(&self.shadow_pipeline);
            shadow_pass.set_bind_group(0, &layer.bind_group, &[]);
            self.draw_instances(&mut shadow_pass);
        }

        // === Lit Pass ===
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Discard,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            render_pass.set_pipeline(&self.lit_pipeline);
            render_pass.set_bind_group(0, &self.scene_bind_group, &[]);
            self.draw_instances(&mut render_pass);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
    }

    fn draw_instances(&self, pass: &mut wgpu::RenderPass<'_>) {
        if self.instance_count == 0 {
            return;
        }
        pass.set_vertex_buffer(0, self.mesh.vertex_buffer.slice(..));
        for (slot, buffer) in self.instances.in_slot_order().into_iter().enumerate() {
            pass.set_vertex_buffer(slot as u32 + 1, buffer.slice(..));
        }
        pass.set_index_buffer(self.mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
        pass.draw_indexed(0..self.mesh.num_indices, 0, 0..self.instance_count);
    }
}

fn create_depth_texture(device: &wgpu::Device, size: wgpu::Extent3d) -> (wgpu::Texture, wgpu::TextureView) {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Scene Depth Texture"),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_sizes() {
        assert_eq!(std::mem::size_of::<SceneUniforms>(), 256);
        assert_eq!(std::mem::size_of::<ShadowPassUniforms>(), 128);
    }
}
