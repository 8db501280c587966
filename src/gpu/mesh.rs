use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Mat4, Vec3};

use crate::scene::BaseMesh;

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl Vertex {
    const fn new(position: [f32; 3], normal: [f32; 3]) -> Self {
        Self { position, normal }
    }

    pub fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: 12, // [f32; 3] is 12 bytes
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

/// Build the vertex and index data for a loop's base mesh.
pub fn create_base_geometry(mesh: &BaseMesh) -> (Vec<Vertex>, Vec<u16>) {
    match mesh {
        BaseMesh::Cylinder {
            radius_top,
            radius_bottom,
            height,
            radial_segments,
            transform,
        } => {
            let (mut vertices, indices) =
                create_cylinder_geometry(*radius_top, *radius_bottom, *height, *radial_segments);
            transform_geometry(&mut vertices, *transform);
            (vertices, indices)
        }
    }
}

/// Capped cylinder centred at the origin along +Y, one height segment.
///
/// Side vertices are duplicated at the seam so the normals stay smooth around
/// the body while the caps get flat normals of their own.
pub fn create_cylinder_geometry(
    radius_top: f32,
    radius_bottom: f32,
    height: f32,
    radial_segments: u32,
) -> (Vec<Vertex>, Vec<u16>) {
    let segments = radial_segments.max(3);
    let half_height = height / 2.0;
    let slope = (radius_bottom - radius_top) / height.max(f32::EPSILON);

    let mut vertices = Vec::new();
    let mut indices: Vec<u16> = Vec::new();

    // Body: top row then bottom row, segments + 1 columns each.
    for (y, radius) in [(half_height, radius_top), (-half_height, radius_bottom)] {
        for s in 0..=segments {
            let theta = s as f32 / segments as f32 * std::f32::consts::TAU;
            let (sin, cos) = theta.sin_cos();
            let normal = Vec3::new(sin, slope, cos).normalize();
            vertices.push(Vertex::new(
                [radius * sin, y, radius * cos],
                normal.to_array(),
            ));
        }
    }
    let row = (segments + 1) as u16;
    for s in 0..segments as u16 {
        let a = s;
        let b = s + row;
        let c = s + row + 1;
        let d = s + 1;
        indices.extend_from_slice(&[a, b, d, b, c, d]);
    }

    // Caps: a centre vertex fanned to a ring.
    for (top, y, radius) in [(true, half_height, radius_top), (false, -half_height, radius_bottom)] {
        if radius <= 0.0 {
            continue;
        }
        let normal = if top { [0.0, 1.0, 0.0] } else { [0.0, -1.0, 0.0] };
        let center = vertices.len() as u16;
        vertices.push(Vertex::new([0.0, y, 0.0], normal));
        for s in 0..=segments {
            let theta = s as f32 / segments as f32 * std::f32::consts::TAU;
            let (sin, cos) = theta.sin_cos();
            vertices.push(Vertex::new([radius * sin, y, radius * cos], normal));
        }
        for s in 0..segments as u16 {
            let i = center + 1 + s;
            if top {
                indices.extend_from_slice(&[i, i + 1, center]);
            } else {
                indices.extend_from_slice(&[i + 1, i, center]);
            }
        }
    }

    (vertices, indices)
}

/// Bake a transform into positions and normals.
pub fn transform_geometry(vertices: &mut [Vertex], transform: Mat4) {
    let normal_matrix = Mat3::from_mat4(transform).inverse().transpose();
    for v in vertices.iter_mut() {
        let p = transform.transform_point3(Vec3::from(v.position));
        let n = (normal_matrix * Vec3::from(v.normal)).normalize_or_zero();
        v.position = p.to_array();
        v.normal = n.to_array();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cylinder_counts() {
        let (vertices, indices) = create_cylinder_geometry(0.5, 0.5, 0.5, 8);
        // Body 2 * 9, caps 2 * (1 + 9).
        assert_eq!(vertices.len(), 18 + 20);
        // Body 8 quads, caps 8 triangles each.
        assert_eq!(indices.len(), 8 * 6 + 2 * 8 * 3);
        assert!(indices.iter().all(|&i| (i as usize) < vertices.len()));
    }

    #[test]
    fn test_cylinder_extent_and_normals() {
        let (vertices, _) = create_cylinder_geometry(0.5, 0.5, 0.5, 8);
        for v in &vertices {
            let p = Vec3::from(v.position);
            assert!(p.y.abs() <= 0.25 + 1e-6);
            assert!(Vec3::new(p.x, 0.0, p.z).length() <= 0.5 + 1e-6);
            assert!((Vec3::from(v.normal).length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_outward_winding() {
        // Counter-clockwise front faces: the geometric normal agrees with the vertex normal.
        let (vertices, indices) = create_cylinder_geometry(0.5, 0.5, 0.5, 8);
        for tri in indices.chunks(3) {
            let a = Vec3::from(vertices[tri[0] as usize].position);
            let b = Vec3::from(vertices[tri[1] as usize].position);
            let c = Vec3::from(vertices[tri[2] as usize].position);
            let face = (b - a).cross(c - a);
            let n = Vec3::from(vertices[tri[0] as usize].normal);
            assert!(face.dot(n) > 0.0);
        }
    }

    #[test]
    fn test_rotated_cylinder_lies_along_z() {
        let (vertices, _) = create_base_geometry(&BaseMesh::cylinder_along_z(0.5, 0.5, 8));
        for v in &vertices {
            assert!(v.position[2].abs() <= 0.25 + 1e-5);
        }
        let caps = vertices.iter().filter(|v| v.normal[2].abs() > 0.999).count();
        assert_eq!(caps, 20);
    }
}
