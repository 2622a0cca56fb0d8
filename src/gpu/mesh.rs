use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    pub const fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self { position, normal, uv }
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
                    offset: 12,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: 24,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        }
    }
}

/// Append an axis-aligned box spanning `min..max` to a vertex/index list.
///
/// Six faces, four vertices each, outward normals, per-face 0..1 UVs.
pub fn push_box(
    vertices: &mut Vec<Vertex>,
    indices: &mut Vec<u16>,
    min: glam::Vec3,
    max: glam::Vec3,
) {
    // (normal, four corners in CCW order seen from outside)
    let faces: [([f32; 3], [[f32; 3]; 4]); 6] = [
        // +Z
        (
            [0.0, 0.0, 1.0],
            [
                [min.x, min.y, max.z],
                [max.x, min.y, max.z],
                [max.x, max.y, max.z],
                [min.x, max.y, max.z],
            ],
        ),
        // -Z
        (
            [0.0, 0.0, -1.0],
            [
                [max.x, min.y, min.z],
                [min.x, min.y, min.z],
                [min.x, max.y, min.z],
                [max.x, max.y, min.z],
            ],
        ),
        // +Y
        (
            [0.0, 1.0, 0.0],
            [
                [min.x, max.y, max.z],
                [max.x, max.y, max.z],
                [max.x, max.y, min.z],
                [min.x, max.y, min.z],
            ],
        ),
        // -Y
        (
            [0.0, -1.0, 0.0],
            [
                [min.x, min.y, min.z],
                [max.x, min.y, min.z],
                [max.x, min.y, max.z],
                [min.x, min.y, max.z],
            ],
        ),
        // +X
        (
            [1.0, 0.0, 0.0],
            [
                [max.x, min.y, max.z],
                [max.x, min.y, min.z],
                [max.x, max.y, min.z],
                [max.x, max.y, max.z],
            ],
        ),
        // -X
        (
            [-1.0, 0.0, 0.0],
            [
                [min.x, min.y, min.z],
                [min.x, min.y, max.z],
                [min.x, max.y, max.z],
                [min.x, max.y, min.z],
            ],
        ),
    ];

    const FACE_UVS: [[f32; 2]; 4] = [[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]];

    for (normal, corners) in faces {
        let base = vertices.len() as u16;
        for (corner, uv) in corners.iter().zip(FACE_UVS) {
            vertices.push(Vertex::new(*corner, normal, uv));
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
    }
}

/// Cube centered at the origin with the given edge length.
pub fn create_cube_geometry(size: f32) -> (Vec<Vertex>, Vec<u16>) {
    let half = size * 0.5;
    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    push_box(
        &mut vertices,
        &mut indices,
        glam::Vec3::splat(-half),
        glam::Vec3::splat(half),
    );
    (vertices, indices)
}

/// Quad in the XY plane facing +Z, centered at the origin.
pub fn create_quad_geometry(width: f32, height: f32) -> (Vec<Vertex>, Vec<u16>) {
    let (hw, hh) = (width * 0.5, height * 0.5);
    let normal = [0.0, 0.0, 1.0];
    let vertices = vec![
        Vertex::new([-hw, -hh, 0.0], normal, [0.0, 1.0]),
        Vertex::new([hw, -hh, 0.0], normal, [1.0, 1.0]),
        Vertex::new([hw, hh, 0.0], normal, [1.0, 0.0]),
        Vertex::new([-hw, hh, 0.0], normal, [0.0, 0.0]),
    ];
    let indices = vec![0, 1, 2, 2, 3, 0];
    (vertices, indices)
}

/// Vertex and index buffers uploaded to the GPU.
pub struct GpuMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub num_indices: u32,
}

impl GpuMesh {
    pub fn upload(
        device: &wgpu::Device,
        label: &str,
        vertices: &[Vertex],
        indices: &[u16],
    ) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Vertex Buffer", label)),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Index Buffer", label)),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertex_buffer,
            index_buffer,
            num_indices: indices.len() as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_has_24_vertices_36_indices() {
        let (vertices, indices) = create_cube_geometry(1.7);
        assert_eq!(vertices.len(), 24);
        assert_eq!(indices.len(), 36);
        for v in &vertices {
            for c in v.position {
                assert!((c.abs() - 0.85).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn indices_stay_in_range() {
        let (vertices, indices) = create_cube_geometry(2.0);
        for &i in &indices {
            assert!((i as usize) < vertices.len());
        }
    }

    #[test]
    fn quad_spans_requested_size() {
        let (vertices, indices) = create_quad_geometry(5.0, 1.0);
        assert_eq!(vertices.len(), 4);
        assert_eq!(indices.len(), 6);
        let max_x = vertices.iter().map(|v| v.position[0]).fold(f32::MIN, f32::max);
        assert_eq!(max_x, 2.5);
    }
}
