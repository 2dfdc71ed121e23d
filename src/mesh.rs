//! Mesh primitives and spatial transforms.
//!
//! Geometry is built on the CPU as [`MeshData`] and uploaded once as a
//! [`Mesh`]. Keeping the two apart means the primitive generators can be
//! tested without a GPU.
//!
//! # Vertex Layout
//!
//! [`Vertex3d`] occupies 32 bytes:
//!
//! | Attribute | Format    | Offset | Shader Location |
//! |-----------|-----------|--------|-----------------|
//! | position  | Float32x3 | 0      | 0               |
//! | normal    | Float32x3 | 12     | 1               |
//! | uv        | Float32x2 | 24     | 2               |

use crate::gpu::GpuContext;
use glam::{Mat4, Quat, Vec3};
use std::f32::consts::PI;

/// A vertex with position, normal and texture coordinates.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex3d {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex3d {
    /// Vertex buffer layout matching the table in the module docs.
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex3d>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &wgpu::vertex_attr_array![
            0 => Float32x3,
            1 => Float32x3,
            2 => Float32x2,
        ],
    };

    pub fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }
}

/// CPU-side indexed triangle list with counter-clockwise front faces.
#[derive(Clone, Debug, Default)]
pub struct MeshData {
    pub vertices: Vec<Vertex3d>,
    pub indices: Vec<u32>,
}

impl MeshData {
    /// A unit cube centred at the origin, one quad per face for flat normals.
    pub fn cube() -> Self {
        #[rustfmt::skip]
        let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
            // normal,           u axis,             v axis
            ([ 0.0,  0.0,  1.0], [ 1.0, 0.0,  0.0], [0.0, 1.0,  0.0]),
            ([ 0.0,  0.0, -1.0], [-1.0, 0.0,  0.0], [0.0, 1.0,  0.0]),
            ([ 0.0,  1.0,  0.0], [ 1.0, 0.0,  0.0], [0.0, 0.0, -1.0]),
            ([ 0.0, -1.0,  0.0], [ 1.0, 0.0,  0.0], [0.0, 0.0,  1.0]),
            ([ 1.0,  0.0,  0.0], [ 0.0, 0.0, -1.0], [0.0, 1.0,  0.0]),
            ([-1.0,  0.0,  0.0], [ 0.0, 0.0,  1.0], [0.0, 1.0,  0.0]),
        ];

        let mut data = Self::default();
        for (normal, u_axis, v_axis) in faces {
            let n = Vec3::from(normal);
            let u = Vec3::from(u_axis);
            let v = Vec3::from(v_axis);
            let base = data.vertices.len() as u32;
            for (su, sv) in [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)] {
                let p = n * 0.5 + u * (su - 0.5) + v * (sv - 0.5);
                data.vertices
                    .push(Vertex3d::new(p.to_array(), normal, [su, 1.0 - sv]));
            }
            data.indices
                .extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
        }
        data
    }

    /// A regular octahedron of the given circumradius with flat-shaded faces.
    pub fn octahedron(radius: f32) -> Self {
        let px = Vec3::X * radius;
        let nx = -px;
        let py = Vec3::Y * radius;
        let ny = -py;
        let pz = Vec3::Z * radius;
        let nz = -pz;

        let faces = [
            [pz, px, py],
            [px, nz, py],
            [nz, nx, py],
            [nx, pz, py],
            [px, pz, ny],
            [nz, px, ny],
            [nx, nz, ny],
            [pz, nx, ny],
        ];

        let mut data = Self::default();
        for [a, b, c] in faces {
            let normal = (b - a).cross(c - a).normalize().to_array();
            let base = data.vertices.len() as u32;
            data.vertices.push(Vertex3d::new(a.to_array(), normal, [0.0, 0.0]));
            data.vertices.push(Vertex3d::new(b.to_array(), normal, [1.0, 0.0]));
            data.vertices.push(Vertex3d::new(c.to_array(), normal, [0.5, 1.0]));
            data.indices.extend_from_slice(&[base, base + 1, base + 2]);
        }
        data
    }

    /// A geodesic sphere: each icosahedron face is split into `(detail + 1)²`
    /// triangles and projected onto the sphere.
    ///
    /// Normals are smooth and UVs use an equirectangular projection.
    pub fn icosphere(radius: f32, detail: u32) -> Self {
        let t = (1.0 + 5f32.sqrt()) / 2.0;
        #[rustfmt::skip]
        let corners = [
            Vec3::new(-1.0,  t, 0.0), Vec3::new( 1.0,  t, 0.0),
            Vec3::new(-1.0, -t, 0.0), Vec3::new( 1.0, -t, 0.0),
            Vec3::new(0.0, -1.0,  t), Vec3::new(0.0,  1.0,  t),
            Vec3::new(0.0, -1.0, -t), Vec3::new(0.0,  1.0, -t),
            Vec3::new( t, 0.0, -1.0), Vec3::new( t, 0.0,  1.0),
            Vec3::new(-t, 0.0, -1.0), Vec3::new(-t, 0.0,  1.0),
        ];
        #[rustfmt::skip]
        let faces: [[usize; 3]; 20] = [
            [0, 11, 5], [0, 5, 1], [0, 1, 7], [0, 7, 10], [0, 10, 11],
            [1, 5, 9], [5, 11, 4], [11, 10, 2], [10, 7, 6], [7, 1, 8],
            [3, 9, 4], [3, 4, 2], [3, 2, 6], [3, 6, 8], [3, 8, 9],
            [4, 9, 5], [2, 4, 11], [6, 2, 10], [8, 6, 7], [9, 8, 1],
        ];

        let n = detail + 1;
        let mut data = Self::default();
        for [ia, ib, ic] in faces {
            let (a, b, c) = (corners[ia], corners[ib], corners[ic]);
            let base = data.vertices.len() as u32;

            // Row i holds n + 1 - i points.
            for i in 0..=n {
                for j in 0..=(n - i) {
                    let p = a + (b - a) * (i as f32 / n as f32) + (c - a) * (j as f32 / n as f32);
                    let dir = p.normalize();
                    data.vertices.push(Vertex3d::new(
                        (dir * radius).to_array(),
                        dir.to_array(),
                        spherical_uv(dir),
                    ));
                }
            }

            let offsets: Vec<u32> = (0..=n)
                .scan(0u32, |acc, i| {
                    let start = *acc;
                    *acc += n + 1 - i;
                    Some(start)
                })
                .collect();

            for i in 0..n {
                for j in 0..(n - i) {
                    let v00 = base + offsets[i as usize] + j;
                    let v01 = v00 + 1;
                    let v10 = base + offsets[i as usize + 1] + j;
                    data.indices.extend_from_slice(&[v00, v10, v01]);
                    if j + 1 < n - i {
                        let v11 = v10 + 1;
                        data.indices.extend_from_slice(&[v01, v10, v11]);
                    }
                }
            }
        }
        data
    }
}

fn spherical_uv(dir: Vec3) -> [f32; 2] {
    let u = dir.z.atan2(dir.x) / (2.0 * PI) + 0.5;
    let v = dir.y.clamp(-1.0, 1.0).asin() / PI + 0.5;
    [u, v]
}

/// GPU-resident geometry.
#[derive(Debug)]
pub struct Mesh {
    pub(crate) vertex_buffer: wgpu::Buffer,
    pub(crate) index_buffer: wgpu::Buffer,
    pub(crate) index_count: u32,
}

impl Mesh {
    /// Upload geometry to vertex and index buffers.
    pub fn new(gpu: &GpuContext, data: &MeshData) -> Self {
        use wgpu::util::DeviceExt;

        let vertex_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Mesh Vertex Buffer"),
                contents: bytemuck::cast_slice(&data.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });

        let index_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Mesh Index Buffer"),
                contents: bytemuck::cast_slice(&data.indices),
                usage: wgpu::BufferUsages::INDEX,
            });

        Self {
            vertex_buffer,
            index_buffer,
            index_count: data.indices.len() as u32,
        }
    }
}

/// Position, rotation and scale, combined as Scale → Rotate → Translate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_valid(data: &MeshData) {
        assert_eq!(data.indices.len() % 3, 0);
        let count = data.vertices.len() as u32;
        assert!(data.indices.iter().all(|&i| i < count));
        for v in &data.vertices {
            let len = Vec3::from(v.normal).length();
            assert!((len - 1.0).abs() < 1e-4, "normal length {len}");
        }
    }

    #[test]
    fn cube_has_flat_faces() {
        let cube = MeshData::cube();
        assert_eq!(cube.vertices.len(), 24);
        assert_eq!(cube.indices.len(), 36);
        assert_valid(&cube);
        for v in &cube.vertices {
            let p = Vec3::from(v.position);
            assert!((p.abs().max_element() - 0.5).abs() < 1e-6);
        }
    }

    #[test]
    fn cube_faces_wind_outward() {
        let cube = MeshData::cube();
        for tri in cube.indices.chunks(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| Vec3::from(cube.vertices[i as usize].position));
            let face_normal = (b - a).cross(c - a);
            let stored = Vec3::from(cube.vertices[tri[0] as usize].normal);
            assert!(face_normal.dot(stored) > 0.0);
        }
    }

    #[test]
    fn octahedron_faces_point_outward() {
        let octa = MeshData::octahedron(1.0);
        assert_eq!(octa.vertices.len(), 24);
        assert_valid(&octa);
        for tri in octa.indices.chunks(3) {
            let centroid: Vec3 = tri
                .iter()
                .map(|&i| Vec3::from(octa.vertices[i as usize].position))
                .sum::<Vec3>()
                / 3.0;
            let normal = Vec3::from(octa.vertices[tri[0] as usize].normal);
            assert!(centroid.dot(normal) > 0.0);
        }
    }

    #[test]
    fn icosphere_lies_on_radius() {
        let sphere = MeshData::icosphere(0.6, 3);
        assert_valid(&sphere);
        // (detail + 1)^2 triangles per icosahedron face.
        assert_eq!(sphere.indices.len(), 20 * 16 * 3);
        for v in &sphere.vertices {
            assert!((Vec3::from(v.position).length() - 0.6).abs() < 1e-5);
        }
    }

    #[test]
    fn icosphere_detail_zero_is_icosahedron() {
        let sphere = MeshData::icosphere(1.0, 0);
        assert_eq!(sphere.indices.len(), 60);
    }

    #[test]
    fn transform_applies_scale_before_translation() {
        let t = Transform::new()
            .position(Vec3::new(1.0, 0.0, 0.0))
            .scale(Vec3::splat(2.0));
        let p = t.matrix().transform_point3(Vec3::new(1.0, 0.0, 0.0));
        assert!((p - Vec3::new(3.0, 0.0, 0.0)).length() < 1e-6);
    }
}
