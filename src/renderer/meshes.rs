//! NOTES:
//! Meshes vertex winding order is CCW.
//! Builtin meshes are centered on the local origin.
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use glam::{Vec2, Vec3};

/// A single mesh vertex as laid out in the GPU vertex buffer.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub tangent_bitangent_sign: [f32; 4],
    /// Defaults to white so meshes without vertex colors are not black.
    pub color: [f32; 3],
}

impl Vertex {
    pub fn new(position: Vec3, normal: Vec3, uv: Vec2) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
            uv: uv.to_array(),
            tangent_bitangent_sign: [0.0; 4],
            color: [1.0; 3],
        }
    }

    pub fn position(&self) -> Vec3 {
        Vec3::from(self.position)
    }

    /// Vertex buffer format for `Vertex`.
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
            0 => Float32x3,
            1 => Float32x3,
            2 => Float32x2,
            3 => Float32x4,
            4 => Float32x3
        ];

        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRIBUTES,
        }
    }
}

/// Agrees with `PartialEq`: `-0.0` and `0.0` hash the same.
impl Hash for Vertex {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let floats: &[f32] = bytemuck::cast_slice(std::slice::from_ref(self));
        for f in floats {
            let f = if *f == 0.0 { 0.0f32 } else { *f };
            f.to_bits().hash(state);
        }
    }
}

/// CPU side vertex and index data for a mesh, as produced by an asset loader.
#[derive(Clone, Debug, Default)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

/// Mesh properties the renderer needs to cull and group draws. The vertex and
/// index buffers themselves are owned by the GPU resource provider.
#[derive(Clone, Debug)]
pub struct Mesh {
    /// Distance from the local origin to the farthest vertex.
    radius: f32,
    /// A hash of the vertex and index data, used as a batching key.
    content_hash: u64,
    vertex_count: u32,
    index_count: u32,
}

impl Mesh {
    pub fn new(data: &MeshData) -> Self {
        Self {
            radius: bounding_radius(&data.vertices),
            content_hash: content_hash(data),
            vertex_count: data.vertices.len() as u32,
            index_count: data.indices.len() as u32,
        }
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn content_hash(&self) -> u64 {
        self.content_hash
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }
}

/// Distance from the local origin to the vertex farthest away from it. An empty
/// vertex list has a radius of zero.
pub fn bounding_radius(vertices: &[Vertex]) -> f32 {
    vertices
        .iter()
        .map(|v| v.position().length())
        .fold(0.0, f32::max)
}

/// Order independent hash of a mesh's vertex and index data.
///
/// Each vertex and each index is hashed on its own and the results are summed,
/// so reordering either list does not change the hash. Collisions only cause
/// unrelated meshes to share a batch key component; the material identity is
/// still part of the key.
pub fn content_hash(data: &MeshData) -> u64 {
    let vertex_sum = data
        .vertices
        .iter()
        .map(hash_one)
        .fold(0u64, u64::wrapping_add);

    let index_sum = data
        .indices
        .iter()
        .map(hash_one)
        .fold(0u64, u64::wrapping_add);

    let mut hasher = DefaultHasher::new();
    vertex_sum.hash(&mut hasher);
    index_sum.hash(&mut hasher);
    data.vertices.len().hash(&mut hasher);
    data.indices.len().hash(&mut hasher);
    hasher.finish()
}

fn hash_one<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// A list of meshes that can be constructed by the engine without needing to
/// load a model externally.
#[derive(Clone, Copy, Debug)]
pub enum BuiltinMesh {
    /// A cube ranging from [-0.5, 0.5] on every axis.
    Cube,
    /// A unit radius UV sphere. Used as the light volume proxy.
    Sphere { sectors: u32, stacks: u32 },
}

/// Generate the vertex and index data for a builtin mesh.
pub fn builtin_mesh(mesh_type: BuiltinMesh) -> MeshData {
    match mesh_type {
        BuiltinMesh::Cube => cube(),
        BuiltinMesh::Sphere { sectors, stacks } => uv_sphere(sectors.max(3), stacks.max(2)),
    }
}

fn cube() -> MeshData {
    const FACES: [(Vec3, Vec3, Vec3); 6] = [
        (Vec3::X, Vec3::NEG_Z, Vec3::Y),
        (Vec3::NEG_X, Vec3::Z, Vec3::Y),
        (Vec3::Y, Vec3::X, Vec3::NEG_Z),
        (Vec3::NEG_Y, Vec3::X, Vec3::Z),
        (Vec3::Z, Vec3::X, Vec3::Y),
        (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
    ];

    let mut data = MeshData::default();

    for (normal, u_axis, v_axis) in FACES {
        let base = data.vertices.len() as u32;

        for (u, v) in [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)] {
            let position = normal * 0.5 + u_axis * (u - 0.5) + v_axis * (v - 0.5);
            data.vertices
                .push(Vertex::new(position, normal, Vec2::new(u, 1.0 - v)));
        }

        data.indices
            .extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
    }

    data
}

fn uv_sphere(sectors: u32, stacks: u32) -> MeshData {
    let mut data = MeshData::default();

    for stack in 0..=stacks {
        let v = stack as f32 / stacks as f32;
        let phi = std::f32::consts::PI * v;

        for sector in 0..=sectors {
            let u = sector as f32 / sectors as f32;
            let theta = std::f32::consts::TAU * u;

            let normal = Vec3::new(phi.sin() * theta.cos(), phi.cos(), -phi.sin() * theta.sin());
            data.vertices.push(Vertex::new(normal, normal, Vec2::new(u, v)));
        }
    }

    let row = sectors + 1;
    for stack in 0..stacks {
        for sector in 0..sectors {
            let a = stack * row + sector;
            let b = a + row;

            if stack != 0 {
                data.indices.extend_from_slice(&[a, b, a + 1]);
            }
            if stack != stacks - 1 {
                data.indices.extend_from_slice(&[a + 1, b, b + 1]);
            }
        }
    }

    data
}
