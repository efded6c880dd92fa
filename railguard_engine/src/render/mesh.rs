/// Mesh data consumed by the renderer (already decoded vertex and index arrays)

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};

/// Vertex layout read by material pipelines (locations 0, 1, 2)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub tex_coord: Vec2,
}

impl Vertex {
    pub const fn new(position: Vec3, normal: Vec3, tex_coord: Vec2) -> Self {
        Self { position, normal, tex_coord }
    }

    /// Byte offsets of (position, normal, tex_coord)
    pub const ATTRIBUTE_OFFSETS: [u32; 3] = [0, 12, 24];
}

/// Three indices into the vertex array of the same mesh part
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct Triangle {
    pub indices: [u32; 3],
}

impl Triangle {
    pub const fn new(a: u32, b: u32, c: u32) -> Self {
        Self { indices: [a, b, c] }
    }
}

/// Geometry of one drawable part
///
/// Indices are local to the part; the renderer rebases them with the part's
/// vertex offset inside the shared vertex buffer when drawing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeshPart {
    pub vertices: Vec<Vertex>,
    pub triangles: Vec<Triangle>,
}

impl MeshPart {
    pub fn new(vertices: Vec<Vertex>, triangles: Vec<Triangle>) -> Self {
        Self { vertices, triangles }
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertices.len() as u32
    }

    pub fn triangle_count(&self) -> u32 {
        self.triangles.len() as u32
    }

    pub fn index_count(&self) -> u32 {
        self.triangle_count() * 3
    }

    pub fn vertices_size(&self) -> u64 {
        (self.vertices.len() * std::mem::size_of::<Vertex>()) as u64
    }

    pub fn indices_size(&self) -> u64 {
        (self.triangles.len() * std::mem::size_of::<Triangle>()) as u64
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.triangles)
    }
}

#[cfg(test)]
#[path = "mesh_tests.rs"]
mod tests;
