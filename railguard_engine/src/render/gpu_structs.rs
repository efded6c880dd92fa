/// Structures uploaded to GPU buffers, and the dynamic-offset padding rule

use bytemuck::{Pod, Zeroable};
use glam::Mat4;

/// Per-window camera data (set 0, dynamic uniform buffer)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct GpuCameraData {
    pub view: Mat4,
    pub projection: Mat4,
    pub view_projection: Mat4,
}

impl GpuCameraData {
    pub fn new(view: Mat4, projection: Mat4) -> Self {
        Self {
            view,
            projection,
            view_projection: projection * view,
        }
    }
}

/// Per-model data (set 1, storage buffer indexed by instance)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct GpuObjectData {
    pub model: Mat4,
}

/// Layout of one record of an indexed indirect draw buffer
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct DrawIndexedIndirectCommand {
    pub index_count: u32,
    pub instance_count: u32,
    pub first_index: u32,
    pub vertex_offset: i32,
    pub first_instance: u32,
}

impl DrawIndexedIndirectCommand {
    pub const STRIDE: u32 = std::mem::size_of::<Self>() as u32;
}

/// Round `size` up to the next multiple of `alignment`
///
/// `alignment` must be zero (no constraint) or a power of two, which is what
/// devices report for `minUniformBufferOffsetAlignment`.
pub fn pad(size: u64, alignment: u64) -> u64 {
    if alignment == 0 {
        return size;
    }
    (size + alignment - 1) & !(alignment - 1)
}

#[cfg(test)]
#[path = "gpu_structs_tests.rs"]
mod tests;
