/// Frame ring maintenance: fences, object capacity, frame descriptor sets,
/// shared mesh buffers and per-frame object data

use std::sync::Arc;

use crate::error::Result;
use crate::graphics_device::{
    BindingGroupLayout, BindingResource, Buffer, BufferDesc, BufferUsage, GraphicsDevice,
    MemoryLocation,
};
use crate::render::{GpuCameraData, GpuObjectData, Vertex};
use crate::renderer::renderer::{Renderer, LOG_SOURCE, WAIT_FOR_FENCES_TIMEOUT};

/// Reuse `current` when it holds at least `size` bytes, otherwise create a GPU-only buffer
fn reuse_or_create(
    device: &dyn GraphicsDevice,
    current: Option<Arc<dyn Buffer>>,
    size: u64,
    usage: BufferUsage,
) -> Result<Arc<dyn Buffer>> {
    match current {
        Some(buffer) if buffer.size() >= size => Ok(buffer),
        _ => device.create_buffer(&BufferDesc {
            size,
            usage,
            location: MemoryLocation::GpuOnly,
        }),
    }
}

impl Renderer {
    /// Block until no frame slot has work in flight
    pub(crate) fn wait_all_frames(&self) -> Result<()> {
        for frame in &self.frames {
            frame.fence.wait(WAIT_FOR_FENCES_TIMEOUT)?;
        }
        Ok(())
    }

    pub(crate) fn current_frame_index(&self) -> usize {
        (self.current_frame_number % self.frames.len() as u64) as usize
    }

    /// Grow the object capacity to hold every live model
    pub(crate) fn update_storage_buffers(&mut self) {
        let needed = self.models.len() as u64;
        if needed <= self.object_capacity {
            return;
        }
        while self.object_capacity < needed {
            self.object_capacity *= 2;
        }
        self.buffer_config_version += 1;
        crate::engine_debug!(LOG_SOURCE, "Object capacity grown to {}", self.object_capacity);
    }

    /// Recreate the frame's object buffer and rebuild its camera and object sets when stale
    pub(crate) fn update_frame_descriptor_sets(&mut self, frame_index: usize) -> Result<()> {
        let frame = &mut self.frames[frame_index];
        if frame.built_buffers_config_version >= self.buffer_config_version {
            return Ok(());
        }

        frame.descriptor_pool.reset()?;
        frame.camera_set = None;
        frame.object_set = None;

        let object_buffer = self.device.create_buffer(&BufferDesc {
            size: self.object_capacity * std::mem::size_of::<GpuObjectData>() as u64,
            usage: BufferUsage::Storage,
            location: MemoryLocation::CpuToGpu,
        })?;

        let camera_set = frame.descriptor_pool.allocate(
            &BindingGroupLayout::Camera,
            &[BindingResource::UniformBuffer {
                buffer: frame.camera_buffer.as_ref(),
                range: std::mem::size_of::<GpuCameraData>() as u64,
            }],
        )?;
        let object_set = frame.descriptor_pool.allocate(
            &BindingGroupLayout::Objects,
            &[BindingResource::StorageBuffer(object_buffer.as_ref())],
        )?;

        frame.object_buffer = Some(object_buffer);
        frame.camera_set = Some(camera_set);
        frame.object_set = Some(object_set);
        frame.built_buffers_config_version = self.buffer_config_version;

        crate::engine_trace!(LOG_SOURCE, "Descriptor sets rebuilt for frame slot {}", frame_index);
        Ok(())
    }

    /// Re-upload every live mesh part into the shared vertex and index buffers
    pub(crate) fn update_mesh_buffers(&mut self) -> Result<()> {
        if !self.should_update_mesh_buffers {
            return Ok(());
        }
        self.wait_all_frames()?;

        let vertex_size: u64 = self.mesh_parts.values().map(|p| p.part.vertices_size()).sum();
        let index_size: u64 = self.mesh_parts.values().map(|p| p.part.indices_size()).sum();
        let mut vertices = Vec::with_capacity(vertex_size as usize);
        let mut indices = Vec::with_capacity(index_size as usize);

        for stored in self.mesh_parts.values_mut() {
            stored.vertex_offset = (vertices.len() / std::mem::size_of::<Vertex>()) as u32;
            stored.index_offset = (indices.len() / std::mem::size_of::<u32>()) as u32;
            vertices.extend_from_slice(stored.part.vertex_bytes());
            indices.extend_from_slice(stored.part.index_bytes());
            stored.is_uploaded = true;
        }

        if !vertices.is_empty() {
            let buffer = reuse_or_create(
                self.device.as_ref(),
                self.vertex_buffer.take(),
                vertex_size,
                BufferUsage::Vertex,
            )?;
            self.device.upload_buffer(&buffer, 0, &vertices)?;
            self.vertex_buffer = Some(buffer);
        }
        if !indices.is_empty() {
            let buffer = reuse_or_create(
                self.device.as_ref(),
                self.index_buffer.take(),
                index_size,
                BufferUsage::Index,
            )?;
            self.device.upload_buffer(&buffer, 0, &indices)?;
            self.index_buffer = Some(buffer);
        }

        self.should_update_mesh_buffers = false;
        self.draw_cache_version += 1;

        crate::engine_debug!(
            LOG_SOURCE,
            "Mesh buffers uploaded: {} parts, {} vertex bytes, {} index bytes",
            self.mesh_parts.len(),
            vertex_size,
            index_size
        );
        Ok(())
    }

    /// Write every model's matrix into the frame's object buffer, in storage order
    pub(crate) fn write_object_data(&mut self, frame_index: usize) -> Result<()> {
        if self.models.is_empty() {
            return Ok(());
        }
        let objects: Vec<GpuObjectData> = self
            .models
            .values()
            .map(|model| GpuObjectData { model: model.transform.matrix() })
            .collect();

        let buffer = self.frames[frame_index]
            .object_buffer
            .as_ref()
            .ok_or_else(|| Self::consistency_error(format!("frame slot {} has no object buffer", frame_index)))?;
        buffer.update(0, bytemuck::cast_slice(&objects))
    }
}
