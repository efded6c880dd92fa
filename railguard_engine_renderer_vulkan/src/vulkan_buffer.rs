/// Buffer - Vulkan implementation of the device Buffer trait

use railguard_engine::railguard::{
    Result,
    Error,
    device::{Buffer as DeviceBuffer, BufferUsage, MemoryLocation},
};
use railguard_engine::{engine_bail, engine_err, engine_error};
use ash::vk;
use gpu_allocator::vulkan::Allocation;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;

/// Vulkan buffer implementation
pub struct Buffer {
    /// Shared GPU context (device, allocator, queues)
    ctx: Arc<GpuContext>,
    /// Vulkan buffer
    pub(crate) buffer: vk::Buffer,
    /// GPU memory allocation
    pub(crate) allocation: Option<Allocation>,
    /// Buffer size
    pub(crate) size: u64,
}

pub(crate) fn buffer_usage_to_vk(usage: BufferUsage) -> vk::BufferUsageFlags {
    match usage {
        BufferUsage::Uniform => vk::BufferUsageFlags::UNIFORM_BUFFER,
        BufferUsage::Storage => vk::BufferUsageFlags::STORAGE_BUFFER,
        BufferUsage::Indirect => vk::BufferUsageFlags::INDIRECT_BUFFER,
        BufferUsage::Vertex => vk::BufferUsageFlags::VERTEX_BUFFER,
        BufferUsage::Index => vk::BufferUsageFlags::INDEX_BUFFER,
    }
}

pub(crate) fn memory_location_to_gpu_allocator(location: MemoryLocation) -> gpu_allocator::MemoryLocation {
    match location {
        MemoryLocation::CpuToGpu => gpu_allocator::MemoryLocation::CpuToGpu,
        MemoryLocation::GpuOnly => gpu_allocator::MemoryLocation::GpuOnly,
    }
}

impl Buffer {
    /// Create a buffer and bind freshly allocated memory to it
    pub(crate) fn create(
        ctx: Arc<GpuContext>,
        name: &str,
        size: u64,
        usage: vk::BufferUsageFlags,
        location: gpu_allocator::MemoryLocation,
    ) -> Result<Self> {
        if size == 0 {
            engine_bail!("railguard::vulkan", "Cannot create an empty {} buffer", name);
        }

        unsafe {
            let buffer_create_info = vk::BufferCreateInfo::default()
                .size(size)
                .usage(usage)
                .sharing_mode(vk::SharingMode::EXCLUSIVE);

            let buffer = ctx.device.create_buffer(&buffer_create_info, None)
                .map_err(|e| engine_err!("railguard::vulkan", "Failed to create buffer of size {} bytes: {:?}", size, e))?;

            let requirements = ctx.device.get_buffer_memory_requirements(buffer);
            let allocation = match ctx.allocate(name, requirements, location, true) {
                Ok(allocation) => allocation,
                Err(e) => {
                    ctx.device.destroy_buffer(buffer, None);
                    return Err(e);
                }
            };

            if let Err(e) = ctx.device.bind_buffer_memory(buffer, allocation.memory(), allocation.offset()) {
                ctx.free(allocation);
                ctx.device.destroy_buffer(buffer, None);
                engine_bail!("railguard::vulkan", "Failed to bind buffer memory: {:?}", e);
            }

            Ok(Self {
                ctx,
                buffer,
                allocation: Some(allocation),
                size,
            })
        }
    }
}

impl DeviceBuffer for Buffer {
    fn update(&self, offset: u64, data: &[u8]) -> Result<()> {
        if offset + data.len() as u64 > self.size {
            engine_bail!("railguard::vulkan",
                "Buffer update out of bounds: offset {} + {} bytes > size {}",
                offset, data.len(), self.size);
        }

        unsafe {
            if let Some(allocation) = &self.allocation {
                let mapped_ptr = allocation
                    .mapped_ptr()
                    .ok_or_else(|| Error::BackendError("Buffer is not CPU-accessible".to_string()))?
                    .as_ptr() as *mut u8;

                std::ptr::copy_nonoverlapping(
                    data.as_ptr(),
                    mapped_ptr.add(offset as usize),
                    data.len(),
                );

                Ok(())
            } else {
                engine_error!("railguard::vulkan", "Buffer update failed: no GPU allocation");
                Err(Error::BackendError("Buffer has no allocation".to_string()))
            }
        }
    }

    fn size(&self) -> u64 {
        self.size
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        unsafe {
            if let Some(allocation) = self.allocation.take() {
                self.ctx.free(allocation);
            }
            self.ctx.device.destroy_buffer(self.buffer, None);
        }
    }
}
