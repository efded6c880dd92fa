/// Buffer trait and buffer descriptor

use crate::error::Result;

/// Buffer usage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    /// Uniform buffer (camera data, bound with a dynamic offset)
    Uniform,
    /// Storage buffer (per-object data)
    Storage,
    /// Indirect draw command buffer
    Indirect,
    /// Vertex buffer
    Vertex,
    /// Index buffer
    Index,
}

/// Where the buffer memory lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryLocation {
    /// Host-visible, persistently mapped; written with [`Buffer::update`]
    CpuToGpu,
    /// Device-local; written with `GraphicsDevice::upload_buffer`
    GpuOnly,
}

/// Descriptor for creating a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferDesc {
    /// Size in bytes
    pub size: u64,
    pub usage: BufferUsage,
    pub location: MemoryLocation,
}

/// Buffer resource trait
///
/// Implemented by backend-specific buffer types (e.g., VulkanBuffer).
/// The buffer is automatically destroyed when dropped.
pub trait Buffer: Send + Sync {
    /// Write into a host-visible buffer
    ///
    /// # Arguments
    ///
    /// * `offset` - Offset into the buffer in bytes
    /// * `data` - Data to write
    fn update(&self, offset: u64, data: &[u8]) -> Result<()>;

    /// Size in bytes
    fn size(&self) -> u64;
}
