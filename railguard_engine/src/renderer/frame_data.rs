/// Frame data - the resources of one in-flight frame slot

use std::sync::Arc;

use crate::error::Result;
use crate::graphics_device::{
    BindingGroup, Buffer, BufferDesc, BufferUsage, CommandList, DescriptorPool,
    DescriptorPoolDesc, Fence, GraphicsDevice, MemoryLocation, Semaphore,
};

pub(crate) struct FrameData {
    pub command_list: Box<dyn CommandList>,
    pub image_available: Arc<dyn Semaphore>,
    pub render_finished: Arc<dyn Semaphore>,
    /// Signaled when the frame's last submission completes
    pub fence: Box<dyn Fence>,
    /// Pool of the camera and object sets, reset when the object capacity grows
    pub descriptor_pool: Box<dyn DescriptorPool>,
    /// One padded `GpuCameraData` per window slot
    pub camera_buffer: Arc<dyn Buffer>,
    pub object_buffer: Option<Arc<dyn Buffer>>,
    pub camera_set: Option<Arc<dyn BindingGroup>>,
    pub object_set: Option<Arc<dyn BindingGroup>>,
    pub built_buffers_config_version: u64,
    /// A camera already submitted work during the current use of this slot
    pub has_submitted: bool,
}

impl FrameData {
    pub fn new(device: &dyn GraphicsDevice, window_capacity: u32, camera_stride: u64) -> Result<Self> {
        let camera_buffer = device.create_buffer(&BufferDesc {
            size: camera_stride * window_capacity as u64,
            usage: BufferUsage::Uniform,
            location: MemoryLocation::CpuToGpu,
        })?;

        let descriptor_pool = device.create_descriptor_pool(&DescriptorPoolDesc {
            max_sets: 2,
            uniform_buffers: window_capacity * 2,
            storage_buffers: window_capacity * 2,
            sampled_textures: 0,
            growable: false,
        })?;

        Ok(Self {
            command_list: device.create_command_list()?,
            image_available: device.create_semaphore()?,
            render_finished: device.create_semaphore()?,
            fence: device.create_fence(true)?,
            descriptor_pool,
            camera_buffer,
            object_buffer: None,
            camera_set: None,
            object_set: None,
            built_buffers_config_version: 0,
            has_submitted: false,
        })
    }
}
