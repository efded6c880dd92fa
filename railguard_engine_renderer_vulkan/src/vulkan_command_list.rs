/// CommandList - Vulkan implementation of the device CommandList trait

use railguard_engine::railguard::device::{
    BindingGroup as DeviceBindingGroup, Buffer as DeviceBuffer, ClearValue,
    CommandList as DeviceCommandList, Framebuffer as DeviceFramebuffer, IndexType,
    Pipeline as DevicePipeline, PipelineLayout as DevicePipelineLayout,
    RenderPass as DeviceRenderPass,
};
use railguard_engine::railguard::{Error, Result};
use railguard_engine::engine_error;
use ash::vk;
use std::sync::Arc;

use crate::vulkan_binding_group::BindingGroup;
use crate::vulkan_buffer::Buffer;
use crate::vulkan_format::{clear_value_to_vk, index_type_to_vk};
use crate::vulkan_frame_buffer::Framebuffer;
use crate::vulkan_pipeline::{Pipeline, PipelineLayout};
use crate::vulkan_render_pass::RenderPass;

/// `(offset, draw_count)` of each `vkCmdDrawIndexedIndirect` issued for a batch
///
/// Without multi-draw support a call may read at most one record.
pub(crate) fn indirect_draw_calls(
    offset: u64,
    draw_count: u32,
    stride: u32,
    multi_draw: bool,
) -> Vec<(u64, u32)> {
    if draw_count == 0 {
        return Vec::new();
    }
    if multi_draw {
        return vec![(offset, draw_count)];
    }
    (0..draw_count)
        .map(|i| (offset + i as u64 * stride as u64, 1))
        .collect()
}

/// Vulkan command list implementation
///
/// Records rendering commands for later submission to the GPU.
pub struct CommandList {
    /// Vulkan device
    device: ash::Device,
    /// Command pool for allocating command buffers
    command_pool: vk::CommandPool,
    /// Command buffer for recording
    pub(crate) command_buffer: vk::CommandBuffer,
    multi_draw_indirect: bool,
    /// Whether the command list is currently recording
    is_recording: bool,
    /// Whether we're inside a render pass
    in_render_pass: bool,
}

impl CommandList {
    /// Create a new command list
    ///
    /// # Arguments
    ///
    /// * `device` - Vulkan logical device
    /// * `graphics_queue_family` - Graphics queue family index
    /// * `multi_draw_indirect` - Whether one indirect call may read several records
    pub(crate) fn new(
        device: ash::Device,
        graphics_queue_family: u32,
        multi_draw_indirect: bool,
    ) -> Result<Self> {
        unsafe {
            let command_pool_create_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(graphics_queue_family)
                .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

            let command_pool = device.create_command_pool(&command_pool_create_info, None)
                .map_err(|e| {
                    engine_error!("railguard::vulkan", "Failed to create command pool: {:?}", e);
                    Error::BackendError(format!("Failed to create command pool: {:?}", e))
                })?;

            let command_buffer_allocate_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(command_pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);

            let command_buffers = match device.allocate_command_buffers(&command_buffer_allocate_info) {
                Ok(buffers) => buffers,
                Err(e) => {
                    device.destroy_command_pool(command_pool, None);
                    engine_error!("railguard::vulkan", "Failed to allocate command buffer: {:?}", e);
                    return Err(Error::BackendError(format!("Failed to allocate command buffers: {:?}", e)));
                }
            };

            Ok(Self {
                device,
                command_pool,
                command_buffer: command_buffers[0],
                multi_draw_indirect,
                is_recording: false,
                in_render_pass: false,
            })
        }
    }

    fn check_recording(&self) -> Result<()> {
        if !self.is_recording {
            return Err(Error::BackendError("Command list not recording".to_string()));
        }
        Ok(())
    }

    fn check_in_render_pass(&self) -> Result<()> {
        self.check_recording()?;
        if !self.in_render_pass {
            return Err(Error::BackendError("Not inside a render pass".to_string()));
        }
        Ok(())
    }
}

impl DeviceCommandList for CommandList {
    fn begin(&mut self) -> Result<()> {
        if self.is_recording {
            return Err(Error::BackendError("Command list already recording".to_string()));
        }

        unsafe {
            self.device
                .reset_command_buffer(self.command_buffer, vk::CommandBufferResetFlags::empty())
                .map_err(|e| Error::BackendError(format!("Failed to reset command buffer: {:?}", e)))?;

            let begin_info = vk::CommandBufferBeginInfo::default()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

            self.device
                .begin_command_buffer(self.command_buffer, &begin_info)
                .map_err(|e| Error::BackendError(format!("Failed to begin command buffer: {:?}", e)))?;
        }

        self.is_recording = true;
        self.in_render_pass = false;
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        self.check_recording()?;

        if self.in_render_pass {
            return Err(Error::BackendError("Render pass not ended before ending command list".to_string()));
        }

        unsafe {
            self.device
                .end_command_buffer(self.command_buffer)
                .map_err(|e| Error::BackendError(format!("Failed to end command buffer: {:?}", e)))?;
        }

        self.is_recording = false;
        Ok(())
    }

    fn begin_render_pass(
        &mut self,
        render_pass: &Arc<dyn DeviceRenderPass>,
        framebuffer: &Arc<dyn DeviceFramebuffer>,
        clear_values: &[ClearValue],
    ) -> Result<()> {
        self.check_recording()?;

        if self.in_render_pass {
            return Err(Error::BackendError("Already inside a render pass".to_string()));
        }

        unsafe {
            let vk_render_pass = &*(render_pass.as_ref() as *const dyn DeviceRenderPass as *const RenderPass);
            let vk_framebuffer = &*(framebuffer.as_ref() as *const dyn DeviceFramebuffer as *const Framebuffer);

            let vk_clear_values: Vec<vk::ClearValue> = clear_values.iter().map(clear_value_to_vk).collect();
            let extent = framebuffer.extent();

            let render_pass_info = vk::RenderPassBeginInfo::default()
                .render_pass(vk_render_pass.render_pass)
                .framebuffer(vk_framebuffer.framebuffer)
                .render_area(vk::Rect2D {
                    offset: vk::Offset2D { x: 0, y: 0 },
                    extent: vk::Extent2D {
                        width: extent.width,
                        height: extent.height,
                    },
                })
                .clear_values(&vk_clear_values);

            self.device.cmd_begin_render_pass(
                self.command_buffer,
                &render_pass_info,
                vk::SubpassContents::INLINE,
            );
        }

        self.in_render_pass = true;
        Ok(())
    }

    fn end_render_pass(&mut self) -> Result<()> {
        self.check_in_render_pass()?;

        unsafe {
            self.device.cmd_end_render_pass(self.command_buffer);
        }
        self.in_render_pass = false;
        Ok(())
    }

    fn bind_pipeline(&mut self, pipeline: &Arc<dyn DevicePipeline>) -> Result<()> {
        self.check_recording()?;

        unsafe {
            let vk_pipeline = &*(pipeline.as_ref() as *const dyn DevicePipeline as *const Pipeline);

            self.device.cmd_bind_pipeline(
                self.command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                vk_pipeline.pipeline,
            );
        }
        Ok(())
    }

    fn bind_binding_group(
        &mut self,
        layout: &Arc<dyn DevicePipelineLayout>,
        set_index: u32,
        binding_group: &Arc<dyn DeviceBindingGroup>,
        dynamic_offsets: &[u32],
    ) -> Result<()> {
        self.check_recording()?;

        if binding_group.set_index() != set_index {
            return Err(Error::BackendError(format!(
                "Binding group for set {} bound at set {}",
                binding_group.set_index(),
                set_index
            )));
        }

        unsafe {
            let vk_layout = &*(layout.as_ref() as *const dyn DevicePipelineLayout as *const PipelineLayout);
            let vk_group = &*(binding_group.as_ref() as *const dyn DeviceBindingGroup as *const BindingGroup);

            self.device.cmd_bind_descriptor_sets(
                self.command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                vk_layout.layout,
                set_index,
                &[vk_group.descriptor_set],
                dynamic_offsets,
            );
        }
        Ok(())
    }

    fn bind_vertex_buffer(&mut self, buffer: &Arc<dyn DeviceBuffer>, offset: u64) -> Result<()> {
        self.check_recording()?;

        unsafe {
            let vk_buffer = &*(buffer.as_ref() as *const dyn DeviceBuffer as *const Buffer);

            self.device.cmd_bind_vertex_buffers(
                self.command_buffer,
                0,
                &[vk_buffer.buffer],
                &[offset],
            );
        }
        Ok(())
    }

    fn bind_index_buffer(&mut self, buffer: &Arc<dyn DeviceBuffer>, offset: u64, index_type: IndexType) -> Result<()> {
        self.check_recording()?;

        unsafe {
            let vk_buffer = &*(buffer.as_ref() as *const dyn DeviceBuffer as *const Buffer);

            self.device.cmd_bind_index_buffer(
                self.command_buffer,
                vk_buffer.buffer,
                offset,
                index_type_to_vk(index_type),
            );
        }
        Ok(())
    }

    fn draw(&mut self, vertex_count: u32, first_vertex: u32) -> Result<()> {
        self.check_in_render_pass()?;

        unsafe {
            self.device.cmd_draw(self.command_buffer, vertex_count, 1, first_vertex, 0);
        }
        Ok(())
    }

    fn draw_indexed_indirect(
        &mut self,
        buffer: &Arc<dyn DeviceBuffer>,
        offset: u64,
        draw_count: u32,
        stride: u32,
    ) -> Result<()> {
        self.check_in_render_pass()?;

        unsafe {
            let vk_buffer = &*(buffer.as_ref() as *const dyn DeviceBuffer as *const Buffer);

            for (call_offset, call_count) in indirect_draw_calls(offset, draw_count, stride, self.multi_draw_indirect) {
                self.device.cmd_draw_indexed_indirect(
                    self.command_buffer,
                    vk_buffer.buffer,
                    call_offset,
                    call_count,
                    stride,
                );
            }
        }
        Ok(())
    }
}

impl Drop for CommandList {
    fn drop(&mut self) {
        unsafe {
            // Destroying the pool frees its command buffer
            self.device.destroy_command_pool(self.command_pool, None);
        }
    }
}
