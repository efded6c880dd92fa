/// Framebuffer - Vulkan implementation of the device Framebuffer trait
///
/// Wraps a VkFramebuffer that groups color and depth attachments.
/// Created once per swapchain image, reused each frame.

use railguard_engine::railguard::device::{
    Framebuffer as DeviceFramebuffer, FramebufferDesc, RenderPass as DeviceRenderPass,
    Texture as DeviceTexture,
};
use railguard_engine::railguard::window::Extent2D;
use railguard_engine::railguard::Result;
use railguard_engine::engine_err;
use ash::vk;
use std::sync::Arc;

use crate::vulkan_render_pass::RenderPass;
use crate::vulkan_texture::Texture;

/// Vulkan framebuffer implementation
///
/// Keeps its attachments alive so their views outlive the VkFramebuffer.
pub struct Framebuffer {
    /// Vulkan framebuffer handle
    pub(crate) framebuffer: vk::Framebuffer,
    extent: Extent2D,
    _attachments: Vec<Arc<dyn DeviceTexture>>,
    /// Vulkan device (for cleanup)
    device: ash::Device,
}

impl Framebuffer {
    pub(crate) fn create(device: &ash::Device, desc: &FramebufferDesc) -> Result<Self> {
        unsafe {
            let vk_render_pass = desc.render_pass.as_ref()
                as *const dyn DeviceRenderPass
                as *const RenderPass;
            let vk_render_pass = &*vk_render_pass;

            let views: Vec<vk::ImageView> = desc
                .attachments
                .iter()
                .map(|texture| {
                    let vk_texture = texture.as_ref() as *const dyn DeviceTexture as *const Texture;
                    (*vk_texture).view
                })
                .collect();

            let framebuffer_info = vk::FramebufferCreateInfo::default()
                .render_pass(vk_render_pass.render_pass)
                .attachments(&views)
                .width(desc.extent.width)
                .height(desc.extent.height)
                .layers(1);

            let framebuffer = device.create_framebuffer(&framebuffer_info, None)
                .map_err(|e| engine_err!("railguard::vulkan",
                    "Failed to create {}x{} framebuffer: {:?}", desc.extent.width, desc.extent.height, e))?;

            Ok(Self {
                framebuffer,
                extent: desc.extent,
                _attachments: desc.attachments.clone(),
                device: device.clone(),
            })
        }
    }
}

impl DeviceFramebuffer for Framebuffer {
    fn extent(&self) -> Extent2D {
        self.extent
    }
}

impl Drop for Framebuffer {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_framebuffer(self.framebuffer, None);
        }
    }
}
