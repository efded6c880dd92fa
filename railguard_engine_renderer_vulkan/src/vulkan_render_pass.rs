/// RenderPass - Vulkan implementation of the device RenderPass trait
///
/// One subpass; every attachment is cleared on load and stored.

use railguard_engine::railguard::device::{RenderPass as DeviceRenderPass, RenderPassAttachment, RenderPassDesc};
use railguard_engine::railguard::render::ImageLayout;
use railguard_engine::railguard::Result;
use railguard_engine::{engine_bail, engine_err};
use ash::vk;

use crate::vulkan_format::{format_to_vk, image_layout_to_vk};

/// Vulkan render pass implementation
pub struct RenderPass {
    /// Vulkan render pass handle
    pub(crate) render_pass: vk::RenderPass,
    /// Vulkan device (for cleanup)
    pub(crate) device: ash::Device,
}

fn attachment_description(attachment: &RenderPassAttachment) -> Result<vk::AttachmentDescription> {
    let format = format_to_vk(attachment.format).ok_or_else(|| {
        engine_err!("railguard::vulkan", "Render pass attachment has unresolved format {:?}", attachment.format)
    })?;

    Ok(vk::AttachmentDescription::default()
        .format(format)
        .samples(vk::SampleCountFlags::TYPE_1)
        .load_op(vk::AttachmentLoadOp::CLEAR)
        .store_op(vk::AttachmentStoreOp::STORE)
        .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
        .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
        .initial_layout(image_layout_to_vk(attachment.initial_layout))
        .final_layout(image_layout_to_vk(attachment.final_layout)))
}

/// Incoming and outgoing subpass dependencies
///
/// Outputs left in SHADER_READ_ONLY_OPTIMAL are read by the fragment stage
/// of a later render pass.
pub(crate) fn subpass_dependencies(desc: &RenderPassDesc) -> Vec<vk::SubpassDependency> {
    let has_depth = desc.depth_attachment.is_some();
    let (stage_mask, access_mask) = if has_depth {
        (
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
                | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS,
            vk::AccessFlags::COLOR_ATTACHMENT_WRITE
                | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
        )
    } else {
        (
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
        )
    };

    let mut dependencies = vec![vk::SubpassDependency::default()
        .src_subpass(vk::SUBPASS_EXTERNAL)
        .dst_subpass(0)
        .src_stage_mask(stage_mask | vk::PipelineStageFlags::FRAGMENT_SHADER)
        .src_access_mask(vk::AccessFlags::empty())
        .dst_stage_mask(stage_mask)
        .dst_access_mask(access_mask)];

    let sampled_later = desc
        .color_attachments
        .iter()
        .any(|a| a.final_layout == ImageLayout::SHADER_READ_ONLY_OPTIMAL);
    if sampled_later {
        dependencies.push(
            vk::SubpassDependency::default()
                .src_subpass(0)
                .dst_subpass(vk::SUBPASS_EXTERNAL)
                .src_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
                .src_access_mask(vk::AccessFlags::COLOR_ATTACHMENT_WRITE)
                .dst_stage_mask(vk::PipelineStageFlags::FRAGMENT_SHADER)
                .dst_access_mask(vk::AccessFlags::SHADER_READ),
        );
    }
    dependencies
}

impl RenderPass {
    pub(crate) fn create(device: &ash::Device, desc: &RenderPassDesc) -> Result<Self> {
        if desc.color_attachments.is_empty() && desc.depth_attachment.is_none() {
            engine_bail!("railguard::vulkan", "Render pass needs at least one attachment");
        }

        let mut attachments = Vec::with_capacity(desc.attachment_count());
        let mut color_attachment_refs = Vec::with_capacity(desc.color_attachments.len());

        for (i, color_attachment) in desc.color_attachments.iter().enumerate() {
            attachments.push(attachment_description(color_attachment)?);
            color_attachment_refs.push(vk::AttachmentReference::default()
                .attachment(i as u32)
                .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL));
        }

        let depth_attachment_ref = match &desc.depth_attachment {
            Some(depth_attachment) => {
                let depth_index = attachments.len() as u32;
                attachments.push(attachment_description(depth_attachment)?);
                Some(vk::AttachmentReference::default()
                    .attachment(depth_index)
                    .layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL))
            }
            None => None,
        };

        let mut subpass = vk::SubpassDescription::default()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(&color_attachment_refs);

        if let Some(ref depth_ref) = depth_attachment_ref {
            subpass = subpass.depth_stencil_attachment(depth_ref);
        }

        let dependencies = subpass_dependencies(desc);

        let render_pass_info = vk::RenderPassCreateInfo::default()
            .attachments(&attachments)
            .subpasses(std::slice::from_ref(&subpass))
            .dependencies(&dependencies);

        let render_pass = unsafe { device.create_render_pass(&render_pass_info, None) }
            .map_err(|e| engine_err!("railguard::vulkan", "Failed to create render pass: {:?}", e))?;

        Ok(Self {
            render_pass,
            device: device.clone(),
        })
    }
}

impl DeviceRenderPass for RenderPass {}

impl Drop for RenderPass {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_render_pass(self.render_pass, None);
        }
    }
}

#[cfg(test)]
#[path = "vulkan_render_pass_tests.rs"]
mod tests;
