/// Pipeline and PipelineLayout - Vulkan implementations of the device pipeline traits
///
/// Fixed-function state shared by every pipeline: triangle list, no culling,
/// counter-clockwise front face, no blending, static viewport and scissor.

use railguard_engine::railguard::device::{
    BindingGroupLayout, Pipeline as DevicePipeline, PipelineDesc,
    PipelineLayout as DevicePipelineLayout, ShaderModule as DeviceShaderModule,
    RenderPass as DeviceRenderPass,
};
use railguard_engine::railguard::render::{TextureLayout, Vertex};
use railguard_engine::railguard::window::Extent2D;
use railguard_engine::railguard::Result;
use railguard_engine::{engine_bail, engine_err};
use ash::vk;
use std::mem::{offset_of, size_of};

use crate::vulkan_context::GpuContext;
use crate::vulkan_format::shader_stage_to_vk;
use crate::vulkan_render_pass::RenderPass;
use crate::vulkan_shader::{ShaderModule, ENTRY_POINT};

/// Vulkan pipeline layout implementation
///
/// Set layouts are owned by the context cache and outlive the layout.
pub struct PipelineLayout {
    pub(crate) layout: vk::PipelineLayout,
    texture_count: usize,
    device: ash::Device,
}

impl PipelineLayout {
    pub(crate) fn create(ctx: &GpuContext, textures: &[TextureLayout]) -> Result<Self> {
        let mut set_layouts = vec![
            ctx.set_layout(&BindingGroupLayout::Camera)?,
            ctx.set_layout(&BindingGroupLayout::Objects)?,
        ];
        if !textures.is_empty() {
            set_layouts.push(ctx.set_layout(&BindingGroupLayout::Textures(textures.to_vec()))?);
        }

        let layout_create_info = vk::PipelineLayoutCreateInfo::default().set_layouts(&set_layouts);
        let layout = unsafe { ctx.device.create_pipeline_layout(&layout_create_info, None) }
            .map_err(|e| engine_err!("railguard::vulkan", "Failed to create pipeline layout: {:?}", e))?;

        Ok(Self {
            layout,
            texture_count: textures.len(),
            device: ctx.device.clone(),
        })
    }
}

impl DevicePipelineLayout for PipelineLayout {
    fn texture_count(&self) -> usize {
        self.texture_count
    }
}

impl Drop for PipelineLayout {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_pipeline_layout(self.layout, None);
        }
    }
}

/// Vulkan pipeline implementation
pub struct Pipeline {
    /// Vulkan graphics pipeline
    pub(crate) pipeline: vk::Pipeline,
    /// Vulkan device (for cleanup)
    pub(crate) device: ash::Device,
}

/// Vertex buffer binding of material pipelines
pub(crate) fn vertex_binding() -> vk::VertexInputBindingDescription {
    vk::VertexInputBindingDescription {
        binding: 0,
        stride: size_of::<Vertex>() as u32,
        input_rate: vk::VertexInputRate::VERTEX,
    }
}

/// Position, normal and texture coordinates at locations 0, 1 and 2
pub(crate) fn vertex_attributes() -> [vk::VertexInputAttributeDescription; 3] {
    [
        vk::VertexInputAttributeDescription {
            location: 0,
            binding: 0,
            format: vk::Format::R32G32B32_SFLOAT,
            offset: offset_of!(Vertex, position) as u32,
        },
        vk::VertexInputAttributeDescription {
            location: 1,
            binding: 0,
            format: vk::Format::R32G32B32_SFLOAT,
            offset: offset_of!(Vertex, normal) as u32,
        },
        vk::VertexInputAttributeDescription {
            location: 2,
            binding: 0,
            format: vk::Format::R32G32_SFLOAT,
            offset: offset_of!(Vertex, tex_coord) as u32,
        },
    ]
}

pub(crate) fn full_viewport(extent: Extent2D) -> (vk::Viewport, vk::Rect2D) {
    let viewport = vk::Viewport::default()
        .x(0.0)
        .y(0.0)
        .width(extent.width as f32)
        .height(extent.height as f32)
        .min_depth(0.0)
        .max_depth(1.0);
    let scissor = vk::Rect2D {
        offset: vk::Offset2D { x: 0, y: 0 },
        extent: vk::Extent2D {
            width: extent.width,
            height: extent.height,
        },
    };
    (viewport, scissor)
}

pub(crate) fn depth_stencil_state(depth_test: bool) -> vk::PipelineDepthStencilStateCreateInfo<'static> {
    vk::PipelineDepthStencilStateCreateInfo::default()
        .depth_test_enable(depth_test)
        .depth_write_enable(depth_test)
        .depth_compare_op(if depth_test {
            vk::CompareOp::LESS_OR_EQUAL
        } else {
            vk::CompareOp::ALWAYS
        })
        .depth_bounds_test_enable(false)
        .stencil_test_enable(false)
}

impl Pipeline {
    pub(crate) fn create(device: &ash::Device, desc: &PipelineDesc) -> Result<Self> {
        if desc.shader_modules.is_empty() {
            engine_bail!("railguard::vulkan", "Pipeline needs at least one shader stage");
        }

        unsafe {
            let vk_render_pass = desc.render_pass.as_ref()
                as *const dyn DeviceRenderPass
                as *const RenderPass;
            let vk_render_pass = &*vk_render_pass;

            let vk_layout = desc.layout.as_ref()
                as *const dyn DevicePipelineLayout
                as *const PipelineLayout;
            let vk_layout = &*vk_layout;

            let shader_stages: Vec<vk::PipelineShaderStageCreateInfo> = desc
                .shader_modules
                .iter()
                .map(|module| {
                    let vk_module = module.as_ref() as *const dyn DeviceShaderModule as *const ShaderModule;
                    let vk_module = &*vk_module;
                    vk::PipelineShaderStageCreateInfo::default()
                        .stage(shader_stage_to_vk(vk_module.stage))
                        .module(vk_module.module)
                        .name(ENTRY_POINT)
                })
                .collect();

            // Full-screen quads generate their vertices in the vertex shader
            let bindings = [vertex_binding()];
            let attributes = vertex_attributes();
            let vertex_input_state = if desc.vertex_input {
                vk::PipelineVertexInputStateCreateInfo::default()
                    .vertex_binding_descriptions(&bindings)
                    .vertex_attribute_descriptions(&attributes)
            } else {
                vk::PipelineVertexInputStateCreateInfo::default()
            };

            let input_assembly_state = vk::PipelineInputAssemblyStateCreateInfo::default()
                .topology(vk::PrimitiveTopology::TRIANGLE_LIST)
                .primitive_restart_enable(false);

            let (viewport, scissor) = full_viewport(desc.extent);
            let viewports = [viewport];
            let scissors = [scissor];
            let viewport_state = vk::PipelineViewportStateCreateInfo::default()
                .viewports(&viewports)
                .scissors(&scissors);

            let rasterization_state = vk::PipelineRasterizationStateCreateInfo::default()
                .depth_clamp_enable(false)
                .rasterizer_discard_enable(false)
                .polygon_mode(vk::PolygonMode::FILL)
                .line_width(1.0)
                .cull_mode(vk::CullModeFlags::NONE)
                .front_face(vk::FrontFace::COUNTER_CLOCKWISE)
                .depth_bias_enable(false);

            let depth_stencil_state = depth_stencil_state(desc.depth_test);

            let multisample_state = vk::PipelineMultisampleStateCreateInfo::default()
                .sample_shading_enable(false)
                .rasterization_samples(vk::SampleCountFlags::TYPE_1);

            let color_blend_attachments = vec![
                vk::PipelineColorBlendAttachmentState::default()
                    .color_write_mask(vk::ColorComponentFlags::RGBA)
                    .blend_enable(false);
                desc.color_attachment_count as usize
            ];
            let color_blend_state = vk::PipelineColorBlendStateCreateInfo::default()
                .logic_op_enable(false)
                .attachments(&color_blend_attachments);

            let pipeline_create_info = vk::GraphicsPipelineCreateInfo::default()
                .stages(&shader_stages)
                .vertex_input_state(&vertex_input_state)
                .input_assembly_state(&input_assembly_state)
                .viewport_state(&viewport_state)
                .rasterization_state(&rasterization_state)
                .depth_stencil_state(&depth_stencil_state)
                .multisample_state(&multisample_state)
                .color_blend_state(&color_blend_state)
                .layout(vk_layout.layout)
                .render_pass(vk_render_pass.render_pass)
                .subpass(0);

            let pipelines = device
                .create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_create_info], None)
                .map_err(|e| engine_err!("railguard::vulkan", "Failed to create graphics pipeline: {:?}", e.1))?;

            Ok(Self {
                pipeline: pipelines[0],
                device: device.clone(),
            })
        }
    }
}

impl DevicePipeline for Pipeline {}

impl Drop for Pipeline {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_pipeline(self.pipeline, None);
        }
    }
}

#[cfg(test)]
#[path = "vulkan_pipeline_tests.rs"]
mod tests;
