/// Conversions between engine enums and their Vulkan counterparts

use ash::vk;
use railguard_engine::railguard::device::{ClearValue, IndexType};
use railguard_engine::railguard::render::{Format, ImageLayout, ShaderStage};

/// Concrete Vulkan format of an engine format
///
/// `WINDOW_FORMAT` and `UNDEFINED` have no fixed Vulkan format and map to `None`.
pub(crate) fn format_to_vk(format: Format) -> Option<vk::Format> {
    match format {
        Format::D32_SFLOAT => Some(vk::Format::D32_SFLOAT),
        Format::B8G8R8A8_SRGB => Some(vk::Format::B8G8R8A8_SRGB),
        Format::R8G8B8A8_SRGB => Some(vk::Format::R8G8B8A8_SRGB),
        Format::R8G8B8A8_UINT => Some(vk::Format::R8G8B8A8_UINT),
        Format::R16G16B16A16_SFLOAT => Some(vk::Format::R16G16B16A16_SFLOAT),
        Format::UNDEFINED | Format::WINDOW_FORMAT => None,
    }
}

/// Engine format of a Vulkan format, used for surface formats
pub(crate) fn vk_format_to_format(vk_format: vk::Format) -> Option<Format> {
    match vk_format {
        vk::Format::D32_SFLOAT => Some(Format::D32_SFLOAT),
        vk::Format::B8G8R8A8_SRGB => Some(Format::B8G8R8A8_SRGB),
        vk::Format::R8G8B8A8_SRGB => Some(Format::R8G8B8A8_SRGB),
        vk::Format::R8G8B8A8_UINT => Some(Format::R8G8B8A8_UINT),
        vk::Format::R16G16B16A16_SFLOAT => Some(Format::R16G16B16A16_SFLOAT),
        _ => None,
    }
}

pub(crate) fn image_layout_to_vk(layout: ImageLayout) -> vk::ImageLayout {
    match layout {
        ImageLayout::UNDEFINED => vk::ImageLayout::UNDEFINED,
        ImageLayout::SHADER_READ_ONLY_OPTIMAL => vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        ImageLayout::PRESENT_SRC => vk::ImageLayout::PRESENT_SRC_KHR,
        ImageLayout::DEPTH_STENCIL_OPTIMAL => vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
    }
}

pub(crate) fn shader_stage_to_vk(stage: ShaderStage) -> vk::ShaderStageFlags {
    let mut flags = vk::ShaderStageFlags::empty();
    if stage.contains(ShaderStage::VERTEX) {
        flags |= vk::ShaderStageFlags::VERTEX;
    }
    if stage.contains(ShaderStage::FRAGMENT) {
        flags |= vk::ShaderStageFlags::FRAGMENT;
    }
    flags
}

pub(crate) fn index_type_to_vk(index_type: IndexType) -> vk::IndexType {
    match index_type {
        IndexType::U16 => vk::IndexType::UINT16,
        IndexType::U32 => vk::IndexType::UINT32,
    }
}

pub(crate) fn clear_value_to_vk(value: &ClearValue) -> vk::ClearValue {
    match value {
        ClearValue::Color(color) => vk::ClearValue {
            color: vk::ClearColorValue {
                float32: *color,
            },
        },
        ClearValue::DepthStencil { depth, stencil } => vk::ClearValue {
            depth_stencil: vk::ClearDepthStencilValue {
                depth: *depth,
                stencil: *stencil,
            },
        },
    }
}

#[cfg(test)]
#[path = "vulkan_format_tests.rs"]
mod tests;
