/// Texture - Vulkan implementation of the device Texture trait
///
/// Covers sampled textures, render pass attachments and swapchain images.
/// Swapchain images are owned by their swapchain: the texture only owns the view.

use railguard_engine::railguard::device::Texture as DeviceTexture;
use railguard_engine::railguard::render::{FilterMode, Format};
use railguard_engine::railguard::window::Extent2D;
use railguard_engine::railguard::Result;
use railguard_engine::{engine_bail, engine_err};
use ash::vk;
use gpu_allocator::vulkan::Allocation;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;
use crate::vulkan_format::format_to_vk;

/// What an image is created for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ImageKind {
    /// Filled through the transfer queue, sampled by shaders
    Sampled(FilterMode),
    /// Color or depth output of a render stage, sampled by later stages
    Attachment,
}

/// Vulkan texture implementation
pub struct Texture {
    ctx: Arc<GpuContext>,
    /// Vulkan image
    pub(crate) image: vk::Image,
    /// Vulkan image view
    pub(crate) view: vk::ImageView,
    /// Sampler used when the texture is bound; null for swapchain images
    pub(crate) sampler: vk::Sampler,
    /// GPU memory allocation; `None` for swapchain images
    pub(crate) allocation: Option<Allocation>,
    pub(crate) extent: Extent2D,
    pub(crate) format: Format,
}

pub(crate) fn aspect_mask_for(format: Format) -> vk::ImageAspectFlags {
    if format.is_depth() {
        vk::ImageAspectFlags::DEPTH
    } else {
        vk::ImageAspectFlags::COLOR
    }
}

pub(crate) fn color_subresource_range() -> vk::ImageSubresourceRange {
    vk::ImageSubresourceRange {
        aspect_mask: vk::ImageAspectFlags::COLOR,
        base_mip_level: 0,
        level_count: 1,
        base_array_layer: 0,
        layer_count: 1,
    }
}

unsafe fn create_view(
    device: &ash::Device,
    image: vk::Image,
    format: vk::Format,
    aspect_mask: vk::ImageAspectFlags,
) -> std::result::Result<vk::ImageView, vk::Result> {
    let view_create_info = vk::ImageViewCreateInfo::default()
        .image(image)
        .view_type(vk::ImageViewType::TYPE_2D)
        .format(format)
        .components(vk::ComponentMapping {
            r: vk::ComponentSwizzle::IDENTITY,
            g: vk::ComponentSwizzle::IDENTITY,
            b: vk::ComponentSwizzle::IDENTITY,
            a: vk::ComponentSwizzle::IDENTITY,
        })
        .subresource_range(vk::ImageSubresourceRange {
            aspect_mask,
            ..color_subresource_range()
        });

    device.create_image_view(&view_create_info, None)
}

impl Texture {
    /// Create a device-local image with its view and sampler
    pub(crate) fn create(
        ctx: Arc<GpuContext>,
        format: Format,
        extent: Extent2D,
        kind: ImageKind,
    ) -> Result<Self> {
        if extent.is_empty() {
            engine_bail!("railguard::vulkan", "Cannot create a {}x{} image", extent.width, extent.height);
        }
        let vk_format = format_to_vk(format).ok_or_else(|| {
            engine_err!("railguard::vulkan", "Format {:?} has no concrete Vulkan format", format)
        })?;

        let (usage_flags, filter) = match kind {
            ImageKind::Sampled(filter) => (
                vk::ImageUsageFlags::SAMPLED | vk::ImageUsageFlags::TRANSFER_DST,
                filter,
            ),
            ImageKind::Attachment if format.is_depth() => (
                vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT | vk::ImageUsageFlags::SAMPLED,
                FilterMode::NEAREST,
            ),
            ImageKind::Attachment => (
                vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::SAMPLED,
                FilterMode::NEAREST,
            ),
        };
        let sampler = ctx.sampler(filter)?;

        unsafe {
            let image_create_info = vk::ImageCreateInfo::default()
                .image_type(vk::ImageType::TYPE_2D)
                .format(vk_format)
                .extent(vk::Extent3D {
                    width: extent.width,
                    height: extent.height,
                    depth: 1,
                })
                .mip_levels(1)
                .array_layers(1)
                .samples(vk::SampleCountFlags::TYPE_1)
                .tiling(vk::ImageTiling::OPTIMAL)
                .usage(usage_flags)
                .sharing_mode(vk::SharingMode::EXCLUSIVE)
                .initial_layout(vk::ImageLayout::UNDEFINED);

            let image = ctx.device.create_image(&image_create_info, None)
                .map_err(|e| engine_err!("railguard::vulkan", "Failed to create {:?} image: {:?}", format, e))?;

            let requirements = ctx.device.get_image_memory_requirements(image);
            let allocation = match ctx.allocate("texture", requirements, gpu_allocator::MemoryLocation::GpuOnly, false) {
                Ok(allocation) => allocation,
                Err(e) => {
                    ctx.device.destroy_image(image, None);
                    return Err(e);
                }
            };

            if let Err(e) = ctx.device.bind_image_memory(image, allocation.memory(), allocation.offset()) {
                ctx.free(allocation);
                ctx.device.destroy_image(image, None);
                engine_bail!("railguard::vulkan", "Failed to bind texture image memory: {:?}", e);
            }

            let view = match create_view(&ctx.device, image, vk_format, aspect_mask_for(format)) {
                Ok(view) => view,
                Err(e) => {
                    ctx.free(allocation);
                    ctx.device.destroy_image(image, None);
                    engine_bail!("railguard::vulkan", "Failed to create texture image view: {:?}", e);
                }
            };

            Ok(Self {
                ctx,
                image,
                view,
                sampler,
                allocation: Some(allocation),
                extent,
                format,
            })
        }
    }

    /// Wrap an image owned by a swapchain
    pub(crate) fn from_swapchain_image(
        ctx: Arc<GpuContext>,
        image: vk::Image,
        format: Format,
        vk_format: vk::Format,
        extent: Extent2D,
    ) -> Result<Self> {
        let view = unsafe { create_view(&ctx.device, image, vk_format, vk::ImageAspectFlags::COLOR) }
            .map_err(|e| engine_err!("railguard::vulkan", "Failed to create swapchain image view: {:?}", e))?;

        Ok(Self {
            ctx,
            image,
            view,
            sampler: vk::Sampler::null(),
            allocation: None,
            extent,
            format,
        })
    }
}

impl DeviceTexture for Texture {
    fn extent(&self) -> Extent2D {
        self.extent
    }

    fn format(&self) -> Format {
        self.format
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_image_view(self.view, None);

            // Images without an allocation belong to a swapchain
            if let Some(allocation) = self.allocation.take() {
                self.ctx.free(allocation);
                self.ctx.device.destroy_image(self.image, None);
            }
        }
    }
}
