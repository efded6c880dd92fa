/// Swapchain - Vulkan implementation of the device Swapchain trait
///
/// Owns the window surface and the presentable images. Images are exposed as
/// textures so render stages can attach them to framebuffers.

use railguard_engine::railguard::device::{
    AcquiredImage, PresentStatus, Semaphore as DeviceSemaphore, Swapchain as DeviceSwapchain,
    Texture as DeviceTexture,
};
use railguard_engine::railguard::render::Format;
use railguard_engine::railguard::window::{Extent2D, RenderWindow};
use railguard_engine::railguard::{Error, Result};
use railguard_engine::{engine_bail, engine_debug, engine_err, engine_error, engine_info, engine_warn};
use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::sync::Arc;

use crate::vulkan_context::GpuContext;
use crate::vulkan_format::vk_format_to_format;
use crate::vulkan_sync::Semaphore;
use crate::vulkan_texture::Texture;

/// Prefer an sRGB BGRA or RGBA format in the sRGB non-linear color space
pub(crate) fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> Result<vk::SurfaceFormatKHR> {
    let preferred = [vk::Format::B8G8R8A8_SRGB, vk::Format::R8G8B8A8_SRGB];

    preferred
        .iter()
        .find_map(|&wanted| {
            formats
                .iter()
                .find(|f| f.format == wanted && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR)
        })
        .or_else(|| formats.first())
        .copied()
        .ok_or_else(|| engine_err!("railguard::vulkan", "Surface reports no formats"))
}

/// MAILBOX when available; FIFO is always supported
pub(crate) fn choose_present_mode(modes: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    if modes.contains(&vk::PresentModeKHR::MAILBOX) {
        vk::PresentModeKHR::MAILBOX
    } else {
        vk::PresentModeKHR::FIFO
    }
}

/// One image more than the minimum, capped by the maximum (0 = no maximum)
pub(crate) fn choose_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let count = capabilities.min_image_count + 1;
    if capabilities.max_image_count > 0 {
        count.min(capabilities.max_image_count)
    } else {
        count
    }
}

/// The surface's current extent, or the requested one clamped to the surface limits
pub(crate) fn choose_extent(capabilities: &vk::SurfaceCapabilitiesKHR, requested: Extent2D) -> Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        Extent2D::new(capabilities.current_extent.width, capabilities.current_extent.height)
    } else {
        Extent2D::new(
            requested.width.clamp(
                capabilities.min_image_extent.width,
                capabilities.max_image_extent.width,
            ),
            requested.height.clamp(
                capabilities.min_image_extent.height,
                capabilities.max_image_extent.height,
            ),
        )
    }
}

/// Vulkan swapchain implementation
pub struct Swapchain {
    ctx: Arc<GpuContext>,
    surface: vk::SurfaceKHR,
    swapchain: vk::SwapchainKHR,
    surface_format: vk::SurfaceFormatKHR,
    format: Format,
    present_mode: vk::PresentModeKHR,
    extent: Extent2D,
    images: Vec<Arc<dyn DeviceTexture>>,
}

impl Swapchain {
    pub(crate) fn new(ctx: Arc<GpuContext>, window: &dyn RenderWindow, extent: Extent2D) -> Result<Self> {
        let display_handle = window.display_handle()
            .map_err(|e| {
                engine_error!("railguard::vulkan", "Failed to get display handle: {}", e);
                Error::InitializationFailed(format!("Failed to get display handle: {}", e))
            })?;
        let window_handle = window.window_handle()
            .map_err(|e| {
                engine_error!("railguard::vulkan", "Failed to get window handle: {}", e);
                Error::InitializationFailed(format!("Failed to get window handle: {}", e))
            })?;

        let surface = unsafe {
            ash_window::create_surface(
                &ctx.entry,
                &ctx.instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            )
        }
        .map_err(|e| {
            engine_error!("railguard::vulkan", "Failed to create window surface: {:?}", e);
            Error::InitializationFailed(format!("Failed to create surface: {:?}", e))
        })?;

        // From here on, Drop releases the surface if anything fails
        let mut swapchain = Self {
            ctx,
            surface,
            swapchain: vk::SwapchainKHR::null(),
            surface_format: vk::SurfaceFormatKHR::default(),
            format: Format::UNDEFINED,
            present_mode: vk::PresentModeKHR::FIFO,
            extent,
            images: Vec::new(),
        };
        swapchain.query_surface()?;
        swapchain.build(extent)?;

        engine_info!("railguard::vulkan",
            "Swapchain created: {}x{}, {} images, {:?}, {:?}",
            swapchain.extent.width, swapchain.extent.height, swapchain.images.len(),
            swapchain.surface_format.format, swapchain.present_mode);

        Ok(swapchain)
    }

    fn query_surface(&mut self) -> Result<()> {
        let ctx = &self.ctx;
        unsafe {
            let supported = ctx.surface_loader
                .get_physical_device_surface_support(ctx.physical_device, ctx.graphics_queue.family, self.surface)
                .map_err(|e| engine_err!("railguard::vulkan", "Failed to query surface support: {:?}", e))?;
            if !supported {
                engine_error!("railguard::vulkan", "Graphics queue family cannot present to this surface");
                return Err(Error::InitializationFailed(
                    "Graphics queue family cannot present to this surface".to_string(),
                ));
            }

            let formats = ctx.surface_loader
                .get_physical_device_surface_formats(ctx.physical_device, self.surface)
                .map_err(|e| engine_err!("railguard::vulkan", "Failed to query surface formats: {:?}", e))?;
            let surface_format = choose_surface_format(&formats)?;
            let format = vk_format_to_format(surface_format.format).ok_or_else(|| {
                engine_error!("railguard::vulkan", "Unsupported surface format {:?}", surface_format.format);
                Error::InitializationFailed(format!("Unsupported surface format {:?}", surface_format.format))
            })?;

            let modes = ctx.surface_loader
                .get_physical_device_surface_present_modes(ctx.physical_device, self.surface)
                .map_err(|e| engine_err!("railguard::vulkan", "Failed to query present modes: {:?}", e))?;

            self.surface_format = surface_format;
            self.format = format;
            self.present_mode = choose_present_mode(&modes);
        }
        Ok(())
    }

    /// Create the VkSwapchainKHR (replacing the current one) and wrap its images
    fn build(&mut self, requested: Extent2D) -> Result<()> {
        let ctx = Arc::clone(&self.ctx);
        unsafe {
            let capabilities = ctx.surface_loader
                .get_physical_device_surface_capabilities(ctx.physical_device, self.surface)
                .map_err(|e| engine_err!("railguard::vulkan", "Failed to get surface capabilities: {:?}", e))?;

            let extent = choose_extent(&capabilities, requested);
            if extent.is_empty() {
                engine_bail!("railguard::vulkan",
                    "Cannot create a swapchain with a zero extent ({}x{})", extent.width, extent.height);
            }

            let old_swapchain = self.swapchain;
            let create_info = vk::SwapchainCreateInfoKHR::default()
                .surface(self.surface)
                .min_image_count(choose_image_count(&capabilities))
                .image_format(self.surface_format.format)
                .image_color_space(self.surface_format.color_space)
                .image_extent(vk::Extent2D { width: extent.width, height: extent.height })
                .image_array_layers(1)
                .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
                .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
                .pre_transform(capabilities.current_transform)
                .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
                .present_mode(self.present_mode)
                .clipped(true)
                .old_swapchain(old_swapchain);

            let swapchain = ctx.swapchain_loader
                .create_swapchain(&create_info, None)
                .map_err(|e| {
                    engine_error!("railguard::vulkan", "Failed to create swapchain: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create swapchain: {:?}", e))
                })?;

            if old_swapchain != vk::SwapchainKHR::null() {
                ctx.swapchain_loader.destroy_swapchain(old_swapchain, None);
            }
            self.swapchain = swapchain;
            self.extent = extent;

            let vk_images = ctx.swapchain_loader
                .get_swapchain_images(swapchain)
                .map_err(|e| engine_err!("railguard::vulkan", "Failed to get swapchain images: {:?}", e))?;

            let mut images: Vec<Arc<dyn DeviceTexture>> = Vec::with_capacity(vk_images.len());
            for image in vk_images {
                let texture = Texture::from_swapchain_image(
                    Arc::clone(&ctx),
                    image,
                    self.format,
                    self.surface_format.format,
                    extent,
                )?;
                images.push(Arc::new(texture));
            }
            self.images = images;
        }
        Ok(())
    }
}

impl DeviceSwapchain for Swapchain {
    fn acquire_next_image(&mut self, signal: &dyn DeviceSemaphore, timeout_ns: u64) -> Result<AcquiredImage> {
        unsafe {
            let vk_semaphore = &*(signal as *const dyn DeviceSemaphore as *const Semaphore);

            match self.ctx.swapchain_loader.acquire_next_image(
                self.swapchain,
                timeout_ns,
                vk_semaphore.semaphore,
                vk::Fence::null(),
            ) {
                Ok((index, suboptimal)) => Ok(AcquiredImage { index, suboptimal }),
                Err(vk::Result::TIMEOUT | vk::Result::NOT_READY) => {
                    engine_warn!("railguard::vulkan", "No swapchain image available after {} ns", timeout_ns);
                    Err(Error::Timeout(format!("swapchain acquire exceeded {} ns", timeout_ns)))
                }
                Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                    Err(engine_err!("railguard::vulkan", "Swapchain out of date during acquire"))
                }
                Err(e) => Err(engine_err!("railguard::vulkan", "Failed to acquire next swapchain image: {:?}", e)),
            }
        }
    }

    fn present(&mut self, image_index: u32, wait: &dyn DeviceSemaphore) -> Result<PresentStatus> {
        if image_index as usize >= self.images.len() {
            engine_bail!("railguard::vulkan",
                "present: image_index {} out of range (count: {})", image_index, self.images.len());
        }

        unsafe {
            let vk_semaphore = &*(wait as *const dyn DeviceSemaphore as *const Semaphore);
            let swapchains = [self.swapchain];
            let image_indices = [image_index];
            let wait_semaphores = [vk_semaphore.semaphore];

            let present_info = vk::PresentInfoKHR::default()
                .wait_semaphores(&wait_semaphores)
                .swapchains(&swapchains)
                .image_indices(&image_indices);

            let _queue = self.ctx.queue_lock.lock().unwrap();
            match self.ctx.swapchain_loader.queue_present(self.ctx.graphics_queue.queue, &present_info) {
                Ok(false) => Ok(PresentStatus::Optimal),
                Ok(true) => Ok(PresentStatus::Suboptimal),
                Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                    Err(engine_err!("railguard::vulkan", "Swapchain out of date during present"))
                }
                Err(e) => Err(engine_err!("railguard::vulkan", "Failed to present swapchain image: {:?}", e)),
            }
        }
    }

    fn recreate(&mut self, extent: Extent2D) -> Result<()> {
        unsafe {
            self.ctx.device.device_wait_idle()
                .map_err(|e| engine_err!("railguard::vulkan", "Failed to wait idle before swapchain recreate: {:?}", e))?;
        }

        // Views must go before the images they reference
        self.images.clear();
        self.build(extent)?;

        engine_debug!("railguard::vulkan",
            "Swapchain recreated: {}x{}, {} images", self.extent.width, self.extent.height, self.images.len());
        Ok(())
    }

    fn image_count(&self) -> usize {
        self.images.len()
    }

    fn extent(&self) -> Extent2D {
        self.extent
    }

    fn format(&self) -> Format {
        self.format
    }

    fn image(&self, index: usize) -> Option<Arc<dyn DeviceTexture>> {
        self.images.get(index).cloned()
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.device_wait_idle().ok();

            self.images.clear();
            if self.swapchain != vk::SwapchainKHR::null() {
                self.ctx.swapchain_loader.destroy_swapchain(self.swapchain, None);
            }
            self.ctx.surface_loader.destroy_surface(self.surface, None);
        }
    }
}

#[cfg(test)]
#[path = "vulkan_swapchain_tests.rs"]
mod tests;
