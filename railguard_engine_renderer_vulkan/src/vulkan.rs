/// VulkanGraphicsDevice - Vulkan implementation of the GraphicsDevice trait

use railguard_engine::railguard::device::{
    AttachmentDesc, Buffer as DeviceBuffer, BufferDesc, CommandList as DeviceCommandList,
    DescriptorPool as DeviceDescriptorPool, DescriptorPoolDesc, DeviceLimits, Fence as DeviceFence,
    Framebuffer as DeviceFramebuffer, FramebufferDesc, GraphicsDevice, MemoryLocation,
    Pipeline as DevicePipeline, PipelineDesc, PipelineLayout as DevicePipelineLayout,
    RenderPass as DeviceRenderPass, RenderPassDesc, Semaphore as DeviceSemaphore,
    ShaderModule as DeviceShaderModule, Swapchain as DeviceSwapchain, Texture as DeviceTexture,
    TextureDesc,
};
use railguard_engine::railguard::render::{Format, ShaderStage, TextureLayout, ENGINE_VERSION};
use railguard_engine::railguard::window::{Extent2D, RenderWindow};
use railguard_engine::railguard::{Error, RendererConfig, Result};
use railguard_engine::{engine_debug, engine_err, engine_error, engine_info};
use ash::vk;
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use raw_window_handle::HasDisplayHandle;
use std::ffi::{CStr, CString};
use std::sync::Arc;

use crate::vulkan_binding_group::DescriptorPool;
use crate::vulkan_buffer::{buffer_usage_to_vk, memory_location_to_gpu_allocator, Buffer};
use crate::vulkan_command_list::CommandList;
use crate::vulkan_context::{GpuContext, Queue};
use crate::vulkan_frame_buffer::Framebuffer;
use crate::vulkan_pipeline::{Pipeline, PipelineLayout};
use crate::vulkan_render_pass::RenderPass;
use crate::vulkan_shader::ShaderModule;
use crate::vulkan_swapchain::Swapchain;
use crate::vulkan_sync::{Fence, Semaphore};
use crate::vulkan_texture::{ImageKind, Texture};
use crate::vulkan_transfer::TransferQueue;

const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

// ============================================================================
// Physical device selection
// ============================================================================

/// What device selection needs to know about a physical device
#[derive(Debug, Clone)]
pub(crate) struct DeviceCandidate {
    pub name: String,
    pub device_type: vk::PhysicalDeviceType,
    pub max_image_dimension_2d: u32,
    pub supports_swapchain: bool,
    pub has_graphics_queue: bool,
}

/// Suitability score of a device; 0 means unusable
pub(crate) fn score_device(candidate: &DeviceCandidate) -> u32 {
    if !candidate.supports_swapchain || !candidate.has_graphics_queue {
        return 0;
    }

    let mut score = 0;
    // Software rasterizer
    if !candidate.name.starts_with("llvmpipe") {
        score += 15000;
    }
    if candidate.device_type == vk::PhysicalDeviceType::DISCRETE_GPU {
        score += 10000;
    }
    score + candidate.max_image_dimension_2d
}

/// `(graphics, transfer)` queue family indices
///
/// The transfer family is a transfer-only family when the device has one,
/// otherwise the graphics family.
pub(crate) fn find_queue_families(families: &[vk::QueueFamilyProperties]) -> Option<(u32, u32)> {
    let graphics = families
        .iter()
        .position(|family| family.queue_count > 0 && family.queue_flags.contains(vk::QueueFlags::GRAPHICS))?
        as u32;

    let transfer = families
        .iter()
        .position(|family| {
            family.queue_count > 0
                && family.queue_flags.contains(vk::QueueFlags::TRANSFER)
                && !family.queue_flags.intersects(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE)
        })
        .map(|index| index as u32)
        .unwrap_or(graphics);

    Some((graphics, transfer))
}

unsafe fn describe_device(instance: &ash::Instance, physical_device: vk::PhysicalDevice) -> DeviceCandidate {
    let properties = instance.get_physical_device_properties(physical_device);
    let name = properties
        .device_name_as_c_str()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let supports_swapchain = instance
        .enumerate_device_extension_properties(physical_device)
        .map(|extensions| {
            extensions.iter().any(|extension| {
                extension.extension_name_as_c_str().ok() == Some(ash::khr::swapchain::NAME)
            })
        })
        .unwrap_or(false);

    let families = instance.get_physical_device_queue_family_properties(physical_device);

    DeviceCandidate {
        name,
        device_type: properties.device_type,
        max_image_dimension_2d: properties.limits.max_image_dimension2_d,
        supports_swapchain,
        has_graphics_queue: find_queue_families(&families).is_some(),
    }
}

// ============================================================================
// VulkanGraphicsDevice
// ============================================================================

/// Vulkan device implementation
///
/// Central object for creating resources and submitting commands. Must
/// outlive every resource it created.
pub struct VulkanGraphicsDevice {
    ctx: Arc<GpuContext>,
    transfer: TransferQueue,
    limits: DeviceLimits,
}

impl VulkanGraphicsDevice {
    /// Create a new Vulkan device
    ///
    /// # Arguments
    ///
    /// * `display` - Display the windows live on (selects the surface extensions)
    /// * `config` - Renderer configuration
    pub fn new<D: HasDisplayHandle + ?Sized>(display: &D, config: &RendererConfig) -> Result<Self> {
        unsafe {
            let entry = ash::Entry::load()
                .map_err(|e| {
                    engine_error!("railguard::vulkan", "Failed to load Vulkan library: {:?}", e);
                    Error::InitializationFailed(format!("Failed to load Vulkan library: {:?}", e))
                })?;

            let app_name = CString::new(config.application_name.as_str()).unwrap_or_default();
            let app_version = config.application_version;
            let app_info = vk::ApplicationInfo::default()
                .application_name(&app_name)
                .application_version(vk::make_api_version(0, app_version.major, app_version.minor, app_version.patch))
                .engine_name(c"Railguard")
                .engine_version(vk::make_api_version(0, ENGINE_VERSION.major, ENGINE_VERSION.minor, ENGINE_VERSION.patch))
                .api_version(vk::API_VERSION_1_3);

            let display_handle = display.display_handle()
                .map_err(|e| {
                    engine_error!("railguard::vulkan", "Failed to get display handle: {}", e);
                    Error::InitializationFailed(format!("Failed to get display handle: {}", e))
                })?;
            let mut extension_names = ash_window::enumerate_required_extensions(display_handle.as_raw())
                .map_err(|e| {
                    engine_error!("railguard::vulkan", "Failed to get required extensions: {}", e);
                    Error::InitializationFailed(format!("Failed to get required extensions: {}", e))
                })?
                .to_vec();

            let layer_names = if config.enable_validation {
                extension_names.push(ash::ext::debug_utils::NAME.as_ptr());

                let available = entry.enumerate_instance_layer_properties().unwrap_or_default();
                let found = available
                    .iter()
                    .any(|layer| layer.layer_name_as_c_str().ok() == Some(VALIDATION_LAYER));
                if !found {
                    engine_error!("railguard::vulkan", "Validation requested but {:?} is not installed", VALIDATION_LAYER);
                    return Err(Error::InitializationFailed("Validation layer not available".to_string()));
                }
                vec![VALIDATION_LAYER.as_ptr()]
            } else {
                vec![]
            };

            let create_info = vk::InstanceCreateInfo::default()
                .application_info(&app_info)
                .enabled_layer_names(&layer_names)
                .enabled_extension_names(&extension_names);

            let instance = entry
                .create_instance(&create_info, None)
                .map_err(|e| {
                    engine_error!("railguard::vulkan", "Failed to create Vulkan instance: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create instance: {:?}", e))
                })?;

            let (debug_utils_loader, debug_messenger) = if config.enable_validation {
                let debug_utils = ash::ext::debug_utils::Instance::new(&entry, &instance);

                crate::debug::init_debug_config(crate::debug::Config {
                    severity: config.debug_severity,
                    output: config.debug_output.clone(),
                    message_filter: config.debug_message_filter,
                    break_on_error: config.break_on_validation_error,
                    panic_on_error: config.panic_on_error,
                    enable_stats: config.enable_validation_stats,
                });

                let debug_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
                    .message_severity(crate::debug::severity_flags(config.debug_severity))
                    .message_type(
                        vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                            | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                            | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE
                    )
                    .pfn_user_callback(Some(crate::debug::vulkan_debug_callback));

                let messenger = debug_utils
                    .create_debug_utils_messenger(&debug_info, None)
                    .map_err(|e| {
                        engine_error!("railguard::vulkan", "Failed to create debug messenger: {:?}", e);
                        Error::InitializationFailed(format!("Failed to create debug messenger: {:?}", e))
                    })?;

                (Some(debug_utils), Some(messenger))
            } else {
                (None, None)
            };

            // Pick the best scoring physical device
            let physical_devices = instance
                .enumerate_physical_devices()
                .map_err(|e| {
                    engine_error!("railguard::vulkan", "Failed to enumerate physical devices: {:?}", e);
                    Error::InitializationFailed(format!("Failed to enumerate physical devices: {:?}", e))
                })?;

            let (physical_device, candidate, _) = physical_devices
                .into_iter()
                .map(|physical_device| {
                    let candidate = describe_device(&instance, physical_device);
                    let score = score_device(&candidate);
                    engine_debug!("railguard::vulkan", "GPU candidate '{}' scored {}", candidate.name, score);
                    (physical_device, candidate, score)
                })
                .filter(|(_, _, score)| *score > 0)
                .max_by_key(|(_, _, score)| *score)
                .ok_or_else(|| {
                    engine_error!("railguard::vulkan", "No suitable Vulkan GPU found");
                    Error::InitializationFailed("No suitable Vulkan GPU found".to_string())
                })?;

            let queue_families = instance.get_physical_device_queue_family_properties(physical_device);
            let (graphics_family, transfer_family) = find_queue_families(&queue_families)
                .ok_or_else(|| {
                    engine_error!("railguard::vulkan", "No graphics queue family found");
                    Error::InitializationFailed("No graphics queue family found".to_string())
                })?;

            // Create Logical Device
            let queue_priorities = [1.0];
            let mut queue_create_infos = vec![
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(graphics_family)
                    .queue_priorities(&queue_priorities),
            ];
            if transfer_family != graphics_family {
                queue_create_infos.push(
                    vk::DeviceQueueCreateInfo::default()
                        .queue_family_index(transfer_family)
                        .queue_priorities(&queue_priorities),
                );
            }

            let device_extension_names = [ash::khr::swapchain::NAME.as_ptr()];

            let supported_features = instance.get_physical_device_features(physical_device);
            let properties = instance.get_physical_device_properties(physical_device);
            let anisotropy = supported_features.sampler_anisotropy == vk::TRUE;
            let multi_draw_indirect = supported_features.multi_draw_indirect == vk::TRUE;

            let device_features = vk::PhysicalDeviceFeatures::default()
                .sampler_anisotropy(anisotropy)
                .multi_draw_indirect(multi_draw_indirect);

            let device_create_info = vk::DeviceCreateInfo::default()
                .queue_create_infos(&queue_create_infos)
                .enabled_extension_names(&device_extension_names)
                .enabled_features(&device_features);

            let device = instance
                .create_device(physical_device, &device_create_info, None)
                .map_err(|e| {
                    engine_error!("railguard::vulkan", "Failed to create logical device: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create device: {:?}", e))
                })?;

            let graphics_queue = Queue {
                queue: device.get_device_queue(graphics_family, 0),
                family: graphics_family,
            };
            let transfer_queue = Queue {
                queue: device.get_device_queue(transfer_family, 0),
                family: transfer_family,
            };

            let allocator = Allocator::new(&AllocatorCreateDesc {
                instance: instance.clone(),
                device: device.clone(),
                physical_device,
                debug_settings: Default::default(),
                buffer_device_address: false,
                allocation_sizes: Default::default(),
            })
            .map_err(|e| {
                engine_error!("railguard::vulkan", "Failed to create GPU allocator: {:?}", e);
                Error::InitializationFailed(format!("Failed to create allocator: {:?}", e))
            })?;

            let max_anisotropy = anisotropy.then_some(properties.limits.max_sampler_anisotropy);
            let limits = DeviceLimits {
                min_uniform_buffer_offset_alignment: properties.limits.min_uniform_buffer_offset_alignment,
            };

            let ctx = Arc::new(GpuContext::new(
                entry,
                instance,
                physical_device,
                device,
                allocator,
                graphics_queue,
                transfer_queue,
                multi_draw_indirect,
                max_anisotropy,
                debug_utils_loader,
                debug_messenger,
            ));
            let transfer = TransferQueue::new(Arc::clone(&ctx))?;

            engine_info!("railguard::vulkan",
                "Vulkan device '{}' ({:?}), graphics family {}, transfer family {}, multi-draw indirect: {}",
                candidate.name, candidate.device_type, graphics_family, transfer_family, multi_draw_indirect);

            Ok(Self { ctx, transfer, limits })
        }
    }

    fn downcast_buffer(buffer: &Arc<dyn DeviceBuffer>) -> &Buffer {
        unsafe { &*(buffer.as_ref() as *const dyn DeviceBuffer as *const Buffer) }
    }

    fn downcast_texture(texture: &Arc<dyn DeviceTexture>) -> &Texture {
        unsafe { &*(texture.as_ref() as *const dyn DeviceTexture as *const Texture) }
    }
}

impl GraphicsDevice for VulkanGraphicsDevice {
    fn limits(&self) -> DeviceLimits {
        self.limits
    }

    fn create_shader_module(&self, code: &[u8], stage: ShaderStage) -> Result<Arc<dyn DeviceShaderModule>> {
        Ok(Arc::new(ShaderModule::create(&self.ctx.device, code, stage)?))
    }

    fn create_pipeline_layout(&self, textures: &[TextureLayout]) -> Result<Arc<dyn DevicePipelineLayout>> {
        Ok(Arc::new(PipelineLayout::create(&self.ctx, textures)?))
    }

    fn create_render_pass(&self, desc: &RenderPassDesc) -> Result<Arc<dyn DeviceRenderPass>> {
        Ok(Arc::new(RenderPass::create(&self.ctx.device, desc)?))
    }

    fn create_pipeline(&self, desc: &PipelineDesc) -> Result<Arc<dyn DevicePipeline>> {
        Ok(Arc::new(Pipeline::create(&self.ctx.device, desc)?))
    }

    fn create_buffer(&self, desc: &BufferDesc) -> Result<Arc<dyn DeviceBuffer>> {
        let mut usage = buffer_usage_to_vk(desc.usage);
        if desc.location == MemoryLocation::GpuOnly {
            usage |= vk::BufferUsageFlags::TRANSFER_DST;
        }

        let buffer = Buffer::create(
            Arc::clone(&self.ctx),
            &format!("{:?} buffer", desc.usage),
            desc.size,
            usage,
            memory_location_to_gpu_allocator(desc.location),
        )?;
        Ok(Arc::new(buffer))
    }

    fn create_attachment(&self, desc: &AttachmentDesc) -> Result<Arc<dyn DeviceTexture>> {
        let texture = Texture::create(Arc::clone(&self.ctx), desc.format, desc.extent, ImageKind::Attachment)?;
        Ok(Arc::new(texture))
    }

    fn create_texture(&self, desc: &TextureDesc) -> Result<Arc<dyn DeviceTexture>> {
        let texture = Texture::create(
            Arc::clone(&self.ctx),
            Format::R8G8B8A8_SRGB,
            Extent2D::new(desc.width, desc.height),
            ImageKind::Sampled(desc.filter),
        )?;
        Ok(Arc::new(texture))
    }

    fn create_framebuffer(&self, desc: &FramebufferDesc) -> Result<Arc<dyn DeviceFramebuffer>> {
        Ok(Arc::new(Framebuffer::create(&self.ctx.device, desc)?))
    }

    fn create_swapchain(&self, window: &dyn RenderWindow, extent: Extent2D) -> Result<Box<dyn DeviceSwapchain>> {
        Ok(Box::new(Swapchain::new(Arc::clone(&self.ctx), window, extent)?))
    }

    fn create_command_list(&self) -> Result<Box<dyn DeviceCommandList>> {
        let command_list = CommandList::new(
            self.ctx.device.clone(),
            self.ctx.graphics_queue.family,
            self.ctx.multi_draw_indirect,
        )?;
        Ok(Box::new(command_list))
    }

    fn create_fence(&self, signaled: bool) -> Result<Box<dyn DeviceFence>> {
        Ok(Box::new(Fence::new(self.ctx.device.clone(), signaled)?))
    }

    fn create_semaphore(&self) -> Result<Arc<dyn DeviceSemaphore>> {
        Ok(Arc::new(Semaphore::new(self.ctx.device.clone())?))
    }

    fn create_descriptor_pool(&self, desc: &DescriptorPoolDesc) -> Result<Box<dyn DeviceDescriptorPool>> {
        Ok(Box::new(DescriptorPool::create(Arc::clone(&self.ctx), desc)?))
    }

    fn upload_buffer(&self, dst: &Arc<dyn DeviceBuffer>, offset: u64, data: &[u8]) -> Result<()> {
        self.transfer.upload_buffer(Self::downcast_buffer(dst), offset, data)
    }

    fn upload_texture(&self, dst: &Arc<dyn DeviceTexture>, pixels: &[u8]) -> Result<()> {
        self.transfer.upload_texture(Self::downcast_texture(dst), pixels)
    }

    fn reclaim_transfers(&self) -> Result<()> {
        self.transfer.reclaim()
    }

    fn submit(
        &self,
        commands: &dyn DeviceCommandList,
        wait_semaphores: &[&dyn DeviceSemaphore],
        signal_semaphores: &[&dyn DeviceSemaphore],
        fence: &dyn DeviceFence,
    ) -> Result<()> {
        unsafe {
            let vk_commands = &*(commands as *const dyn DeviceCommandList as *const CommandList);
            let vk_fence = &*(fence as *const dyn DeviceFence as *const Fence);

            let to_vk = |semaphore: &&dyn DeviceSemaphore| {
                (*(*semaphore as *const dyn DeviceSemaphore as *const Semaphore)).semaphore
            };
            let waits: Vec<vk::Semaphore> = wait_semaphores.iter().map(to_vk).collect();
            let signals: Vec<vk::Semaphore> = signal_semaphores.iter().map(to_vk).collect();
            let wait_stages = vec![vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT; waits.len()];
            let command_buffers = [vk_commands.command_buffer];

            let submit_info = vk::SubmitInfo::default()
                .wait_semaphores(&waits)
                .wait_dst_stage_mask(&wait_stages)
                .command_buffers(&command_buffers)
                .signal_semaphores(&signals);

            let _queue = self.ctx.queue_lock.lock().unwrap();
            self.ctx.device
                .queue_submit(self.ctx.graphics_queue.queue, &[submit_info], vk_fence.fence)
                .map_err(|e| engine_err!("railguard::vulkan", "Failed to submit commands to GPU queue: {:?}", e))
        }
    }

    fn wait_idle(&self) -> Result<()> {
        unsafe {
            self.ctx.device
                .device_wait_idle()
                .map_err(|e| engine_err!("railguard::vulkan", "Failed to wait idle: {:?}", e))
        }
    }
}

impl Drop for VulkanGraphicsDevice {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.device_wait_idle().ok();

            // 1. Pending uploads and transfer command pools
            self.transfer.shutdown();

            // 2. Samplers and descriptor set layouts
            self.ctx.destroy_caches();

            // 3. Free the allocator's memory blocks while the device is alive
            drop(self.ctx.allocator.lock().unwrap().take());

            // 4. No callbacks during destruction
            crate::debug::cleanup_debug_config();

            if let (Some(debug_utils), Some(messenger)) =
                (&self.ctx.debug_utils_loader, &self.ctx.debug_messenger)
            {
                debug_utils.destroy_debug_utils_messenger(*messenger, None);
            }

            // 5. Destroy device and instance
            self.ctx.device.destroy_device(None);
            self.ctx.instance.destroy_instance(None);
        }
    }
}

#[cfg(test)]
#[path = "vulkan_tests.rs"]
mod tests;
