/// GpuContext - Shared GPU state for all Vulkan objects
///
/// Contains everything a resource needs after creation:
/// - Device for Vulkan API calls
/// - Allocator for memory management
/// - Graphics and transfer queues
/// - Sampler and descriptor set layout caches

use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme, Allocator};
use gpu_allocator::MemoryLocation;
use railguard_engine::railguard::device::BindingGroupLayout;
use railguard_engine::railguard::render::FilterMode;
use railguard_engine::railguard::{Error, Result};
use railguard_engine::{engine_error, engine_trace};
use rustc_hash::FxHashMap;
use std::sync::Mutex;

use crate::vulkan_binding_group::create_set_layout;
use crate::vulkan_sampler::SamplerCache;

/// One device queue and the family it belongs to
#[derive(Debug, Clone, Copy)]
pub(crate) struct Queue {
    pub queue: vk::Queue,
    pub family: u32,
}

/// Shared GPU context for all Vulkan resources.
///
/// Shared (via `Arc`) by every GPU resource so that each one can release
/// itself on drop. Device and instance destruction is handled by
/// `VulkanGraphicsDevice::drop()`, which runs after the renderer released
/// its resources.
pub struct GpuContext {
    pub(crate) entry: ash::Entry,
    pub(crate) instance: ash::Instance,
    pub(crate) physical_device: vk::PhysicalDevice,
    pub(crate) device: ash::Device,

    /// GPU memory allocator; taken out before the device is destroyed
    pub(crate) allocator: Mutex<Option<Allocator>>,

    pub(crate) graphics_queue: Queue,
    /// Same as `graphics_queue` when the device has no dedicated transfer family
    pub(crate) transfer_queue: Queue,
    /// Queues are externally synchronized; every submit and present holds this lock
    pub(crate) queue_lock: Mutex<()>,

    pub(crate) surface_loader: ash::khr::surface::Instance,
    pub(crate) swapchain_loader: ash::khr::swapchain::Device,

    /// `multiDrawIndirect` device feature enabled
    pub(crate) multi_draw_indirect: bool,

    pub(crate) sampler_cache: Mutex<SamplerCache>,
    set_layouts: Mutex<FxHashMap<BindingGroupLayout, vk::DescriptorSetLayout>>,

    pub(crate) debug_utils_loader: Option<ash::ext::debug_utils::Instance>,
    pub(crate) debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
}

impl GpuContext {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        entry: ash::Entry,
        instance: ash::Instance,
        physical_device: vk::PhysicalDevice,
        device: ash::Device,
        allocator: Allocator,
        graphics_queue: Queue,
        transfer_queue: Queue,
        multi_draw_indirect: bool,
        max_anisotropy: Option<f32>,
        debug_utils_loader: Option<ash::ext::debug_utils::Instance>,
        debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
    ) -> Self {
        let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);
        let swapchain_loader = ash::khr::swapchain::Device::new(&instance, &device);
        let sampler_cache = SamplerCache::new(device.clone(), max_anisotropy);

        Self {
            entry,
            instance,
            physical_device,
            device,
            allocator: Mutex::new(Some(allocator)),
            graphics_queue,
            transfer_queue,
            queue_lock: Mutex::new(()),
            surface_loader,
            swapchain_loader,
            multi_draw_indirect,
            sampler_cache: Mutex::new(sampler_cache),
            set_layouts: Mutex::new(FxHashMap::default()),
            debug_utils_loader,
            debug_messenger,
        }
    }

    /// Whether uploads cross a queue family boundary
    pub(crate) fn has_dedicated_transfer(&self) -> bool {
        self.graphics_queue.family != self.transfer_queue.family
    }

    /// Allocate device memory for a resource
    pub(crate) fn allocate(
        &self,
        name: &str,
        requirements: vk::MemoryRequirements,
        location: MemoryLocation,
        linear: bool,
    ) -> Result<Allocation> {
        let mut guard = self.allocator.lock().unwrap();
        let allocator = guard
            .as_mut()
            .ok_or_else(|| Error::BackendError("GPU allocator already destroyed".to_string()))?;

        allocator
            .allocate(&AllocationCreateDesc {
                name,
                requirements,
                location,
                linear,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            })
            .map_err(|e| {
                let size_mb = requirements.size as f64 / (1024.0 * 1024.0);
                engine_error!("railguard::vulkan", "Out of GPU memory for {} ({:.2} MB): {:?}", name, size_mb, e);
                Error::OutOfMemory
            })
    }

    /// Return an allocation to the allocator; a no-op once the allocator is gone
    pub(crate) fn free(&self, allocation: Allocation) {
        // Don't panic if lock fails - the caller still needs to destroy its handle
        if let Ok(mut guard) = self.allocator.lock() {
            if let Some(allocator) = guard.as_mut() {
                allocator.free(allocation).ok();
            }
        }
    }

    pub(crate) fn sampler(&self, filter: FilterMode) -> Result<vk::Sampler> {
        self.sampler_cache.lock().unwrap().get(filter)
    }

    /// Descriptor set layout of a binding set, created on first use
    pub(crate) fn set_layout(&self, layout: &BindingGroupLayout) -> Result<vk::DescriptorSetLayout> {
        let mut cache = self.set_layouts.lock().unwrap();
        if let Some(&set_layout) = cache.get(layout) {
            return Ok(set_layout);
        }

        let set_layout = create_set_layout(&self.device, layout)?;
        cache.insert(layout.clone(), set_layout);
        engine_trace!("railguard::vulkan", "Descriptor set layout created for set {}", layout.set_index());
        Ok(set_layout)
    }

    /// Destroy every cached sampler and set layout (device must be idle)
    pub(crate) fn destroy_caches(&self) {
        self.sampler_cache.lock().unwrap().shutdown();
        let mut cache = self.set_layouts.lock().unwrap();
        for (_, set_layout) in cache.drain() {
            unsafe { self.device.destroy_descriptor_set_layout(set_layout, None); }
        }
    }
}
