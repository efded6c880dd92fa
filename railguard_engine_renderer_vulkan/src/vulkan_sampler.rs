/// SamplerCache - one VkSampler per filter mode
///
/// Creates one VkSampler per filter mode on first use. Sampled textures and
/// attachments share them.

use ash::vk;
use railguard_engine::railguard::render::FilterMode;
use railguard_engine::railguard::Result;
use railguard_engine::engine_err;
use rustc_hash::FxHashMap;

/// Creates a VkSampler on first use, destroys them on shutdown or drop
pub(crate) struct SamplerCache {
    device: Option<ash::Device>,
    /// Anisotropy level for linear filtering; `None` when the device lacks the feature
    max_anisotropy: Option<f32>,
    cache: FxHashMap<FilterMode, vk::Sampler>,
}

impl SamplerCache {
    pub(crate) fn new(device: ash::Device, max_anisotropy: Option<f32>) -> Self {
        Self {
            device: Some(device),
            max_anisotropy,
            cache: FxHashMap::default(),
        }
    }

    /// Get or create the VkSampler for a filter mode
    pub(crate) fn get(&mut self, filter: FilterMode) -> Result<vk::Sampler> {
        if let Some(&sampler) = self.cache.get(&filter) {
            return Ok(sampler);
        }

        let device = self.device.as_ref().ok_or_else(|| {
            engine_err!("railguard::vulkan", "Sampler requested after the device was destroyed")
        })?;
        let sampler = Self::create_vk_sampler(device, filter, self.max_anisotropy)?;
        self.cache.insert(filter, sampler);
        Ok(sampler)
    }

    /// Destroy all cached VkSamplers.
    /// Must be called during VulkanGraphicsDevice::drop() while the device is still alive.
    pub(crate) fn shutdown(&mut self) {
        if let Some(device) = self.device.take() {
            for (_, sampler) in self.cache.drain() {
                unsafe { device.destroy_sampler(sampler, None); }
            }
        }
    }

    fn create_vk_sampler(
        device: &ash::Device,
        filter: FilterMode,
        max_anisotropy: Option<f32>,
    ) -> Result<vk::Sampler> {
        let (vk_filter, mipmap, anisotropy) = match filter {
            FilterMode::LINEAR => (vk::Filter::LINEAR, vk::SamplerMipmapMode::LINEAR, max_anisotropy),
            FilterMode::NEAREST => (vk::Filter::NEAREST, vk::SamplerMipmapMode::NEAREST, None),
        };

        let mut create_info = vk::SamplerCreateInfo::default()
            .mag_filter(vk_filter)
            .min_filter(vk_filter)
            .mipmap_mode(mipmap)
            .address_mode_u(vk::SamplerAddressMode::REPEAT)
            .address_mode_v(vk::SamplerAddressMode::REPEAT)
            .address_mode_w(vk::SamplerAddressMode::REPEAT)
            .mip_lod_bias(0.0)
            .min_lod(0.0)
            .max_lod(vk::LOD_CLAMP_NONE)
            .border_color(vk::BorderColor::FLOAT_OPAQUE_BLACK)
            .compare_enable(false)
            .compare_op(vk::CompareOp::ALWAYS)
            .unnormalized_coordinates(false);

        if let Some(max_aniso) = anisotropy {
            create_info = create_info
                .anisotropy_enable(true)
                .max_anisotropy(max_aniso);
        } else {
            create_info = create_info
                .anisotropy_enable(false)
                .max_anisotropy(1.0);
        }

        unsafe {
            device.create_sampler(&create_info, None)
                .map_err(|e| engine_err!("railguard::vulkan", "Failed to create {:?} sampler: {:?}", filter, e))
        }
    }
}

impl Drop for SamplerCache {
    fn drop(&mut self) {
        // Fallback when shutdown() was not called
        self.shutdown();
    }
}
