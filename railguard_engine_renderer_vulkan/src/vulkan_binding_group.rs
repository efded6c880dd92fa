/// BindingGroup and DescriptorPool - Vulkan implementations of the device binding traits

use railguard_engine::railguard::device::{
    BindingGroup as DeviceBindingGroup, BindingGroupLayout, BindingResource,
    Buffer as DeviceBuffer, DescriptorPool as DeviceDescriptorPool, DescriptorPoolDesc,
    Texture as DeviceTexture,
};
use railguard_engine::railguard::render::ShaderStage;
use railguard_engine::railguard::Result;
use railguard_engine::{engine_bail, engine_err, engine_info};
use ash::vk;
use std::sync::Arc;

use crate::vulkan_buffer::Buffer;
use crate::vulkan_context::GpuContext;
use crate::vulkan_format::shader_stage_to_vk;
use crate::vulkan_texture::Texture;

/// Vulkan binding group implementation
///
/// Wraps a VkDescriptorSet handle. The set is owned by its pool and is
/// reclaimed when the pool is reset or destroyed.
pub struct BindingGroup {
    /// Vulkan descriptor set handle
    pub(crate) descriptor_set: vk::DescriptorSet,
    /// Set index this binding group was created for
    pub(crate) set_index: u32,
}

impl DeviceBindingGroup for BindingGroup {
    fn set_index(&self) -> u32 {
        self.set_index
    }
}

/// Descriptor type and stages of every binding of a set layout
pub(crate) fn layout_bindings(layout: &BindingGroupLayout) -> Vec<vk::DescriptorSetLayoutBinding<'static>> {
    let binding = |index: u32, ty: vk::DescriptorType, stages: ShaderStage| {
        vk::DescriptorSetLayoutBinding::default()
            .binding(index)
            .descriptor_type(ty)
            .descriptor_count(1)
            .stage_flags(shader_stage_to_vk(stages))
    };

    match layout {
        BindingGroupLayout::Camera => {
            vec![binding(0, vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC, ShaderStage::VERTEX)]
        }
        BindingGroupLayout::Objects => {
            vec![binding(0, vk::DescriptorType::STORAGE_BUFFER, ShaderStage::VERTEX)]
        }
        BindingGroupLayout::Textures(textures) => textures
            .iter()
            .enumerate()
            .map(|(index, texture)| {
                binding(index as u32, vk::DescriptorType::COMBINED_IMAGE_SAMPLER, texture.stages)
            })
            .collect(),
    }
}

pub(crate) fn create_set_layout(
    device: &ash::Device,
    layout: &BindingGroupLayout,
) -> Result<vk::DescriptorSetLayout> {
    let bindings = layout_bindings(layout);
    let create_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&bindings);

    unsafe { device.create_descriptor_set_layout(&create_info, None) }
        .map_err(|e| engine_err!("railguard::vulkan",
            "Failed to create descriptor set layout for set {}: {:?}", layout.set_index(), e))
}

/// Check that `resources` match the bindings of `layout`, in order
pub(crate) fn validate_resources(layout: &BindingGroupLayout, resources: &[BindingResource]) -> Result<()> {
    if resources.len() != layout.binding_count() {
        engine_bail!("railguard::vulkan",
            "Binding group for set {} expects {} resources, got {}",
            layout.set_index(), layout.binding_count(), resources.len());
    }

    for (index, resource) in resources.iter().enumerate() {
        let matches = matches!(
            (layout, resource),
            (BindingGroupLayout::Camera, BindingResource::UniformBuffer { .. })
                | (BindingGroupLayout::Objects, BindingResource::StorageBuffer(_))
                | (BindingGroupLayout::Textures(_), BindingResource::SampledTexture(_))
        );
        if !matches {
            engine_bail!("railguard::vulkan",
                "Resource {} does not match the layout of set {}", index, layout.set_index());
        }
    }
    Ok(())
}

/// Pool sizes of a descriptor pool; descriptor types with a zero count are left out
pub(crate) fn pool_sizes(desc: &DescriptorPoolDesc) -> Vec<vk::DescriptorPoolSize> {
    [
        (vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC, desc.uniform_buffers),
        (vk::DescriptorType::STORAGE_BUFFER, desc.storage_buffers),
        (vk::DescriptorType::COMBINED_IMAGE_SAMPLER, desc.sampled_textures),
    ]
    .into_iter()
    .filter(|&(_, count)| count > 0)
    .map(|(ty, descriptor_count)| vk::DescriptorPoolSize { ty, descriptor_count })
    .collect()
}

/// Vulkan descriptor pool implementation
///
/// A growable pool chains new VkDescriptorPools of the same size when the
/// current one is exhausted.
pub struct DescriptorPool {
    ctx: Arc<GpuContext>,
    desc: DescriptorPoolDesc,
    pools: Vec<vk::DescriptorPool>,
}

impl DescriptorPool {
    pub(crate) fn create(ctx: Arc<GpuContext>, desc: &DescriptorPoolDesc) -> Result<Self> {
        if desc.max_sets == 0 {
            engine_bail!("railguard::vulkan", "Descriptor pool needs at least one set");
        }
        let pool = Self::create_vk_pool(&ctx.device, desc)?;
        Ok(Self {
            ctx,
            desc: *desc,
            pools: vec![pool],
        })
    }

    fn create_vk_pool(device: &ash::Device, desc: &DescriptorPoolDesc) -> Result<vk::DescriptorPool> {
        let sizes = pool_sizes(desc);
        let info = vk::DescriptorPoolCreateInfo::default()
            .pool_sizes(&sizes)
            .max_sets(desc.max_sets);

        unsafe { device.create_descriptor_pool(&info, None) }
            .map_err(|e| engine_err!("railguard::vulkan", "Failed to create descriptor pool: {:?}", e))
    }

    fn allocate_set(&mut self, set_layout: vk::DescriptorSetLayout) -> Result<vk::DescriptorSet> {
        let layouts = [set_layout];
        // `pools` is never empty: `create` pushes the first pool
        let current_pool = self.pools[self.pools.len() - 1];
        let allocate_info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(current_pool)
            .set_layouts(&layouts);

        match unsafe { self.ctx.device.allocate_descriptor_sets(&allocate_info) } {
            Ok(sets) => Ok(sets[0]),
            Err(vk::Result::ERROR_OUT_OF_POOL_MEMORY | vk::Result::ERROR_FRAGMENTED_POOL)
                if self.desc.growable =>
            {
                let new_pool = Self::create_vk_pool(&self.ctx.device, &self.desc)?;
                self.pools.push(new_pool);
                engine_info!("railguard::vulkan",
                    "Descriptor pool exhausted, created new pool (total: {})", self.pools.len());

                let retry_info = vk::DescriptorSetAllocateInfo::default()
                    .descriptor_pool(new_pool)
                    .set_layouts(&layouts);
                let sets = unsafe { self.ctx.device.allocate_descriptor_sets(&retry_info) }
                    .map_err(|e| engine_err!("railguard::vulkan",
                        "Failed to allocate descriptor set after pool growth: {:?}", e))?;
                Ok(sets[0])
            }
            Err(e) => Err(engine_err!("railguard::vulkan", "Failed to allocate descriptor set: {:?}", e)),
        }
    }
}

impl DeviceDescriptorPool for DescriptorPool {
    fn allocate(
        &mut self,
        layout: &BindingGroupLayout,
        resources: &[BindingResource],
    ) -> Result<Arc<dyn DeviceBindingGroup>> {
        validate_resources(layout, resources)?;

        let set_layout = self.ctx.set_layout(layout)?;
        let descriptor_set = self.allocate_set(set_layout)?;

        // Infos are collected first so the writes can borrow them
        let mut buffer_infos: Vec<vk::DescriptorBufferInfo> = Vec::new();
        let mut image_infos: Vec<vk::DescriptorImageInfo> = Vec::new();

        unsafe {
            for resource in resources {
                match resource {
                    BindingResource::UniformBuffer { buffer, range } => {
                        let vk_buffer = &*(*buffer as *const dyn DeviceBuffer as *const Buffer);
                        buffer_infos.push(
                            vk::DescriptorBufferInfo::default()
                                .buffer(vk_buffer.buffer)
                                .offset(0)
                                .range(*range),
                        );
                    }
                    BindingResource::StorageBuffer(buffer) => {
                        let vk_buffer = &*(*buffer as *const dyn DeviceBuffer as *const Buffer);
                        buffer_infos.push(
                            vk::DescriptorBufferInfo::default()
                                .buffer(vk_buffer.buffer)
                                .offset(0)
                                .range(vk::WHOLE_SIZE),
                        );
                    }
                    BindingResource::SampledTexture(texture) => {
                        let vk_texture = &*(*texture as *const dyn DeviceTexture as *const Texture);
                        if vk_texture.sampler == vk::Sampler::null() {
                            engine_bail!("railguard::vulkan", "Swapchain images cannot be sampled");
                        }
                        image_infos.push(
                            vk::DescriptorImageInfo::default()
                                .image_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
                                .image_view(vk_texture.view)
                                .sampler(vk_texture.sampler),
                        );
                    }
                }
            }

            let mut writes: Vec<vk::WriteDescriptorSet> = Vec::with_capacity(resources.len());
            let mut buffer_idx = 0usize;
            let mut image_idx = 0usize;

            for (binding_index, resource) in resources.iter().enumerate() {
                let write = vk::WriteDescriptorSet::default()
                    .dst_set(descriptor_set)
                    .dst_binding(binding_index as u32)
                    .dst_array_element(0);
                let write = match resource {
                    BindingResource::UniformBuffer { .. } => {
                        buffer_idx += 1;
                        write
                            .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC)
                            .buffer_info(std::slice::from_ref(&buffer_infos[buffer_idx - 1]))
                    }
                    BindingResource::StorageBuffer(_) => {
                        buffer_idx += 1;
                        write
                            .descriptor_type(vk::DescriptorType::STORAGE_BUFFER)
                            .buffer_info(std::slice::from_ref(&buffer_infos[buffer_idx - 1]))
                    }
                    BindingResource::SampledTexture(_) => {
                        image_idx += 1;
                        write
                            .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                            .image_info(std::slice::from_ref(&image_infos[image_idx - 1]))
                    }
                };
                writes.push(write);
            }

            self.ctx.device.update_descriptor_sets(&writes, &[]);
        }

        Ok(Arc::new(BindingGroup {
            descriptor_set,
            set_index: layout.set_index(),
        }))
    }

    fn reset(&mut self) -> Result<()> {
        for &pool in &self.pools {
            unsafe {
                self.ctx.device
                    .reset_descriptor_pool(pool, vk::DescriptorPoolResetFlags::empty())
                    .map_err(|e| engine_err!("railguard::vulkan", "Failed to reset descriptor pool: {:?}", e))?;
            }
        }
        Ok(())
    }
}

impl Drop for DescriptorPool {
    fn drop(&mut self) {
        unsafe {
            for &pool in &self.pools {
                self.ctx.device.destroy_descriptor_pool(pool, None);
            }
        }
    }
}

#[cfg(test)]
#[path = "vulkan_binding_group_tests.rs"]
mod tests;
