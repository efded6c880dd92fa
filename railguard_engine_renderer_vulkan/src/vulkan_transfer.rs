/// Transfer queue uploads
///
/// Data is copied into a CPU-visible staging buffer, then copied to its
/// device-local destination by the transfer queue. When the transfer queue
/// belongs to its own family, ownership of the destination is released by the
/// transfer queue and acquired by the graphics queue, ordered by a semaphore.
/// Each upload ends with a fence; staging memory lives until
/// [`TransferQueue::reclaim`] has seen that fence signal.

use railguard_engine::railguard::device::Buffer as DeviceBuffer;
use railguard_engine::railguard::render::Format;
use railguard_engine::railguard::window::Extent2D;
use railguard_engine::railguard::Result;
use railguard_engine::{engine_bail, engine_debug, engine_err, engine_trace};
use ash::vk;
use std::sync::{Arc, Mutex};

use crate::vulkan_buffer::Buffer;
use crate::vulkan_context::GpuContext;
use crate::vulkan_texture::{color_subresource_range, Texture};

/// Queue family indices written into an ownership barrier
///
/// Within a single family no ownership transfer happens.
pub(crate) fn barrier_families(src_family: u32, dst_family: u32) -> (u32, u32) {
    if src_family == dst_family {
        (vk::QUEUE_FAMILY_IGNORED, vk::QUEUE_FAMILY_IGNORED)
    } else {
        (src_family, dst_family)
    }
}

/// Copy region of a tightly packed image at mip 0
pub(crate) fn image_copy_region(extent: Extent2D) -> vk::BufferImageCopy {
    vk::BufferImageCopy {
        buffer_offset: 0,
        buffer_row_length: 0,
        buffer_image_height: 0,
        image_subresource: vk::ImageSubresourceLayers {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            mip_level: 0,
            base_array_layer: 0,
            layer_count: 1,
        },
        image_offset: vk::Offset3D { x: 0, y: 0, z: 0 },
        image_extent: vk::Extent3D {
            width: extent.width,
            height: extent.height,
            depth: 1,
        },
    }
}

/// Destination of an upload
enum UploadTarget {
    Buffer { buffer: vk::Buffer, offset: u64, size: u64 },
    Image { image: vk::Image, extent: Extent2D },
}

/// Barrier that ends an upload on one queue (`release`) or begins use on another
enum OwnershipBarrier {
    Buffer(vk::BufferMemoryBarrier<'static>),
    Image(vk::ImageMemoryBarrier<'static>),
}

/// An upload whose fence has not been waited on yet
struct PendingUpload {
    fence: vk::Fence,
    semaphore: Option<vk::Semaphore>,
    command_buffers: Vec<(vk::CommandPool, vk::CommandBuffer)>,
    /// Freed once the fence has signaled
    _staging: Buffer,
}

struct TransferState {
    transfer_pool: vk::CommandPool,
    /// Graphics-family pool for ownership acquisition; only with a dedicated transfer family
    acquire_pool: vk::CommandPool,
    pending: Vec<PendingUpload>,
}

pub(crate) struct TransferQueue {
    ctx: Arc<GpuContext>,
    state: Mutex<TransferState>,
}

unsafe fn create_pool(device: &ash::Device, family: u32) -> Result<vk::CommandPool> {
    let info = vk::CommandPoolCreateInfo::default()
        .queue_family_index(family)
        .flags(vk::CommandPoolCreateFlags::TRANSIENT);
    device.create_command_pool(&info, None)
        .map_err(|e| engine_err!("railguard::vulkan::transfer", "Failed to create transfer command pool: {:?}", e))
}

unsafe fn begin_one_time(device: &ash::Device, pool: vk::CommandPool) -> Result<vk::CommandBuffer> {
    let allocate_info = vk::CommandBufferAllocateInfo::default()
        .command_pool(pool)
        .level(vk::CommandBufferLevel::PRIMARY)
        .command_buffer_count(1);
    let command_buffer = device.allocate_command_buffers(&allocate_info)
        .map_err(|e| engine_err!("railguard::vulkan::transfer", "Failed to allocate transfer command buffer: {:?}", e))?[0];

    let begin_info = vk::CommandBufferBeginInfo::default()
        .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
    if let Err(e) = device.begin_command_buffer(command_buffer, &begin_info) {
        device.free_command_buffers(pool, &[command_buffer]);
        engine_bail!("railguard::vulkan::transfer", "Failed to begin transfer command buffer: {:?}", e);
    }
    Ok(command_buffer)
}

impl TransferQueue {
    pub(crate) fn new(ctx: Arc<GpuContext>) -> Result<Self> {
        unsafe {
            let transfer_pool = create_pool(&ctx.device, ctx.transfer_queue.family)?;
            let acquire_pool = if ctx.has_dedicated_transfer() {
                match create_pool(&ctx.device, ctx.graphics_queue.family) {
                    Ok(pool) => pool,
                    Err(e) => {
                        ctx.device.destroy_command_pool(transfer_pool, None);
                        return Err(e);
                    }
                }
            } else {
                vk::CommandPool::null()
            };

            Ok(Self {
                ctx,
                state: Mutex::new(TransferState {
                    transfer_pool,
                    acquire_pool,
                    pending: Vec::new(),
                }),
            })
        }
    }

    /// Upload `data` at `offset` of a device-local buffer
    pub(crate) fn upload_buffer(&self, dst: &Buffer, offset: u64, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        if offset + data.len() as u64 > dst.size {
            engine_bail!("railguard::vulkan::transfer",
                "Upload out of bounds: offset {} + {} bytes > buffer size {}",
                offset, data.len(), dst.size);
        }

        self.upload(
            UploadTarget::Buffer { buffer: dst.buffer, offset, size: data.len() as u64 },
            data,
        )
    }

    /// Upload tightly packed RGBA8 pixels to a sampled texture
    pub(crate) fn upload_texture(&self, dst: &Texture, pixels: &[u8]) -> Result<()> {
        if dst.allocation.is_none() || dst.format != Format::R8G8B8A8_SRGB {
            engine_bail!("railguard::vulkan::transfer", "Only sampled RGBA8 textures accept pixel uploads");
        }
        let expected = dst.extent.width as u64 * dst.extent.height as u64 * 4;
        if pixels.len() as u64 != expected {
            engine_bail!("railguard::vulkan::transfer",
                "Texture upload size mismatch: {}x{} needs {} bytes, got {}",
                dst.extent.width, dst.extent.height, expected, pixels.len());
        }

        self.upload(UploadTarget::Image { image: dst.image, extent: dst.extent }, pixels)
    }

    fn upload(&self, target: UploadTarget, data: &[u8]) -> Result<()> {
        let ctx = &self.ctx;
        let staging = Buffer::create(
            Arc::clone(ctx),
            "staging",
            data.len() as u64,
            vk::BufferUsageFlags::TRANSFER_SRC,
            gpu_allocator::MemoryLocation::CpuToGpu,
        )?;
        staging.update(0, data)?;

        let mut state = self.state.lock().unwrap();
        let dedicated = ctx.has_dedicated_transfer();
        let (src_family, dst_family) = barrier_families(ctx.transfer_queue.family, ctx.graphics_queue.family);

        unsafe {
            let mut command_buffers = Vec::with_capacity(2);
            let transfer_cb = begin_one_time(&ctx.device, state.transfer_pool)?;
            command_buffers.push((state.transfer_pool, transfer_cb));

            let barrier = match &target {
                UploadTarget::Buffer { buffer, offset, size } => {
                    let region = vk::BufferCopy { src_offset: 0, dst_offset: *offset, size: *size };
                    ctx.device.cmd_copy_buffer(transfer_cb, staging.buffer, *buffer, &[region]);

                    OwnershipBarrier::Buffer(
                        vk::BufferMemoryBarrier::default()
                            .src_access_mask(vk::AccessFlags::TRANSFER_WRITE)
                            .dst_access_mask(vk::AccessFlags::MEMORY_READ)
                            .src_queue_family_index(src_family)
                            .dst_queue_family_index(dst_family)
                            .buffer(*buffer)
                            .offset(*offset)
                            .size(*size),
                    )
                }
                UploadTarget::Image { image, extent } => {
                    let to_transfer_dst = vk::ImageMemoryBarrier::default()
                        .old_layout(vk::ImageLayout::UNDEFINED)
                        .new_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
                        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                        .image(*image)
                        .subresource_range(color_subresource_range())
                        .src_access_mask(vk::AccessFlags::empty())
                        .dst_access_mask(vk::AccessFlags::TRANSFER_WRITE);
                    ctx.device.cmd_pipeline_barrier(
                        transfer_cb,
                        vk::PipelineStageFlags::TOP_OF_PIPE,
                        vk::PipelineStageFlags::TRANSFER,
                        vk::DependencyFlags::empty(),
                        &[], &[], &[to_transfer_dst],
                    );

                    ctx.device.cmd_copy_buffer_to_image(
                        transfer_cb,
                        staging.buffer,
                        *image,
                        vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                        &[image_copy_region(*extent)],
                    );

                    OwnershipBarrier::Image(
                        vk::ImageMemoryBarrier::default()
                            .old_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
                            .new_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
                            .src_queue_family_index(src_family)
                            .dst_queue_family_index(dst_family)
                            .image(*image)
                            .subresource_range(color_subresource_range())
                            .src_access_mask(vk::AccessFlags::TRANSFER_WRITE)
                            .dst_access_mask(vk::AccessFlags::SHADER_READ),
                    )
                }
            };

            // Release half: a dedicated transfer family has no access to the graphics stages
            let release_dst_stage = if dedicated {
                vk::PipelineStageFlags::BOTTOM_OF_PIPE
            } else {
                vk::PipelineStageFlags::ALL_COMMANDS
            };
            Self::record_barrier(&ctx.device, transfer_cb, &barrier, dedicated, true,
                vk::PipelineStageFlags::TRANSFER, release_dst_stage);

            let mut pending = PendingUpload {
                fence: vk::Fence::null(),
                semaphore: None,
                command_buffers,
                _staging: staging,
            };

            if let Err(e) = self.submit_upload(&mut state, &mut pending, transfer_cb, &barrier, dedicated) {
                Self::release_pending(&ctx.device, &pending);
                return Err(e);
            }

            state.pending.push(pending);
            engine_trace!("railguard::vulkan::transfer",
                "Upload of {} bytes submitted ({} pending)", data.len(), state.pending.len());
        }
        Ok(())
    }

    /// Record `barrier`; the acquire half clears the access mask of the release side
    unsafe fn record_barrier(
        device: &ash::Device,
        command_buffer: vk::CommandBuffer,
        barrier: &OwnershipBarrier,
        dedicated: bool,
        release: bool,
        src_stage: vk::PipelineStageFlags,
        dst_stage: vk::PipelineStageFlags,
    ) {
        match barrier {
            OwnershipBarrier::Buffer(b) => {
                let mut b = *b;
                if dedicated && release {
                    b.dst_access_mask = vk::AccessFlags::empty();
                } else if dedicated {
                    b.src_access_mask = vk::AccessFlags::empty();
                }
                device.cmd_pipeline_barrier(command_buffer, src_stage, dst_stage,
                    vk::DependencyFlags::empty(), &[], &[b], &[]);
            }
            OwnershipBarrier::Image(b) => {
                let mut b = *b;
                if dedicated && release {
                    b.dst_access_mask = vk::AccessFlags::empty();
                } else if dedicated {
                    b.src_access_mask = vk::AccessFlags::empty();
                }
                device.cmd_pipeline_barrier(command_buffer, src_stage, dst_stage,
                    vk::DependencyFlags::empty(), &[], &[], &[b]);
            }
        }
    }

    unsafe fn submit_upload(
        &self,
        state: &mut TransferState,
        pending: &mut PendingUpload,
        transfer_cb: vk::CommandBuffer,
        barrier: &OwnershipBarrier,
        dedicated: bool,
    ) -> Result<()> {
        let ctx = &self.ctx;
        let device = &ctx.device;

        device.end_command_buffer(transfer_cb)
            .map_err(|e| engine_err!("railguard::vulkan::transfer", "Failed to end transfer command buffer: {:?}", e))?;

        pending.fence = device.create_fence(&vk::FenceCreateInfo::default(), None)
            .map_err(|e| engine_err!("railguard::vulkan::transfer", "Failed to create upload fence: {:?}", e))?;

        let transfer_cbs = [transfer_cb];

        if !dedicated {
            let submit = vk::SubmitInfo::default().command_buffers(&transfer_cbs);
            let _queue = ctx.queue_lock.lock().unwrap();
            return device.queue_submit(ctx.transfer_queue.queue, &[submit], pending.fence)
                .map_err(|e| engine_err!("railguard::vulkan::transfer", "Failed to submit upload: {:?}", e));
        }

        let semaphore = device.create_semaphore(&vk::SemaphoreCreateInfo::default(), None)
            .map_err(|e| engine_err!("railguard::vulkan::transfer", "Failed to create upload semaphore: {:?}", e))?;
        pending.semaphore = Some(semaphore);

        let acquire_cb = begin_one_time(device, state.acquire_pool)?;
        pending.command_buffers.push((state.acquire_pool, acquire_cb));
        Self::record_barrier(device, acquire_cb, barrier, dedicated, false,
            vk::PipelineStageFlags::TOP_OF_PIPE, vk::PipelineStageFlags::ALL_COMMANDS);
        device.end_command_buffer(acquire_cb)
            .map_err(|e| engine_err!("railguard::vulkan::transfer", "Failed to end acquire command buffer: {:?}", e))?;

        let semaphores = [semaphore];
        let wait_stages = [vk::PipelineStageFlags::ALL_COMMANDS];
        let acquire_cbs = [acquire_cb];
        let release_submit = vk::SubmitInfo::default()
            .command_buffers(&transfer_cbs)
            .signal_semaphores(&semaphores);
        let acquire_submit = vk::SubmitInfo::default()
            .wait_semaphores(&semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&acquire_cbs);

        let _queue = ctx.queue_lock.lock().unwrap();
        device.queue_submit(ctx.transfer_queue.queue, &[release_submit], vk::Fence::null())
            .map_err(|e| engine_err!("railguard::vulkan::transfer", "Failed to submit upload: {:?}", e))?;
        device.queue_submit(ctx.graphics_queue.queue, &[acquire_submit], pending.fence)
            .map_err(|e| engine_err!("railguard::vulkan::transfer", "Failed to submit ownership acquisition: {:?}", e))
    }

    unsafe fn release_pending(device: &ash::Device, pending: &PendingUpload) {
        for &(pool, command_buffer) in &pending.command_buffers {
            device.free_command_buffers(pool, &[command_buffer]);
        }
        if let Some(semaphore) = pending.semaphore {
            device.destroy_semaphore(semaphore, None);
        }
        if pending.fence != vk::Fence::null() {
            device.destroy_fence(pending.fence, None);
        }
    }

    /// Wait for every pending upload and free its staging resources
    pub(crate) fn reclaim(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.pending.is_empty() {
            return Ok(());
        }

        let fences: Vec<vk::Fence> = state.pending.iter().map(|p| p.fence).collect();
        unsafe {
            self.ctx.device.wait_for_fences(&fences, true, u64::MAX)
                .map_err(|e| engine_err!("railguard::vulkan::transfer", "Failed to wait for uploads: {:?}", e))?;

            for pending in state.pending.drain(..) {
                Self::release_pending(&self.ctx.device, &pending);
            }
        }

        engine_debug!("railguard::vulkan::transfer", "Reclaimed {} uploads", fences.len());
        Ok(())
    }

    /// Reclaim outstanding uploads and destroy the command pools
    pub(crate) fn shutdown(&self) {
        self.reclaim().ok();

        let mut state = self.state.lock().unwrap();
        unsafe {
            if state.transfer_pool != vk::CommandPool::null() {
                self.ctx.device.destroy_command_pool(state.transfer_pool, None);
                state.transfer_pool = vk::CommandPool::null();
            }
            if state.acquire_pool != vk::CommandPool::null() {
                self.ctx.device.destroy_command_pool(state.acquire_pool, None);
                state.acquire_pool = vk::CommandPool::null();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_barrier_families_same_family_ignored() {
        assert_eq!(
            barrier_families(0, 0),
            (vk::QUEUE_FAMILY_IGNORED, vk::QUEUE_FAMILY_IGNORED)
        );
    }

    #[test]
    fn test_barrier_families_dedicated_transfer() {
        assert_eq!(barrier_families(2, 0), (2, 0));
    }

    #[test]
    fn test_image_copy_region_covers_extent() {
        let region = image_copy_region(Extent2D::new(64, 32));

        assert_eq!(region.buffer_offset, 0);
        assert_eq!(region.buffer_row_length, 0);
        assert_eq!(region.image_extent.width, 64);
        assert_eq!(region.image_extent.height, 32);
        assert_eq!(region.image_extent.depth, 1);
        assert_eq!(region.image_subresource.aspect_mask, vk::ImageAspectFlags::COLOR);
    }
}
