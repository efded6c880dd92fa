/// GraphicsDevice trait - factory and queue interface of a backend

use std::sync::Arc;
use crate::error::Result;
use crate::graphics_device::{
    AttachmentDesc, Buffer, BufferDesc, CommandList, DescriptorPool,
    DescriptorPoolDesc, Fence, Framebuffer, FramebufferDesc, Pipeline, PipelineDesc,
    PipelineLayout, RenderPass, RenderPassDesc, Semaphore, ShaderModule, Swapchain, Texture,
    TextureDesc,
};
use crate::render::{ShaderStage, TextureLayout};
use crate::window::{Extent2D, RenderWindow};

/// Device properties the renderer lays its buffers out with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceLimits {
    pub min_uniform_buffer_offset_alignment: u64,
}

/// Graphics device
///
/// Owns the GPU connection (instance, device, queues, allocator) and creates
/// every GPU resource the renderer uses. Implemented by backend crates (e.g.
/// the Vulkan backend). Resources are released when their last handle drops;
/// the device must outlive all of them.
pub trait GraphicsDevice: Send + Sync {
    fn limits(&self) -> DeviceLimits;

    /// Create a shader module from SPIR-V bytes
    ///
    /// The module must expose a `main` entry point.
    fn create_shader_module(&self, code: &[u8], stage: ShaderStage) -> Result<Arc<dyn ShaderModule>>;

    /// Create a pipeline layout
    ///
    /// Set 0 is the camera (dynamic uniform buffer), set 1 the object data
    /// (storage buffer). Set 2 holds one combined image sampler per entry of
    /// `textures` and exists only if `textures` is non-empty.
    fn create_pipeline_layout(&self, textures: &[TextureLayout]) -> Result<Arc<dyn PipelineLayout>>;

    fn create_render_pass(&self, desc: &RenderPassDesc) -> Result<Arc<dyn RenderPass>>;

    fn create_pipeline(&self, desc: &PipelineDesc) -> Result<Arc<dyn Pipeline>>;

    fn create_buffer(&self, desc: &BufferDesc) -> Result<Arc<dyn Buffer>>;

    /// Create an image usable as a render pass attachment and sampled by later stages
    fn create_attachment(&self, desc: &AttachmentDesc) -> Result<Arc<dyn Texture>>;

    /// Create an empty sampled RGBA8 sRGB texture; fill it with [`upload_texture`](Self::upload_texture)
    fn create_texture(&self, desc: &TextureDesc) -> Result<Arc<dyn Texture>>;

    fn create_framebuffer(&self, desc: &FramebufferDesc) -> Result<Arc<dyn Framebuffer>>;

    /// Create a surface and a swapchain presenting to `window`
    fn create_swapchain(&self, window: &dyn RenderWindow, extent: Extent2D) -> Result<Box<dyn Swapchain>>;

    fn create_command_list(&self) -> Result<Box<dyn CommandList>>;

    fn create_fence(&self, signaled: bool) -> Result<Box<dyn Fence>>;

    fn create_semaphore(&self) -> Result<Arc<dyn Semaphore>>;

    fn create_descriptor_pool(&self, desc: &DescriptorPoolDesc) -> Result<Box<dyn DescriptorPool>>;

    /// Copy `data` into a device-local buffer through the transfer queue
    ///
    /// The copy is complete and visible to the graphics queue once the
    /// upload's fence signals; [`reclaim_transfers`](Self::reclaim_transfers)
    /// waits for it.
    fn upload_buffer(&self, dst: &Arc<dyn Buffer>, offset: u64, data: &[u8]) -> Result<()>;

    /// Copy tightly packed RGBA8 pixels into a texture through the transfer queue
    fn upload_texture(&self, dst: &Arc<dyn Texture>, pixels: &[u8]) -> Result<()>;

    /// Wait for every pending upload and free its staging resources
    fn reclaim_transfers(&self) -> Result<()>;

    /// Submit a recorded command list to the graphics queue
    fn submit(
        &self,
        commands: &dyn CommandList,
        wait_semaphores: &[&dyn Semaphore],
        signal_semaphores: &[&dyn Semaphore],
        fence: &dyn Fence,
    ) -> Result<()>;

    fn wait_idle(&self) -> Result<()>;
}
