/// Mock GraphicsDevice for unit tests (no GPU required)
///
/// Every mock object shares one [`MockLog`] with the device that created it,
/// so tests can inspect what the renderer created, recorded and submitted.

#[cfg(test)]
use std::sync::{Arc, Mutex};
#[cfg(test)]
use crate::graphics_device::{
    AcquiredImage, AttachmentDesc, BindingGroup, BindingGroupLayout, BindingResource, Buffer,
    BufferDesc, BufferUsage, ClearValue, CommandList, DescriptorPool, DescriptorPoolDesc,
    DeviceLimits, Fence, Framebuffer, FramebufferDesc, GraphicsDevice, IndexType, Pipeline,
    PipelineDesc, PipelineLayout, PresentStatus, RenderPass, RenderPassDesc, Semaphore,
    ShaderModule, Swapchain, Texture, TextureDesc,
};
#[cfg(test)]
use crate::error::Result;
#[cfg(test)]
use crate::engine_bail;
#[cfg(test)]
use crate::render::{Format, ShaderStage, TextureLayout};
#[cfg(test)]
use crate::window::{Extent2D, RenderWindow};

// ============================================================================
// Shared log
// ============================================================================

/// Commands recorded into mock command lists, plus queue operations
#[cfg(test)]
#[derive(Debug, Clone, PartialEq)]
pub enum MockCommand {
    Begin,
    End,
    BeginRenderPass { extent: Extent2D, clear_values: Vec<ClearValue> },
    EndRenderPass,
    /// Address of the bound pipeline
    BindPipeline(usize),
    BindBindingGroup { set_index: u32, dynamic_offsets: Vec<u32> },
    BindVertexBuffer,
    BindIndexBuffer,
    Draw { vertex_count: u32 },
    DrawIndexedIndirect { offset: u64, draw_count: u32, stride: u32 },
    Acquire(u32),
    /// Host write into a buffer through `Buffer::update`
    BufferUpdate { usage: BufferUsage, offset: u64 },
    FenceWait,
    Submit,
    Present(u32),
}

#[cfg(test)]
#[derive(Default)]
pub struct MockLog {
    pub commands: Vec<MockCommand>,
    pub buffers: Vec<Arc<MockBuffer>>,
    pub shader_modules_created: usize,
    pub pipeline_layouts_created: usize,
    pub pipelines_created: usize,
    pub render_passes: Vec<RenderPassDesc>,
    pub framebuffers: Vec<Extent2D>,
    pub attachments: Vec<AttachmentDesc>,
    pub textures: Vec<TextureDesc>,
    pub swapchains_created: usize,
    pub swapchain_recreates: Vec<Extent2D>,
    pub binding_groups: Vec<BindingGroupLayout>,
    pub descriptor_pools: Vec<DescriptorPoolDesc>,
    pub pool_resets: usize,
    /// (offset, byte count) of every buffer upload
    pub buffer_uploads: Vec<(u64, usize)>,
    pub texture_uploads: usize,
    pub reclaims: usize,
    pub fence_waits: usize,
    pub fence_resets: usize,
    pub submits: usize,
    pub presents: usize,
    pub wait_idles: usize,
    /// Report the next acquisitions and presentations as suboptimal
    pub suboptimal: bool,
    /// Image count of swapchains recreated from now on
    pub recreate_image_count: Option<usize>,
}

#[cfg(test)]
impl MockLog {
    pub fn count(&self, predicate: impl Fn(&MockCommand) -> bool) -> usize {
        self.commands.iter().filter(|c| predicate(c)).count()
    }

    pub fn buffers_with_usage(&self, usage: BufferUsage) -> Vec<Arc<MockBuffer>> {
        self.buffers.iter().filter(|b| b.desc.usage == usage).cloned().collect()
    }
}

#[cfg(test)]
fn address<T: ?Sized>(arc: &Arc<T>) -> usize {
    Arc::as_ptr(arc) as *const () as usize
}

// ============================================================================
// Mock resources
// ============================================================================

#[cfg(test)]
pub struct MockBuffer {
    pub desc: BufferDesc,
    pub data: Mutex<Vec<u8>>,
    log: Option<Arc<Mutex<MockLog>>>,
}

#[cfg(test)]
impl MockBuffer {
    pub fn new(desc: BufferDesc) -> Self {
        Self { desc, data: Mutex::new(vec![0; desc.size as usize]), log: None }
    }

    fn with_log(desc: BufferDesc, log: Arc<Mutex<MockLog>>) -> Self {
        Self { log: Some(log), ..Self::new(desc) }
    }

    fn write(&self, offset: u64, bytes: &[u8]) -> Result<()> {
        let end = offset as usize + bytes.len();
        if end as u64 > self.desc.size {
            engine_bail!("railguard::mock", "Write of {} bytes at {} overflows buffer of {} bytes",
                bytes.len(), offset, self.desc.size);
        }
        self.data.lock().unwrap()[offset as usize..end].copy_from_slice(bytes);
        Ok(())
    }

    /// Read back the buffer content as `T` records
    pub fn read<T: bytemuck::Pod>(&self) -> Vec<T> {
        let data = self.data.lock().unwrap();
        let count = data.len() / std::mem::size_of::<T>();
        bytemuck::pod_collect_to_vec(&data[..count * std::mem::size_of::<T>()])
    }
}

#[cfg(test)]
impl Buffer for MockBuffer {
    fn update(&self, offset: u64, data: &[u8]) -> Result<()> {
        self.write(offset, data)?;
        if let Some(log) = &self.log {
            log.lock().unwrap().commands.push(MockCommand::BufferUpdate { usage: self.desc.usage, offset });
        }
        Ok(())
    }

    fn size(&self) -> u64 {
        self.desc.size
    }
}

#[cfg(test)]
pub struct MockTexture {
    pub extent: Extent2D,
    pub format: Format,
}

#[cfg(test)]
impl Texture for MockTexture {
    fn extent(&self) -> Extent2D {
        self.extent
    }

    fn format(&self) -> Format {
        self.format
    }
}

#[cfg(test)]
pub struct MockShaderModule {
    pub stage: ShaderStage,
}

#[cfg(test)]
impl ShaderModule for MockShaderModule {
    fn stage(&self) -> ShaderStage {
        self.stage
    }
}

#[cfg(test)]
pub struct MockPipelineLayout {
    pub textures: Vec<TextureLayout>,
}

#[cfg(test)]
impl PipelineLayout for MockPipelineLayout {
    fn texture_count(&self) -> usize {
        self.textures.len()
    }
}

#[cfg(test)]
pub struct MockPipeline {
    pub extent: Extent2D,
    pub color_attachment_count: u32,
    pub depth_test: bool,
    pub vertex_input: bool,
}

#[cfg(test)]
impl Pipeline for MockPipeline {}

#[cfg(test)]
pub struct MockRenderPass {
    pub desc: RenderPassDesc,
}

#[cfg(test)]
impl RenderPass for MockRenderPass {}

#[cfg(test)]
pub struct MockFramebuffer {
    pub extent: Extent2D,
}

#[cfg(test)]
impl Framebuffer for MockFramebuffer {
    fn extent(&self) -> Extent2D {
        self.extent
    }
}

#[cfg(test)]
pub struct MockSemaphore;

#[cfg(test)]
impl Semaphore for MockSemaphore {}

#[cfg(test)]
pub struct MockFence {
    log: Arc<Mutex<MockLog>>,
}

#[cfg(test)]
impl Fence for MockFence {
    fn wait(&self, _timeout_ns: u64) -> Result<()> {
        let mut log = self.log.lock().unwrap();
        log.commands.push(MockCommand::FenceWait);
        log.fence_waits += 1;
        Ok(())
    }

    fn reset(&self) -> Result<()> {
        self.log.lock().unwrap().fence_resets += 1;
        Ok(())
    }
}

#[cfg(test)]
pub struct MockBindingGroup {
    pub layout: BindingGroupLayout,
}

#[cfg(test)]
impl BindingGroup for MockBindingGroup {
    fn set_index(&self) -> u32 {
        self.layout.set_index()
    }
}

#[cfg(test)]
pub struct MockDescriptorPool {
    log: Arc<Mutex<MockLog>>,
}

#[cfg(test)]
impl DescriptorPool for MockDescriptorPool {
    fn allocate(
        &mut self,
        layout: &BindingGroupLayout,
        resources: &[BindingResource],
    ) -> Result<Arc<dyn BindingGroup>> {
        if resources.len() != layout.binding_count() {
            engine_bail!("railguard::mock", "Layout {:?} expects {} resources, got {}",
                layout, layout.binding_count(), resources.len());
        }
        self.log.lock().unwrap().binding_groups.push(layout.clone());
        Ok(Arc::new(MockBindingGroup { layout: layout.clone() }))
    }

    fn reset(&mut self) -> Result<()> {
        self.log.lock().unwrap().pool_resets += 1;
        Ok(())
    }
}

// ============================================================================
// Mock Swapchain
// ============================================================================

#[cfg(test)]
pub struct MockSwapchain {
    log: Arc<Mutex<MockLog>>,
    extent: Extent2D,
    images: Vec<Arc<dyn Texture>>,
    next_image: u32,
}

#[cfg(test)]
impl MockSwapchain {
    pub const FORMAT: Format = Format::B8G8R8A8_SRGB;

    fn images(extent: Extent2D, count: usize) -> Vec<Arc<dyn Texture>> {
        (0..count)
            .map(|_| Arc::new(MockTexture { extent, format: Self::FORMAT }) as Arc<dyn Texture>)
            .collect()
    }
}

#[cfg(test)]
impl Swapchain for MockSwapchain {
    fn acquire_next_image(&mut self, _signal: &dyn Semaphore, _timeout_ns: u64) -> Result<AcquiredImage> {
        let index = self.next_image;
        self.next_image = (self.next_image + 1) % self.images.len() as u32;
        let mut log = self.log.lock().unwrap();
        log.commands.push(MockCommand::Acquire(index));
        Ok(AcquiredImage { index, suboptimal: log.suboptimal })
    }

    fn present(&mut self, image_index: u32, _wait: &dyn Semaphore) -> Result<PresentStatus> {
        let mut log = self.log.lock().unwrap();
        log.commands.push(MockCommand::Present(image_index));
        log.presents += 1;
        Ok(if log.suboptimal { PresentStatus::Suboptimal } else { PresentStatus::Optimal })
    }

    fn recreate(&mut self, extent: Extent2D) -> Result<()> {
        let mut log = self.log.lock().unwrap();
        log.swapchain_recreates.push(extent);
        let count = log.recreate_image_count.unwrap_or(self.images.len());
        self.extent = extent;
        self.images = Self::images(extent, count);
        self.next_image = 0;
        Ok(())
    }

    fn image_count(&self) -> usize {
        self.images.len()
    }

    fn extent(&self) -> Extent2D {
        self.extent
    }

    fn format(&self) -> Format {
        Self::FORMAT
    }

    fn image(&self, index: usize) -> Option<Arc<dyn Texture>> {
        self.images.get(index).cloned()
    }
}

// ============================================================================
// Mock CommandList
// ============================================================================

#[cfg(test)]
pub struct MockCommandList {
    log: Arc<Mutex<MockLog>>,
}

#[cfg(test)]
impl MockCommandList {
    fn push(&self, command: MockCommand) -> Result<()> {
        self.log.lock().unwrap().commands.push(command);
        Ok(())
    }
}

#[cfg(test)]
impl CommandList for MockCommandList {
    fn begin(&mut self) -> Result<()> {
        self.push(MockCommand::Begin)
    }

    fn end(&mut self) -> Result<()> {
        self.push(MockCommand::End)
    }

    fn begin_render_pass(
        &mut self,
        _render_pass: &Arc<dyn RenderPass>,
        framebuffer: &Arc<dyn Framebuffer>,
        clear_values: &[ClearValue],
    ) -> Result<()> {
        self.push(MockCommand::BeginRenderPass {
            extent: framebuffer.extent(),
            clear_values: clear_values.to_vec(),
        })
    }

    fn end_render_pass(&mut self) -> Result<()> {
        self.push(MockCommand::EndRenderPass)
    }

    fn bind_pipeline(&mut self, pipeline: &Arc<dyn Pipeline>) -> Result<()> {
        self.push(MockCommand::BindPipeline(address(pipeline)))
    }

    fn bind_binding_group(
        &mut self,
        _layout: &Arc<dyn PipelineLayout>,
        set_index: u32,
        _binding_group: &Arc<dyn BindingGroup>,
        dynamic_offsets: &[u32],
    ) -> Result<()> {
        self.push(MockCommand::BindBindingGroup {
            set_index,
            dynamic_offsets: dynamic_offsets.to_vec(),
        })
    }

    fn bind_vertex_buffer(&mut self, _buffer: &Arc<dyn Buffer>, _offset: u64) -> Result<()> {
        self.push(MockCommand::BindVertexBuffer)
    }

    fn bind_index_buffer(&mut self, _buffer: &Arc<dyn Buffer>, _offset: u64, _index_type: IndexType) -> Result<()> {
        self.push(MockCommand::BindIndexBuffer)
    }

    fn draw(&mut self, vertex_count: u32, _first_vertex: u32) -> Result<()> {
        self.push(MockCommand::Draw { vertex_count })
    }

    fn draw_indexed_indirect(
        &mut self,
        _buffer: &Arc<dyn Buffer>,
        offset: u64,
        draw_count: u32,
        stride: u32,
    ) -> Result<()> {
        self.push(MockCommand::DrawIndexedIndirect { offset, draw_count, stride })
    }
}

// ============================================================================
// Mock GraphicsDevice
// ============================================================================

#[cfg(test)]
pub struct MockGraphicsDevice {
    pub log: Arc<Mutex<MockLog>>,
    pub limits: DeviceLimits,
    pub swapchain_image_count: usize,
}

#[cfg(test)]
impl MockGraphicsDevice {
    pub fn new() -> Self {
        Self {
            log: Arc::new(Mutex::new(MockLog::default())),
            limits: DeviceLimits { min_uniform_buffer_offset_alignment: 256 },
            swapchain_image_count: 3,
        }
    }
}

#[cfg(test)]
impl GraphicsDevice for MockGraphicsDevice {
    fn limits(&self) -> DeviceLimits {
        self.limits
    }

    fn create_shader_module(&self, code: &[u8], stage: ShaderStage) -> Result<Arc<dyn ShaderModule>> {
        if code.is_empty() || code.len() % 4 != 0 {
            engine_bail!("railguard::mock", "SPIR-V code size {} is not a multiple of 4", code.len());
        }
        self.log.lock().unwrap().shader_modules_created += 1;
        Ok(Arc::new(MockShaderModule { stage }))
    }

    fn create_pipeline_layout(&self, textures: &[TextureLayout]) -> Result<Arc<dyn PipelineLayout>> {
        self.log.lock().unwrap().pipeline_layouts_created += 1;
        Ok(Arc::new(MockPipelineLayout { textures: textures.to_vec() }))
    }

    fn create_render_pass(&self, desc: &RenderPassDesc) -> Result<Arc<dyn RenderPass>> {
        self.log.lock().unwrap().render_passes.push(desc.clone());
        Ok(Arc::new(MockRenderPass { desc: desc.clone() }))
    }

    fn create_pipeline(&self, desc: &PipelineDesc) -> Result<Arc<dyn Pipeline>> {
        if desc.shader_modules.is_empty() {
            engine_bail!("railguard::mock", "Pipeline without shader modules");
        }
        self.log.lock().unwrap().pipelines_created += 1;
        Ok(Arc::new(MockPipeline {
            extent: desc.extent,
            color_attachment_count: desc.color_attachment_count,
            depth_test: desc.depth_test,
            vertex_input: desc.vertex_input,
        }))
    }

    fn create_buffer(&self, desc: &BufferDesc) -> Result<Arc<dyn Buffer>> {
        if desc.size == 0 {
            engine_bail!("railguard::mock", "Buffer of size 0");
        }
        let buffer = Arc::new(MockBuffer::with_log(*desc, self.log.clone()));
        self.log.lock().unwrap().buffers.push(buffer.clone());
        Ok(buffer)
    }

    fn create_attachment(&self, desc: &AttachmentDesc) -> Result<Arc<dyn Texture>> {
        if desc.format == Format::WINDOW_FORMAT || desc.format == Format::UNDEFINED {
            engine_bail!("railguard::mock", "Attachment format {:?} is not concrete", desc.format);
        }
        self.log.lock().unwrap().attachments.push(*desc);
        Ok(Arc::new(MockTexture { extent: desc.extent, format: desc.format }))
    }

    fn create_texture(&self, desc: &TextureDesc) -> Result<Arc<dyn Texture>> {
        self.log.lock().unwrap().textures.push(*desc);
        Ok(Arc::new(MockTexture {
            extent: Extent2D::new(desc.width, desc.height),
            format: Format::R8G8B8A8_SRGB,
        }))
    }

    fn create_framebuffer(&self, desc: &FramebufferDesc) -> Result<Arc<dyn Framebuffer>> {
        if desc.attachments.iter().any(|a| a.extent() != desc.extent) {
            engine_bail!("railguard::mock", "Framebuffer attachment extent mismatch");
        }
        self.log.lock().unwrap().framebuffers.push(desc.extent);
        Ok(Arc::new(MockFramebuffer { extent: desc.extent }))
    }

    fn create_swapchain(&self, _window: &dyn RenderWindow, extent: Extent2D) -> Result<Box<dyn Swapchain>> {
        self.log.lock().unwrap().swapchains_created += 1;
        Ok(Box::new(MockSwapchain {
            log: self.log.clone(),
            extent,
            images: MockSwapchain::images(extent, self.swapchain_image_count),
            next_image: 0,
        }))
    }

    fn create_command_list(&self) -> Result<Box<dyn CommandList>> {
        Ok(Box::new(MockCommandList { log: self.log.clone() }))
    }

    fn create_fence(&self, _signaled: bool) -> Result<Box<dyn Fence>> {
        Ok(Box::new(MockFence { log: self.log.clone() }))
    }

    fn create_semaphore(&self) -> Result<Arc<dyn Semaphore>> {
        Ok(Arc::new(MockSemaphore))
    }

    fn create_descriptor_pool(&self, desc: &DescriptorPoolDesc) -> Result<Box<dyn DescriptorPool>> {
        self.log.lock().unwrap().descriptor_pools.push(*desc);
        Ok(Box::new(MockDescriptorPool { log: self.log.clone() }))
    }

    fn upload_buffer(&self, dst: &Arc<dyn Buffer>, offset: u64, data: &[u8]) -> Result<()> {
        let mut log = self.log.lock().unwrap();
        let target = address(dst);
        let buffer = match log.buffers.iter().find(|b| address(b) == target) {
            Some(buffer) => buffer.clone(),
            None => engine_bail!("railguard::mock", "Upload to a buffer this device did not create"),
        };
        buffer.write(offset, data)?;
        log.buffer_uploads.push((offset, data.len()));
        Ok(())
    }

    fn upload_texture(&self, dst: &Arc<dyn Texture>, pixels: &[u8]) -> Result<()> {
        let extent = dst.extent();
        if pixels.len() as u64 != extent.width as u64 * extent.height as u64 * 4 {
            engine_bail!("railguard::mock", "Pixel data does not match texture extent");
        }
        self.log.lock().unwrap().texture_uploads += 1;
        Ok(())
    }

    fn reclaim_transfers(&self) -> Result<()> {
        self.log.lock().unwrap().reclaims += 1;
        Ok(())
    }

    fn submit(
        &self,
        _commands: &dyn CommandList,
        _wait_semaphores: &[&dyn Semaphore],
        _signal_semaphores: &[&dyn Semaphore],
        _fence: &dyn Fence,
    ) -> Result<()> {
        let mut log = self.log.lock().unwrap();
        log.commands.push(MockCommand::Submit);
        log.submits += 1;
        Ok(())
    }

    fn wait_idle(&self) -> Result<()> {
        self.log.lock().unwrap().wait_idles += 1;
        Ok(())
    }
}

#[cfg(test)]
#[path = "mock_graphics_device_tests.rs"]
mod tests;
