/// CommandList trait - for recording rendering commands

use std::sync::Arc;
use crate::error::Result;
use crate::graphics_device::{
    BindingGroup, Buffer, Framebuffer, Pipeline, PipelineLayout, RenderPass,
};

/// Command list for recording rendering commands
///
/// Commands are recorded and later submitted to the GPU via GraphicsDevice::submit().
/// A list may be re-recorded once its previous submission has completed.
pub trait CommandList: Send + Sync {
    /// Reset and begin recording commands
    fn begin(&mut self) -> Result<()>;

    /// End recording commands
    fn end(&mut self) -> Result<()>;

    /// Begin a render pass
    ///
    /// # Arguments
    ///
    /// * `render_pass` - The render pass to begin
    /// * `framebuffer` - The framebuffer containing color and depth/stencil attachments
    /// * `clear_values` - Clear values for attachments, in framebuffer order
    fn begin_render_pass(
        &mut self,
        render_pass: &Arc<dyn RenderPass>,
        framebuffer: &Arc<dyn Framebuffer>,
        clear_values: &[ClearValue],
    ) -> Result<()>;

    /// End the current render pass
    fn end_render_pass(&mut self) -> Result<()>;

    /// Bind a graphics pipeline
    fn bind_pipeline(&mut self, pipeline: &Arc<dyn Pipeline>) -> Result<()>;

    /// Bind a binding group to a set index
    ///
    /// # Arguments
    ///
    /// * `layout` - Pipeline layout the set is compatible with
    /// * `set_index` - 0 = camera, 1 = objects, 2 = textures
    /// * `binding_group` - The binding group to bind
    /// * `dynamic_offsets` - One offset per dynamic buffer binding of the group
    fn bind_binding_group(
        &mut self,
        layout: &Arc<dyn PipelineLayout>,
        set_index: u32,
        binding_group: &Arc<dyn BindingGroup>,
        dynamic_offsets: &[u32],
    ) -> Result<()>;

    /// Bind a vertex buffer at binding 0
    fn bind_vertex_buffer(&mut self, buffer: &Arc<dyn Buffer>, offset: u64) -> Result<()>;

    /// Bind an index buffer
    ///
    /// # Arguments
    ///
    /// * `buffer` - Buffer to bind
    /// * `offset` - Offset into the buffer in bytes
    /// * `index_type` - Type of indices (U16 or U32)
    fn bind_index_buffer(&mut self, buffer: &Arc<dyn Buffer>, offset: u64, index_type: IndexType) -> Result<()>;

    /// Draw vertices
    ///
    /// # Arguments
    ///
    /// * `vertex_count` - Number of vertices to draw
    /// * `first_vertex` - Index of first vertex
    fn draw(&mut self, vertex_count: u32, first_vertex: u32) -> Result<()>;

    /// Draw `draw_count` indexed commands read from an indirect buffer
    ///
    /// # Arguments
    ///
    /// * `buffer` - Buffer of `DrawIndexedIndirectCommand` records
    /// * `offset` - Byte offset of the first record
    /// * `draw_count` - Number of records
    /// * `stride` - Byte distance between records
    fn draw_indexed_indirect(
        &mut self,
        buffer: &Arc<dyn Buffer>,
        offset: u64,
        draw_count: u32,
        stride: u32,
    ) -> Result<()>;
}

/// Index buffer element type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexType {
    /// 16-bit indices (max 65535 vertices)
    U16,
    /// 32-bit indices
    U32,
}

impl IndexType {
    /// Size in bytes of one index element
    pub fn size_bytes(&self) -> u32 {
        match self {
            IndexType::U16 => 2,
            IndexType::U32 => 4,
        }
    }
}

/// Clear value for an attachment
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearValue {
    /// Color clear value (RGBA)
    Color([f32; 4]),
    /// Depth/stencil clear value
    DepthStencil { depth: f32, stencil: u32 },
}
