/// Pipeline and pipeline layout traits, and the pipeline descriptor

use std::sync::Arc;
use crate::graphics_device::{RenderPass, ShaderModule};
use crate::window::Extent2D;

/// Pipeline layout resource trait
///
/// Binding sets 0 (camera), 1 (objects) and, when the effect samples
/// textures, 2 (textures).
pub trait PipelineLayout: Send + Sync {
    /// Number of texture bindings in set 2
    fn texture_count(&self) -> usize;
}

/// Descriptor for creating a graphics pipeline
///
/// The fixed-function state is the same for every pipeline: triangle list,
/// no culling, counter-clockwise front face, no blending, viewport and scissor
/// covering `extent`.
#[derive(Clone)]
pub struct PipelineDesc<'a> {
    /// Shader modules, in stage order
    pub shader_modules: Vec<Arc<dyn ShaderModule>>,
    pub layout: &'a Arc<dyn PipelineLayout>,
    pub render_pass: &'a Arc<dyn RenderPass>,
    pub extent: Extent2D,
    pub color_attachment_count: u32,
    /// Depth test and write with LESS_OR_EQUAL
    pub depth_test: bool,
    /// Read [`Vertex`](crate::render::Vertex) from binding 0 (false for full-screen quads)
    pub vertex_input: bool,
}

/// Pipeline resource trait
///
/// Implemented by backend-specific pipeline types (e.g., VulkanPipeline).
/// The pipeline is automatically destroyed when dropped.
pub trait Pipeline: Send + Sync {}
