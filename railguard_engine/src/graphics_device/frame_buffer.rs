/// Framebuffer trait - groups the attachments a render pass renders into
///
/// Created once per swapchain image and reused each frame. Recreated with
/// the swapchain.

use std::sync::Arc;
use crate::graphics_device::{RenderPass, Texture};
use crate::window::Extent2D;

pub trait Framebuffer: Send + Sync {
    fn extent(&self) -> Extent2D;
}

/// Descriptor for creating a framebuffer
pub struct FramebufferDesc<'a> {
    /// The render pass this framebuffer is compatible with
    pub render_pass: &'a Arc<dyn RenderPass>,
    /// Color attachments in render pass order, then the depth attachment if any
    pub attachments: Vec<Arc<dyn Texture>>,
    pub extent: Extent2D,
}
