/// Render pass trait and descriptor

use crate::render::{Format, ImageLayout};

/// Render pass resource trait
///
/// Every attachment is cleared on load and stored.
pub trait RenderPass: Send + Sync {}

/// One attachment of a render pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderPassAttachment {
    /// Concrete format (`WINDOW_FORMAT` already resolved)
    pub format: Format,
    pub initial_layout: ImageLayout,
    pub final_layout: ImageLayout,
}

/// Descriptor for creating a render pass with a single subpass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderPassDesc {
    /// Color attachments, in declaration order
    pub color_attachments: Vec<RenderPassAttachment>,
    pub depth_attachment: Option<RenderPassAttachment>,
}

impl RenderPassDesc {
    pub fn attachment_count(&self) -> usize {
        self.color_attachments.len() + usize::from(self.depth_attachment.is_some())
    }
}
