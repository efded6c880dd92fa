/// Texture trait and texture descriptors

use crate::render::{FilterMode, Format};
use crate::window::Extent2D;

/// Descriptor for an attachment image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachmentDesc {
    /// Concrete format (never `WINDOW_FORMAT`)
    pub format: Format,
    pub extent: Extent2D,
}

/// Descriptor for a sampled RGBA8 sRGB texture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureDesc {
    pub width: u32,
    pub height: u32,
    pub filter: FilterMode,
}

impl TextureDesc {
    /// Byte size of the tightly packed pixel data
    pub fn data_size(&self) -> u64 {
        self.width as u64 * self.height as u64 * 4
    }
}

/// Texture resource trait
///
/// Image, view and (for sampled images) sampler. Destroyed when dropped.
pub trait Texture: Send + Sync {
    fn extent(&self) -> Extent2D;

    fn format(&self) -> Format;
}
