/// Swapchain trait - for window presentation

use std::sync::Arc;
use crate::error::Result;
use crate::graphics_device::{Semaphore, Texture};
use crate::render::Format;
use crate::window::Extent2D;

/// Result of a successful image acquisition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcquiredImage {
    pub index: u32,
    /// The swapchain still works but no longer matches the surface exactly
    pub suboptimal: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentStatus {
    Optimal,
    Suboptimal,
}

/// Swapchain for presenting rendered images to a window
///
/// Owns the window surface. An out-of-date swapchain is an error; the
/// renderer recreates swapchains from window resize notifications.
pub trait Swapchain: Send + Sync {
    /// Acquire the next image, signaling `signal` when it is ready to be rendered to
    fn acquire_next_image(&mut self, signal: &dyn Semaphore, timeout_ns: u64) -> Result<AcquiredImage>;

    /// Present the image once `wait` is signaled
    fn present(&mut self, image_index: u32, wait: &dyn Semaphore) -> Result<PresentStatus>;

    /// Recreate the swapchain images at a new extent, keeping the surface
    fn recreate(&mut self, extent: Extent2D) -> Result<()>;

    fn image_count(&self) -> usize;

    fn extent(&self) -> Extent2D;

    /// Surface format of the swapchain images
    fn format(&self) -> Format;

    fn image(&self, index: usize) -> Option<Arc<dyn Texture>>;
}
