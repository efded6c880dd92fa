use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use crate::utils::EventSender;

/// Size of a drawable surface in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent2D {
    pub width: u32,
    pub height: u32,
}

impl Extent2D {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// A zero-sized extent (minimized window) cannot back a swapchain
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn aspect_ratio(&self) -> f32 {
        if self.height == 0 {
            return 1.0;
        }
        self.width as f32 / self.height as f32
    }
}

/// A window the renderer can present to.
///
/// Provides the native handles used to create the presentation surface, the
/// current drawable extent, and two publish/subscribe channels. The renderer
/// subscribes to both when the window is connected and unsubscribes when it
/// is disconnected.
pub trait RenderWindow: HasWindowHandle + HasDisplayHandle + Send + Sync {
    /// Current drawable extent in pixels
    fn current_extent(&self) -> Extent2D;

    /// Channel publishing the new extent every time the window is resized
    fn on_resize(&self) -> &EventSender<Extent2D>;

    /// Channel publishing once when the user asks to close the window
    fn on_close(&self) -> &EventSender<()>;
}
