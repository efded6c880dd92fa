use std::sync::Arc;
use raw_window_handle::{
    DisplayHandle, HandleError, HasDisplayHandle, HasWindowHandle, WindowHandle,
};
use winit::event::WindowEvent;
use winit::window::Window;

use crate::utils::EventSender;
use crate::window::{Extent2D, RenderWindow};

/// [`RenderWindow`] adapter over a winit window.
///
/// The application forwards the window events it receives from the event
/// loop to [`handle_event`](WinitWindow::handle_event), which publishes resize
/// and close notifications to the subscribers.
///
/// # Example
///
/// ```ignore
/// let window = Arc::new(WinitWindow::new(event_loop.create_window(attributes)?));
/// renderer.connect_window(0, window.clone())?;
///
/// // In ApplicationHandler::window_event
/// window.handle_event(&event);
/// ```
pub struct WinitWindow {
    window: Arc<Window>,
    resize: EventSender<Extent2D>,
    close: EventSender<()>,
}

impl WinitWindow {
    pub fn new(window: Window) -> Self {
        Self::from_arc(Arc::new(window))
    }

    pub fn from_arc(window: Arc<Window>) -> Self {
        Self {
            window,
            resize: EventSender::new(),
            close: EventSender::new(),
        }
    }

    pub fn window(&self) -> &Arc<Window> {
        &self.window
    }

    /// Publish the notifications carried by a winit window event
    pub fn handle_event(&self, event: &WindowEvent) {
        match event {
            WindowEvent::Resized(size) => {
                self.resize.send(&Extent2D::new(size.width, size.height));
            }
            WindowEvent::CloseRequested => {
                self.close.send(&());
            }
            _ => {}
        }
    }
}

impl HasWindowHandle for WinitWindow {
    fn window_handle(&self) -> Result<WindowHandle<'_>, HandleError> {
        self.window.window_handle()
    }
}

impl HasDisplayHandle for WinitWindow {
    fn display_handle(&self) -> Result<DisplayHandle<'_>, HandleError> {
        self.window.display_handle()
    }
}

impl RenderWindow for WinitWindow {
    fn current_extent(&self) -> Extent2D {
        let size = self.window.inner_size();
        Extent2D::new(size.width, size.height)
    }

    fn on_resize(&self) -> &EventSender<Extent2D> {
        &self.resize
    }

    fn on_close(&self) -> &EventSender<()> {
        &self.close
    }
}
