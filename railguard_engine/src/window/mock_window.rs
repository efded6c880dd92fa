/// Mock window for unit tests (no windowing system required)

#[cfg(test)]
use std::sync::Mutex;
#[cfg(test)]
use raw_window_handle::{
    DisplayHandle, HandleError, HasDisplayHandle, HasWindowHandle, WindowHandle,
};
#[cfg(test)]
use crate::utils::EventSender;
#[cfg(test)]
use crate::window::{Extent2D, RenderWindow};

#[cfg(test)]
pub struct MockWindow {
    extent: Mutex<Extent2D>,
    resize: EventSender<Extent2D>,
    close: EventSender<()>,
}

#[cfg(test)]
impl MockWindow {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            extent: Mutex::new(Extent2D::new(width, height)),
            resize: EventSender::new(),
            close: EventSender::new(),
        }
    }

    /// Change the extent and publish the resize notification, like a real window would
    pub fn resize(&self, width: u32, height: u32) {
        let extent = Extent2D::new(width, height);
        *self.extent.lock().unwrap() = extent;
        self.resize.send(&extent);
    }

    pub fn request_close(&self) {
        self.close.send(&());
    }
}

#[cfg(test)]
impl HasWindowHandle for MockWindow {
    fn window_handle(&self) -> Result<WindowHandle<'_>, HandleError> {
        Err(HandleError::Unavailable)
    }
}

#[cfg(test)]
impl HasDisplayHandle for MockWindow {
    fn display_handle(&self) -> Result<DisplayHandle<'_>, HandleError> {
        Err(HandleError::Unavailable)
    }
}

#[cfg(test)]
impl RenderWindow for MockWindow {
    fn current_extent(&self) -> Extent2D {
        *self.extent.lock().unwrap()
    }

    fn on_resize(&self) -> &EventSender<Extent2D> {
        &self.resize
    }

    fn on_close(&self) -> &EventSender<()> {
        &self.close
    }
}
