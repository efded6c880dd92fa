/// Window collaborator - the contract the renderer needs from a window

pub mod render_window;
pub mod winit_window;

#[cfg(test)]
pub mod mock_window;

pub use render_window::*;
pub use winit_window::WinitWindow;
