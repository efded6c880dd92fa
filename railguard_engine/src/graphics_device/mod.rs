/// Graphics device module - the trait family a backend implements for the renderer

pub mod graphics_device;
pub mod buffer;
pub mod texture;
pub mod shader;
pub mod pipeline;
pub mod render_pass;
pub mod frame_buffer;
pub mod swapchain;
pub mod command_list;
pub mod binding_group;
pub mod sync;

pub use graphics_device::*;
pub use buffer::*;
pub use texture::*;
pub use shader::*;
pub use pipeline::*;
pub use render_pass::*;
pub use frame_buffer::*;
pub use swapchain::*;
pub use command_list::*;
pub use binding_group::*;
pub use sync::*;

// Mock graphics device for tests (no GPU required)
#[cfg(test)]
pub mod mock_graphics_device;
