/// Renderer module - the handle-based scene API and the per-frame draw orchestration

pub mod renderer;
pub mod entities;
mod swapchain_slot;
mod frame_data;
mod renderer_materials;
mod renderer_scene;
mod renderer_swapchain;
mod renderer_frame;
mod renderer_draw;

pub use renderer::*;
pub use entities::*;
