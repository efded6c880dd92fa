/*!
# Railguard Engine - Vulkan Backend

Vulkan implementation of the `GraphicsDevice` trait family of `railguard_engine`.

Built on ash for the Vulkan bindings and gpu-allocator for memory management.

# Example

```no_run
use railguard_engine::railguard::{Renderer, RendererConfig};
use railguard_engine_renderer_vulkan::VulkanGraphicsDevice;

# fn run(window: &winit::window::Window) -> railguard_engine::railguard::Result<()> {
let config = RendererConfig::default();
let device = VulkanGraphicsDevice::new(window, &config)?;
let renderer = Renderer::new(Box::new(device), config)?;
# Ok(())
# }
```
*/

mod debug;
mod vulkan;
mod vulkan_binding_group;
mod vulkan_buffer;
mod vulkan_command_list;
mod vulkan_context;
mod vulkan_format;
mod vulkan_frame_buffer;
mod vulkan_pipeline;
mod vulkan_render_pass;
mod vulkan_sampler;
mod vulkan_shader;
mod vulkan_swapchain;
mod vulkan_sync;
mod vulkan_texture;
mod vulkan_transfer;

pub use vulkan::VulkanGraphicsDevice;

// Re-export debug utilities
pub use debug::{get_validation_stats, print_validation_stats_report};
