/*!
# Railguard Engine

Core of the Railguard real-time renderer.

This crate provides the handle-based scene API and the per-frame draw
orchestration. It talks to the GPU through the `GraphicsDevice` trait family;
backend implementations (Vulkan) live in their own crates.

## Architecture

- **Renderer**: Owns every registry (shader modules, effects, materials,
  meshes, models, cameras, textures) and drives `draw()`
- **GraphicsDevice**: Factory trait a backend implements for GPU resources
- **RenderWindow**: The contract the renderer needs from a window
- **RenderPipelineDescription**: Ordered render stages and their attachments

Objects are addressed by integer ids; `NULL_ID` (0) is never handed out.
*/

// Internal modules
mod error;
mod engine;
mod config;
pub mod log;
pub mod utils;
pub mod window;
pub mod render;
pub mod graphics_device;
pub mod renderer;

// Main railguard namespace module
pub mod railguard {
    // Error types
    pub use crate::error::{Error, Result};

    // Engine singleton
    pub use crate::engine::Engine;

    // Renderer and its configuration
    pub use crate::renderer::Renderer;
    pub use crate::config::{
        DebugMessageFilter, DebugOutput, DebugSeverity, RendererConfig, ValidationStats,
    };

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
        // Note: engine_* macros are exported at the crate root for backend crates
    }

    // Scene-level types: ids, formats, stages, meshes, cameras, GPU records
    pub mod render {
        pub use crate::render::*;
    }

    // Backend contract
    pub mod device {
        pub use crate::graphics_device::*;
    }

    pub mod window {
        pub use crate::window::*;
    }

    pub mod utils {
        pub use crate::utils::*;
    }
}

// Re-export math library at crate root
pub use glam;
