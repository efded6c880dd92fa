/// Render module - scene-level types shared by the renderer and the backends

pub mod types;
pub mod render_pipeline;
pub mod mesh;
pub mod camera;
pub mod gpu_structs;

pub use types::*;
pub use render_pipeline::*;
pub use mesh::*;
pub use camera::*;
pub use gpu_structs::*;
