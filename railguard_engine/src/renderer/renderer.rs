/// Renderer - handle-based scene API over a graphics device
///
/// The renderer owns every scene registry (shader modules, effects, material
/// templates, materials, mesh parts, models, render nodes, textures, cameras),
/// one swapchain slot per window and a ring of in-flight frames. Derived GPU
/// state (pipelines, draw caches, descriptor sets, internal texture sets) is
/// rebuilt lazily in `draw()` whenever the version counter it was built from
/// falls behind the authoritative one.
///
/// The implementation is split across sibling modules:
/// - `renderer_materials`: shader modules, effects, templates, materials, textures
/// - `renderer_scene`: mesh parts, models, render nodes, cameras
/// - `renderer_swapchain`: window connection and swapchain recreation
/// - `renderer_frame`: per-frame buffers, descriptor sets and mesh upload
/// - `renderer_draw`: draw cache construction and command recording

use std::sync::{Arc, Mutex};
use rustc_hash::FxHashMap;

use crate::config::RendererConfig;
use crate::error::{Error, Result};
use crate::graphics_device::{
    Buffer, DescriptorPool, DescriptorPoolDesc, DeviceLimits, GraphicsDevice,
};
use crate::render::{
    pad, Camera, GpuCameraData, RenderStageKind, ShaderEffectId, WindowIndex,
};
use crate::renderer::entities::{
    Material, MaterialTemplate, Model, RenderBatch, RenderNode, ShaderEffect, ShaderModule,
    StoredMeshPart, Texture,
};
use crate::renderer::frame_data::FrameData;
use crate::renderer::swapchain_slot::{PendingWindowEvents, SwapchainSlot};
use crate::utils::Storage;
use crate::window::Extent2D;

/// Number of frames recorded ahead of the GPU
pub const NB_OVERLAPPING_FRAMES: usize = 3;

/// Timeout of every frame fence wait (1 second)
pub const WAIT_FOR_FENCES_TIMEOUT: u64 = 1_000_000_000;

/// Timeout of swapchain image acquisition (1 second)
pub const SEMAPHORE_TIMEOUT: u64 = 1_000_000_000;

/// Object slots of a frame's object buffer before the first growth
pub(crate) const INITIAL_OBJECT_CAPACITY: u64 = 64;

pub(crate) const LOG_SOURCE: &str = "railguard::Renderer";

const MATERIAL_POOL_DESC: DescriptorPoolDesc = DescriptorPoolDesc {
    max_sets: 64,
    uniform_buffers: 0,
    storage_buffers: 0,
    sampled_textures: 256,
    growable: true,
};

/// Real-time renderer
///
/// Single-thread owned. Register it with [`Engine::create_renderer`](crate::railguard::Engine::create_renderer)
/// to share it behind a mutex.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use railguard_engine::railguard::{Renderer, RendererConfig, render::*};
///
/// let mut renderer = Renderer::new(device, RendererConfig::default())?;
/// renderer.connect_window(0, window)?;
///
/// let vertex = renderer.load_shader_module("shaders/forward.vert.spv", ShaderStage::VERTEX)?;
/// let fragment = renderer.load_shader_module("shaders/forward.frag.spv", ShaderStage::FRAGMENT)?;
/// let effect = renderer.create_shader_effect(&[vertex, fragment], RenderStageKind::FORWARD, &[])?;
/// let template = renderer.create_material_template(&[effect])?;
/// let material = renderer.create_material(template, Vec::new())?;
/// let mesh = renderer.save_mesh_part(mesh_part);
/// renderer.create_model(mesh, material)?;
/// renderer.create_perspective_camera(0, 70f32.to_radians(), 0.1, 100.0)?;
///
/// renderer.draw()?;
/// # Ok::<(), railguard_engine::railguard::Error>(())
/// ```
pub struct Renderer {
    pub(crate) config: RendererConfig,
    pub(crate) limits: DeviceLimits,
    /// Padded size of one camera record in the frame camera buffers
    pub(crate) camera_stride: u64,

    // Registries
    pub(crate) shader_modules: Storage<ShaderModule>,
    pub(crate) shader_effects: Storage<ShaderEffect>,
    pub(crate) material_templates: Storage<MaterialTemplate>,
    pub(crate) materials: Storage<Material>,
    pub(crate) mesh_parts: Storage<StoredMeshPart>,
    pub(crate) models: Storage<Model>,
    pub(crate) render_nodes: Storage<RenderNode>,
    pub(crate) textures: Storage<Texture>,
    pub(crate) cameras: Storage<Camera>,
    /// Effect drawn by the full-screen quad stages of each kind
    pub(crate) global_effects: FxHashMap<RenderStageKind, ShaderEffectId>,
    /// Material texture sets
    pub(crate) material_pool: Box<dyn DescriptorPool>,

    // Version counters
    pub(crate) effects_version: u64,
    pub(crate) buffer_config_version: u64,
    pub(crate) draw_cache_version: u64,

    // Shared mesh buffers
    pub(crate) vertex_buffer: Option<Arc<dyn Buffer>>,
    pub(crate) index_buffer: Option<Arc<dyn Buffer>>,
    pub(crate) should_update_mesh_buffers: bool,
    pub(crate) object_capacity: u64,

    pub(crate) swapchains: Vec<SwapchainSlot>,
    pub(crate) frames: Vec<FrameData>,
    pub(crate) current_frame_number: u64,
    pub(crate) pending_events: PendingWindowEvents,

    // Declared last: every resource above must be released before the device
    pub(crate) device: Box<dyn GraphicsDevice>,
}

impl Renderer {
    /// Create a renderer over a graphics device
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or a frame resource
    /// cannot be created.
    pub fn new(device: Box<dyn GraphicsDevice>, config: RendererConfig) -> Result<Self> {
        config.validate()?;

        let limits = device.limits();
        let camera_stride = pad(
            std::mem::size_of::<GpuCameraData>() as u64,
            limits.min_uniform_buffer_offset_alignment,
        );

        let mut frames = Vec::with_capacity(NB_OVERLAPPING_FRAMES);
        for _ in 0..NB_OVERLAPPING_FRAMES {
            frames.push(FrameData::new(device.as_ref(), config.window_capacity, camera_stride)?);
        }

        let material_pool = device.create_descriptor_pool(&MATERIAL_POOL_DESC)?;
        let swapchains = (0..config.window_capacity).map(|_| SwapchainSlot::disabled()).collect();

        crate::engine_info!(
            LOG_SOURCE,
            "Renderer created for '{}' {}: {} window slot(s), {} render stage(s)",
            config.application_name,
            config.application_version,
            config.window_capacity,
            config.render_pipeline.stages.len()
        );

        Ok(Self {
            config,
            limits,
            camera_stride,
            shader_modules: Storage::new(),
            shader_effects: Storage::new(),
            material_templates: Storage::new(),
            materials: Storage::new(),
            mesh_parts: Storage::new(),
            models: Storage::new(),
            render_nodes: Storage::new(),
            textures: Storage::new(),
            cameras: Storage::new(),
            global_effects: FxHashMap::default(),
            material_pool,
            effects_version: 1,
            buffer_config_version: 1,
            draw_cache_version: 1,
            vertex_buffer: None,
            index_buffer: None,
            should_update_mesh_buffers: false,
            object_capacity: INITIAL_OBJECT_CAPACITY,
            swapchains,
            frames,
            current_frame_number: 1,
            pending_events: Arc::new(Mutex::new(Vec::new())),
            device,
        })
    }

    /// Log a fatal renderer error before returning it (internal use)
    pub(crate) fn log_and_return_error(error: Error) -> Error {
        match &error {
            Error::ConsistencyError(msg) => {
                crate::engine_error!(LOG_SOURCE, "Consistency error: {}", msg);
            }
            Error::InvalidResource(msg) => {
                crate::engine_error!(LOG_SOURCE, "Invalid resource: {}", msg);
            }
            _ => {
                crate::engine_error!(LOG_SOURCE, "Renderer error: {}", error);
            }
        }
        error
    }

    pub(crate) fn invalid_resource(message: String) -> Error {
        Self::log_and_return_error(Error::InvalidResource(message))
    }

    pub(crate) fn consistency_error(message: String) -> Error {
        Self::log_and_return_error(Error::ConsistencyError(message))
    }

    /// Validate a window index against the configured capacity
    pub(crate) fn slot_index(&self, slot: WindowIndex) -> Result<usize> {
        let index = slot as usize;
        if index >= self.swapchains.len() {
            return Err(Self::invalid_resource(format!(
                "window index {} out of range (capacity {})",
                slot,
                self.swapchains.len()
            )));
        }
        Ok(index)
    }

    /// Validate a window index and require its slot to be connected
    pub(crate) fn enabled_slot_index(&self, slot: WindowIndex) -> Result<usize> {
        let index = self.slot_index(slot)?;
        if !self.swapchains[index].enabled {
            return Err(Self::invalid_resource(format!("window slot {} is not connected", slot)));
        }
        Ok(index)
    }

    // ===== INTROSPECTION =====

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn device(&self) -> &dyn GraphicsDevice {
        self.device.as_ref()
    }

    pub fn effects_version(&self) -> u64 {
        self.effects_version
    }

    pub fn buffer_config_version(&self) -> u64 {
        self.buffer_config_version
    }

    pub fn draw_cache_version(&self) -> u64 {
        self.draw_cache_version
    }

    /// Recreate counter of a window slot, `None` for an out-of-range slot
    pub fn swapchain_version(&self, slot: WindowIndex) -> Option<u64> {
        self.swapchains.get(slot as usize).map(|s| s.swapchain_version)
    }

    /// Number of the frame the next `draw()` records
    pub fn frame_number(&self) -> u64 {
        self.current_frame_number
    }

    /// Cached batches of one stage of a connected window
    pub fn render_batches(&self, slot: WindowIndex, stage: usize) -> Option<&[RenderBatch]> {
        let swapchain = self.swapchains.get(slot as usize)?;
        if !swapchain.enabled {
            return None;
        }
        swapchain.stages.get(stage).map(|s| s.batches.as_slice())
    }

    /// Current extent of a connected window's swapchain
    pub fn window_extent(&self, slot: WindowIndex) -> Option<Extent2D> {
        self.swapchains.get(slot as usize)?.extent()
    }

    pub fn is_window_connected(&self, slot: WindowIndex) -> bool {
        self.swapchains.get(slot as usize).is_some_and(|s| s.enabled)
    }

    /// Block until the device finished all submitted work
    pub fn wait_idle(&self) -> Result<()> {
        self.device.wait_idle()
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        if let Err(e) = self.wait_all_frames() {
            crate::engine_error!(LOG_SOURCE, "Failed to wait frames during teardown: {}", e);
        }
        if let Err(e) = self.device.reclaim_transfers() {
            crate::engine_error!(LOG_SOURCE, "Failed to reclaim transfers during teardown: {}", e);
        }

        self.vertex_buffer = None;
        self.index_buffer = None;
        self.frames.clear();

        self.render_nodes.clear();
        self.models.clear();
        self.mesh_parts.clear();
        self.materials.clear();
        self.material_templates.clear();
        self.shader_effects.clear();
        self.shader_modules.clear();
        self.textures.clear();
        self.cameras.clear();

        for swapchain in &mut self.swapchains {
            Self::release_window(swapchain);
        }
        self.swapchains.clear();

        crate::engine_info!(LOG_SOURCE, "Renderer destroyed");
    }
}

#[cfg(test)]
#[path = "renderer_tests.rs"]
mod tests;
