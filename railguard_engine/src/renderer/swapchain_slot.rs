/// Swapchain slot - one window's swapchain and the per-stage resources derived from it

use std::sync::{Arc, Mutex};
use rustc_hash::FxHashMap;

use crate::graphics_device::{
    BindingGroup, Buffer, DescriptorPool, Framebuffer, Pipeline, RenderPass, Swapchain, Texture,
};
use crate::render::{ShaderEffectId, WindowIndex};
use crate::renderer::RenderBatch;
use crate::utils::SubscriptionId;
use crate::window::{Extent2D, RenderWindow};

// ===== WINDOW NOTIFICATIONS =====

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WindowNotification {
    Resized(Extent2D),
    CloseRequested,
}

/// Notification queued by a window callback, applied at the start of the next draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PendingWindowEvent {
    pub slot: WindowIndex,
    /// Connection generation of the slot when the callback was registered
    pub generation: u64,
    pub notification: WindowNotification,
}

pub(crate) type PendingWindowEvents = Arc<Mutex<Vec<PendingWindowEvent>>>;

// ===== RENDER STAGE INSTANCE =====

/// GPU state of one render stage for one swapchain
pub(crate) struct RenderStageInstance {
    pub render_pass: Arc<dyn RenderPass>,
    /// Images owned by the stage, per swapchain image
    pub attachments: Vec<Vec<Arc<dyn Texture>>>,
    /// Color outputs the next stage samples, per swapchain image
    pub sampled_outputs: Vec<Vec<Arc<dyn Texture>>>,
    pub framebuffers: Vec<Arc<dyn Framebuffer>>,
    pub pipelines: FxHashMap<ShaderEffectId, Arc<dyn Pipeline>>,
    pub batches: Vec<RenderBatch>,
    pub indirect_buffer: Option<Arc<dyn Buffer>>,
    /// Binding groups over `sampled_outputs`, per swapchain image
    pub output_sets: Vec<Arc<dyn BindingGroup>>,
}

impl RenderStageInstance {
    pub fn new(render_pass: Arc<dyn RenderPass>) -> Self {
        Self {
            render_pass,
            attachments: Vec::new(),
            sampled_outputs: Vec::new(),
            framebuffers: Vec::new(),
            pipelines: FxHashMap::default(),
            batches: Vec::new(),
            indirect_buffer: None,
            output_sets: Vec::new(),
        }
    }

    /// Drop everything tied to the swapchain images, keep the render pass
    pub fn release_image_resources(&mut self) {
        self.output_sets.clear();
        self.framebuffers.clear();
        self.sampled_outputs.clear();
        self.attachments.clear();
        self.pipelines.clear();
        self.batches.clear();
    }
}

// ===== SWAPCHAIN SLOT =====

pub(crate) struct SwapchainSlot {
    pub enabled: bool,
    /// Incremented on every connect and disconnect, stale callbacks compare against it
    pub generation: u64,
    pub window: Option<Arc<dyn RenderWindow>>,
    /// (resize, close) subscriptions on the window's channels
    pub subscriptions: Option<(SubscriptionId, SubscriptionId)>,
    pub swapchain: Option<Box<dyn Swapchain>>,
    /// Pool of the internal texture sets, reset on recreate
    pub descriptor_pool: Option<Box<dyn DescriptorPool>>,
    pub stages: Vec<RenderStageInstance>,

    pub swapchain_version: u64,
    pub built_effects_version: u64,
    pub built_draw_cache_version: u64,
    pub built_internal_textures_version: u64,
}

impl SwapchainSlot {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            generation: 0,
            window: None,
            subscriptions: None,
            swapchain: None,
            descriptor_pool: None,
            stages: Vec::new(),
            swapchain_version: 0,
            built_effects_version: 0,
            built_draw_cache_version: 0,
            built_internal_textures_version: 0,
        }
    }

    pub fn extent(&self) -> Option<Extent2D> {
        self.swapchain.as_ref().map(|s| s.extent())
    }

    pub fn image_count(&self) -> usize {
        self.swapchain.as_ref().map_or(0, |s| s.image_count())
    }
}
