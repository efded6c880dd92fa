/// Window connection, swapchain recreation and the per-swapchain derived
/// state (stage images, pipelines, internal texture sets)

use std::sync::{Arc, Mutex, Weak};

use crate::error::Result;
use crate::graphics_device::{
    AttachmentDesc, BindingGroupLayout, BindingResource, DescriptorPoolDesc, FramebufferDesc,
    PipelineDesc, RenderPassAttachment, RenderPassDesc,
};
use crate::render::{Format, RenderStageAttachmentDescription, RenderStageDescription, TextureLayout, WindowIndex};
use crate::renderer::renderer::{Renderer, LOG_SOURCE};
use crate::renderer::swapchain_slot::{
    PendingWindowEvent, RenderStageInstance, SwapchainSlot, WindowNotification,
};
use crate::window::{Extent2D, RenderWindow};

fn resolve_format(format: Format, window_format: Format) -> Format {
    match format {
        Format::WINDOW_FORMAT => window_format,
        other => other,
    }
}

/// Sizes the pool of a slot's internal texture sets, one set per sampling
/// stage and swapchain image
fn internal_texture_pool_desc(image_count: usize, stages: &[RenderStageDescription]) -> DescriptorPoolDesc {
    let sampled_outputs: usize = stages.iter().map(RenderStageDescription::sampled_output_count).sum();
    DescriptorPoolDesc {
        max_sets: (image_count * stages.len()).max(1) as u32,
        uniform_buffers: 0,
        storage_buffers: 0,
        sampled_textures: (image_count * sampled_outputs).max(1) as u32,
        growable: false,
    }
}

fn render_pass_attachment(
    attachment: &RenderStageAttachmentDescription,
    window_format: Format,
) -> RenderPassAttachment {
    RenderPassAttachment {
        format: resolve_format(attachment.format, window_format),
        initial_layout: attachment.initial_layout,
        final_layout: attachment.final_layout,
    }
}

/// Render pass of a stage with `WINDOW_FORMAT` resolved to the surface format
pub(crate) fn render_pass_desc(stage: &RenderStageDescription, window_format: Format) -> RenderPassDesc {
    RenderPassDesc {
        color_attachments: stage
            .color_attachments()
            .map(|a| render_pass_attachment(a, window_format))
            .collect(),
        depth_attachment: stage.depth_attachment().map(|a| render_pass_attachment(a, window_format)),
    }
}

fn push_event(queue: &Weak<Mutex<Vec<PendingWindowEvent>>>, event: PendingWindowEvent) {
    if let Some(queue) = queue.upgrade() {
        if let Ok(mut queue) = queue.lock() {
            queue.push(event);
        }
    }
}

impl Renderer {
    // ===== CONNECTION =====

    /// Connect a window to a swapchain slot
    ///
    /// Creates the swapchain, one render pass per render stage and the stage
    /// images. The window's resize and close notifications are queued and
    /// applied by the next `draw()`.
    ///
    /// # Errors
    ///
    /// Returns an error if `slot` is out of range, already connected, or the
    /// swapchain cannot be created.
    pub fn connect_window(&mut self, slot: WindowIndex, window: Arc<dyn RenderWindow>) -> Result<()> {
        let index = self.slot_index(slot)?;
        if self.swapchains[index].enabled {
            return Err(Self::invalid_resource(format!("window slot {} is already connected", slot)));
        }

        let extent = window.current_extent();
        let swapchain = self.device.create_swapchain(window.as_ref(), extent)?;
        let window_format = swapchain.format();
        let image_count = swapchain.image_count();

        let stage_descs = &self.config.render_pipeline.stages;
        let mut stages = Vec::with_capacity(stage_descs.len());
        for stage in stage_descs {
            let render_pass = self.device.create_render_pass(&render_pass_desc(stage, window_format))?;
            stages.push(RenderStageInstance::new(render_pass));
        }

        let descriptor_pool = self
            .device
            .create_descriptor_pool(&internal_texture_pool_desc(image_count, stage_descs))?;

        let slot_state = &mut self.swapchains[index];
        slot_state.generation += 1;
        let generation = slot_state.generation;

        let queue = Arc::downgrade(&self.pending_events);
        let resize_id = window.on_resize().subscribe(move |extent: &Extent2D| {
            push_event(&queue, PendingWindowEvent {
                slot,
                generation,
                notification: WindowNotification::Resized(*extent),
            });
        });
        let queue = Arc::downgrade(&self.pending_events);
        let close_id = window.on_close().subscribe(move |_: &()| {
            push_event(&queue, PendingWindowEvent {
                slot,
                generation,
                notification: WindowNotification::CloseRequested,
            });
        });

        let actual_extent = swapchain.extent();
        slot_state.enabled = true;
        slot_state.window = Some(window);
        slot_state.subscriptions = Some((resize_id, close_id));
        slot_state.swapchain = Some(swapchain);
        slot_state.descriptor_pool = Some(descriptor_pool);
        slot_state.stages = stages;
        slot_state.swapchain_version += 1;

        // The new stages start without pipelines or batches
        self.build_stage_images(index)?;
        self.build_missing_pipelines(index)?;
        self.draw_cache_version += 1;

        crate::engine_info!(
            LOG_SOURCE,
            "Window connected in slot {}: {}x{}, {} images, format {:?}",
            slot,
            actual_extent.width,
            actual_extent.height,
            image_count,
            window_format
        );
        Ok(())
    }

    /// Disconnect the window of a slot and destroy its swapchain
    ///
    /// Disconnecting a slot that is not connected is a no-op.
    pub fn disconnect_window(&mut self, slot: WindowIndex) -> Result<()> {
        let index = self.slot_index(slot)?;
        if !self.swapchains[index].enabled {
            return Ok(());
        }
        self.wait_all_frames()?;

        let swapchain = &mut self.swapchains[index];
        Self::release_window(swapchain);
        swapchain.generation += 1;

        crate::engine_info!(LOG_SOURCE, "Window disconnected from slot {}", slot);
        Ok(())
    }

    /// Drop every GPU object of a slot and detach it from its window
    pub(crate) fn release_window(swapchain: &mut SwapchainSlot) {
        if let (Some(window), Some((resize_id, close_id))) = (&swapchain.window, swapchain.subscriptions) {
            window.on_resize().unsubscribe(resize_id);
            window.on_close().unsubscribe(close_id);
        }
        swapchain.subscriptions = None;
        swapchain.enabled = false;
            swapchain.stages.clear();
        swapchain.built_effects_version = 0;
        swapchain.built_draw_cache_version = 0;
        swapchain.built_internal_textures_version = 0;
        swapchain.descriptor_pool = None;
        swapchain.swapchain = None;
        swapchain.window = None;
    }

    /// Recreate the swapchain of a connected window at a new extent
    ///
    /// # Errors
    ///
    /// Returns an error if the slot is out of range or not connected.
    pub fn resize_window(&mut self, slot: WindowIndex, extent: Extent2D) -> Result<()> {
        let index = self.enabled_slot_index(slot)?;
        self.recreate_swapchain(index, extent)
    }

    /// Apply the window notifications queued since the last draw
    pub(crate) fn process_window_events(&mut self) -> Result<()> {
        let events: Vec<PendingWindowEvent> = match self.pending_events.lock() {
            Ok(mut queue) => queue.drain(..).collect(),
            Err(_) => return Err(Self::consistency_error("window event queue poisoned".to_string())),
        };

        for (position, event) in events.iter().enumerate() {
            let index = event.slot as usize;
            let current = self.swapchains.get(index).filter(|s| s.enabled && s.generation == event.generation);
            if current.is_none() {
                crate::engine_trace!(LOG_SOURCE, "Dropped stale window event for slot {}", event.slot);
                continue;
            }

            match event.notification {
                WindowNotification::Resized(extent) => {
                    // Only the latest resize of a slot matters
                    let superseded = events[position + 1..].iter().any(|later| {
                        later.slot == event.slot
                            && matches!(later.notification, WindowNotification::Resized(_))
                    });
                    if !superseded {
                        self.recreate_swapchain(index, extent)?;
                    }
                }
                WindowNotification::CloseRequested => {
                    for camera in self.cameras.values_mut().filter(|c| c.window == event.slot) {
                        camera.enabled = false;
                    }
                    self.disconnect_window(event.slot)?;
                }
            }
        }
        Ok(())
    }

    // ===== RECREATION =====

    pub(crate) fn recreate_swapchain(&mut self, index: usize, extent: Extent2D) -> Result<()> {
        if extent.is_empty() {
            crate::engine_trace!(LOG_SOURCE, "Ignoring resize of slot {} to an empty extent", index);
            return Ok(());
        }
        self.wait_all_frames()?;

        let slot = &mut self.swapchains[index];
        for stage in &mut slot.stages {
            stage.release_image_resources();
        }
        let swapchain = slot
            .swapchain
            .as_mut()
            .ok_or_else(|| Self::consistency_error(format!("window slot {} has no swapchain", index)))?;
        let old_image_count = swapchain.image_count();
        swapchain.recreate(extent)?;
        let new_extent = swapchain.extent();
        let image_count = swapchain.image_count();
        slot.swapchain_version += 1;

        if image_count != old_image_count {
            let desc = internal_texture_pool_desc(image_count, &self.config.render_pipeline.stages);
            self.swapchains[index].descriptor_pool = Some(self.device.create_descriptor_pool(&desc)?);
            crate::engine_trace!(
                LOG_SOURCE,
                "Swapchain {} image count changed from {} to {}",
                index,
                old_image_count,
                image_count
            );
        }

        self.build_stage_images(index)?;
        self.build_missing_pipelines(index)?;
        self.draw_cache_version += 1;

        let aspect_ratio = new_extent.aspect_ratio();
        for camera in self.cameras.values_mut().filter(|c| c.window as usize == index) {
            camera.update_aspect(aspect_ratio);
        }

        crate::engine_info!(
            LOG_SOURCE,
            "Swapchain {} recreated at {}x{}",
            index,
            new_extent.width,
            new_extent.height
        );
        Ok(())
    }

    /// Create the attachments and framebuffers of every stage, per swapchain image
    fn build_stage_images(&mut self, index: usize) -> Result<()> {
        let Self { swapchains, config, device, .. } = self;
        let slot = &mut swapchains[index];
        let swapchain = slot
            .swapchain
            .as_ref()
            .ok_or_else(|| Self::consistency_error(format!("window slot {} has no swapchain", index)))?;
        let extent = swapchain.extent();
        let window_format = swapchain.format();
        let stage_count = config.render_pipeline.stages.len();

        for (stage_index, (desc, stage)) in config
            .render_pipeline
            .stages
            .iter()
            .zip(slot.stages.iter_mut())
            .enumerate()
        {
            let is_last = stage_index + 1 == stage_count;

            for image_index in 0..swapchain.image_count() {
                let mut owned = Vec::new();
                let mut colors = Vec::new();
                let mut sampled = Vec::new();
                let mut depth = None;

                for attachment in &desc.attachments {
                    if attachment.is_present() {
                        let image = swapchain.image(image_index).ok_or_else(|| {
                            Self::consistency_error(format!("swapchain {} has no image {}", index, image_index))
                        })?;
                        colors.push(image);
                        continue;
                    }

                    let texture = device.create_attachment(&AttachmentDesc {
                        format: resolve_format(attachment.format, window_format),
                        extent,
                    })?;
                    owned.push(Arc::clone(&texture));
                    if attachment.is_depth() {
                        depth = Some(texture);
                    } else {
                        if !is_last {
                            sampled.push(Arc::clone(&texture));
                        }
                        colors.push(texture);
                    }
                }

                let mut framebuffer_attachments = colors;
                framebuffer_attachments.extend(depth);
                let framebuffer = device.create_framebuffer(&FramebufferDesc {
                    render_pass: &stage.render_pass,
                    attachments: framebuffer_attachments,
                    extent,
                })?;

                stage.attachments.push(owned);
                stage.sampled_outputs.push(sampled);
                stage.framebuffers.push(framebuffer);
            }
        }
        Ok(())
    }

    // ===== PIPELINES =====

    /// Build the pipelines missing in a swapchain's stages
    ///
    /// A stage gets one pipeline per live effect of its kind. Existing
    /// pipelines are kept. Returns whether any pipeline was built.
    pub(crate) fn build_missing_pipelines(&mut self, index: usize) -> Result<bool> {
        let Self { swapchains, config, device, shader_effects, effects_version, .. } = self;
        let slot = &mut swapchains[index];
        let extent = slot
            .extent()
            .ok_or_else(|| Self::consistency_error(format!("window slot {} has no swapchain", index)))?;

        let mut built = 0;
        for (desc, stage) in config.render_pipeline.stages.iter().zip(slot.stages.iter_mut()) {
            for (effect_id, effect) in shader_effects.iter().filter(|(_, e)| e.kind == desc.kind) {
                if stage.pipelines.contains_key(&effect_id) {
                    continue;
                }
                let pipeline = device.create_pipeline(&PipelineDesc {
                    shader_modules: effect.modules.clone(),
                    layout: &effect.layout,
                    render_pass: &stage.render_pass,
                    extent,
                    color_attachment_count: desc.color_attachment_count() as u32,
                    depth_test: desc.do_depth_test,
                    vertex_input: desc.uses_material_system,
                })?;
                stage.pipelines.insert(effect_id, pipeline);
                built += 1;
                crate::engine_trace!(
                    LOG_SOURCE,
                    "Pipeline built for effect {} in stage '{}' of swapchain {}",
                    effect_id,
                    desc.name,
                    index
                );
            }
        }

        slot.built_effects_version = *effects_version;
        Ok(built > 0)
    }

    // ===== INTERNAL TEXTURES =====

    /// Rebuild the sets exposing each stage's color outputs to the next stage
    pub(crate) fn rebuild_internal_texture_sets(&mut self, index: usize) -> Result<()> {
        let slot = &mut self.swapchains[index];
        let pool = slot
            .descriptor_pool
            .as_mut()
            .ok_or_else(|| Self::consistency_error(format!("window slot {} has no descriptor pool", index)))?;
        pool.reset()?;

        for stage in &mut slot.stages {
            stage.output_sets.clear();
            for outputs in &stage.sampled_outputs {
                if outputs.is_empty() {
                    continue;
                }
                let layout = BindingGroupLayout::Textures(vec![TextureLayout::default(); outputs.len()]);
                let resources: Vec<BindingResource> = outputs
                    .iter()
                    .map(|texture| BindingResource::SampledTexture(texture.as_ref()))
                    .collect();
                stage.output_sets.push(pool.allocate(&layout, &resources)?);
            }
        }

        slot.built_internal_textures_version = slot.swapchain_version;
        crate::engine_trace!(LOG_SOURCE, "Internal texture sets rebuilt for swapchain {}", index);
        Ok(())
    }
}
