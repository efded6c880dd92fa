/// Draw cache construction and the per-frame draw orchestration

use std::sync::Arc;
use rustc_hash::FxHashMap;

use crate::error::Result;
use crate::graphics_device::{
    BindingGroup, BindingGroupLayout, Buffer, BufferDesc, BufferUsage, ClearValue, CommandList,
    IndexType, MemoryLocation, Pipeline, PresentStatus,
};
use crate::render::{
    CameraId, DrawIndexedIndirectCommand, GpuCameraData, ModelId, RenderStageDescription,
    RenderStageKind, ShaderEffectId,
};
use crate::renderer::entities::{MaterialTemplate, RenderBatch, ShaderEffect};
use crate::renderer::renderer::{Renderer, LOG_SOURCE, SEMAPHORE_TIMEOUT, WAIT_FOR_FENCES_TIMEOUT};
use crate::renderer::swapchain_slot::RenderStageInstance;

const CLEAR_COLOR: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

/// Frame-global sets bound at the start of every stage
struct FrameBindings<'a> {
    camera_set: &'a Arc<dyn BindingGroup>,
    object_set: &'a Arc<dyn BindingGroup>,
    camera_offset: u32,
}

/// Dynamic offset of a window's camera record inside the camera buffer
pub(crate) fn camera_dynamic_offset(camera_stride: u64, window: usize) -> Result<u32> {
    let offset = camera_stride * window as u64;
    u32::try_from(offset).map_err(|_| {
        Renderer::consistency_error(format!(
            "camera offset {} of window slot {} does not fit a dynamic offset",
            offset, window
        ))
    })
}

/// Clear values in framebuffer order: colors, then depth
fn clear_values(stage: &RenderStageDescription) -> Vec<ClearValue> {
    stage
        .color_attachments()
        .map(|_| ClearValue::Color(CLEAR_COLOR))
        .chain(stage.depth_attachment().map(|_| ClearValue::DepthStencil { depth: 1.0, stencil: 0 }))
        .collect()
}

fn record_batches(
    cmd: &mut dyn CommandList,
    stage: &RenderStageInstance,
    bindings: &FrameBindings,
    vertex_buffer: Option<&Arc<dyn Buffer>>,
    index_buffer: Option<&Arc<dyn Buffer>>,
) -> Result<()> {
    let Some(first) = stage.batches.first() else {
        return Ok(());
    };
    let (Some(vertex_buffer), Some(index_buffer), Some(indirect_buffer)) =
        (vertex_buffer, index_buffer, stage.indirect_buffer.as_ref())
    else {
        return Err(Renderer::consistency_error(
            "render batches cached without mesh or indirect buffers".to_string(),
        ));
    };

    cmd.bind_vertex_buffer(vertex_buffer, 0)?;
    cmd.bind_index_buffer(index_buffer, 0, IndexType::U32)?;
    cmd.bind_binding_group(
        &first.layout,
        BindingGroupLayout::CAMERA_SET,
        bindings.camera_set,
        &[bindings.camera_offset],
    )?;
    cmd.bind_binding_group(&first.layout, BindingGroupLayout::OBJECTS_SET, bindings.object_set, &[])?;

    let stride = DrawIndexedIndirectCommand::STRIDE;
    let mut bound_pipeline: Option<&Arc<dyn Pipeline>> = None;
    let mut bound_textures: Option<&Arc<dyn BindingGroup>> = None;

    for batch in &stage.batches {
        if !bound_pipeline.is_some_and(|p| Arc::ptr_eq(p, &batch.pipeline)) {
            cmd.bind_pipeline(&batch.pipeline)?;
            bound_pipeline = Some(&batch.pipeline);
        }
        if let Some(set) = &batch.texture_set {
            if !bound_textures.is_some_and(|s| Arc::ptr_eq(s, set)) {
                cmd.bind_binding_group(&batch.layout, BindingGroupLayout::TEXTURES_SET, set, &[])?;
                bound_textures = Some(set);
            }
        }
        cmd.draw_indexed_indirect(indirect_buffer, batch.offset as u64 * stride as u64, batch.count, stride)?;
    }
    Ok(())
}

fn record_quad(
    cmd: &mut dyn CommandList,
    desc: &RenderStageDescription,
    stage: &RenderStageInstance,
    bindings: &FrameBindings,
    previous_outputs: Option<&Arc<dyn BindingGroup>>,
    effect: Option<(ShaderEffectId, &ShaderEffect)>,
) -> Result<()> {
    let Some((effect_id, effect)) = effect else {
        crate::engine_debug!(LOG_SOURCE, "No global effect for stage '{}', quad skipped", desc.name);
        return Ok(());
    };
    let Some(pipeline) = stage.pipelines.get(&effect_id) else {
        crate::engine_debug!(LOG_SOURCE, "No pipeline for global effect {}, quad skipped", effect_id);
        return Ok(());
    };

    cmd.bind_pipeline(pipeline)?;
    cmd.bind_binding_group(
        &effect.layout,
        BindingGroupLayout::CAMERA_SET,
        bindings.camera_set,
        &[bindings.camera_offset],
    )?;
    cmd.bind_binding_group(&effect.layout, BindingGroupLayout::OBJECTS_SET, bindings.object_set, &[])?;
    if let Some(outputs) = previous_outputs {
        cmd.bind_binding_group(&effect.layout, BindingGroupLayout::TEXTURES_SET, outputs, &[])?;
    }
    cmd.draw(desc.vertex_count, 0)
}

impl Renderer {
    /// Render one frame for every enabled camera
    ///
    /// Queued window notifications are applied first. Without any camera the
    /// call does nothing and the frame number does not advance.
    ///
    /// # Errors
    ///
    /// Backend failures and broken cache invariants are fatal and returned
    /// after being logged.
    pub fn draw(&mut self) -> Result<()> {
        self.process_window_events()?;
        if self.cameras.is_empty() {
            return Ok(());
        }

        let frame_index = self.current_frame_index();
        let frame = &mut self.frames[frame_index];
        frame.fence.wait(WAIT_FOR_FENCES_TIMEOUT)?;
        frame.has_submitted = false;
        self.device.reclaim_transfers()?;

        self.update_storage_buffers();
        self.update_frame_descriptor_sets(frame_index)?;
        self.update_mesh_buffers()?;
        self.write_object_data(frame_index)?;

        let cameras: Vec<CameraId> = self
            .cameras
            .iter()
            .filter(|(_, camera)| camera.enabled)
            .map(|(id, _)| id)
            .collect();
        for camera in cameras {
            self.draw_camera(frame_index, camera)?;
        }

        self.current_frame_number += 1;
        Ok(())
    }

    fn draw_camera(&mut self, frame_index: usize, camera_id: CameraId) -> Result<()> {
        let camera = self
            .cameras
            .get(camera_id)
            .cloned()
            .ok_or_else(|| Self::consistency_error(format!("camera {} vanished during draw", camera_id)))?;
        let index = camera.window as usize;
        if !self.swapchains.get(index).is_some_and(|s| s.enabled) {
            return Err(Self::consistency_error(format!(
                "camera {} targets disconnected window slot {}",
                camera_id, camera.window
            )));
        }

        // Every camera of the frame reuses its buffers and command list
        let frame = &mut self.frames[frame_index];
        if frame.has_submitted {
            frame.fence.wait(WAIT_FOR_FENCES_TIMEOUT)?;
            frame.has_submitted = false;
        }

        if self.swapchains[index].built_internal_textures_version < self.swapchains[index].swapchain_version {
            self.rebuild_internal_texture_sets(index)?;
        }

        let dynamic_offset = camera_dynamic_offset(self.camera_stride, index)?;
        let camera_data = GpuCameraData::new(camera.view_matrix(), camera.projection.matrix());
        self.frames[frame_index]
            .camera_buffer
            .update(u64::from(dynamic_offset), bytemuck::bytes_of(&camera_data))?;

        if self.swapchains[index].built_effects_version < self.effects_version
            && self.build_missing_pipelines(index)?
        {
            self.draw_cache_version += 1;
        }
        if self.swapchains[index].built_draw_cache_version < self.draw_cache_version {
            self.rebuild_draw_cache(index)?;
        }

        let Self {
            frames,
            swapchains,
            config,
            device,
            shader_effects,
            global_effects,
            vertex_buffer,
            index_buffer,
            ..
        } = self;
        let frame = &mut frames[frame_index];
        let slot = &mut swapchains[index];

        let swapchain = slot
            .swapchain
            .as_mut()
            .ok_or_else(|| Self::consistency_error(format!("window slot {} has no swapchain", index)))?;
        let acquired = swapchain.acquire_next_image(frame.image_available.as_ref(), SEMAPHORE_TIMEOUT)?;
        if acquired.suboptimal {
            crate::engine_warn!(LOG_SOURCE, "Swapchain {} is suboptimal on acquire", index);
        }
        let image = acquired.index as usize;

        let (Some(camera_set), Some(object_set)) = (frame.camera_set.as_ref(), frame.object_set.as_ref()) else {
            return Err(Self::consistency_error(format!(
                "frame slot {} has no descriptor sets",
                frame_index
            )));
        };
        let bindings = FrameBindings {
            camera_set,
            object_set,
            camera_offset: dynamic_offset,
        };

        let cmd = frame.command_list.as_mut();
        cmd.begin()?;
        for (stage_index, desc) in config.render_pipeline.stages.iter().enumerate() {
            let stage = &slot.stages[stage_index];
            let framebuffer = stage.framebuffers.get(image).ok_or_else(|| {
                Self::consistency_error(format!("stage '{}' has no framebuffer for image {}", desc.name, image))
            })?;

            cmd.begin_render_pass(&stage.render_pass, framebuffer, &clear_values(desc))?;
            if desc.uses_material_system {
                record_batches(cmd, stage, &bindings, vertex_buffer.as_ref(), index_buffer.as_ref())?;
            } else {
                let previous_outputs = stage_index
                    .checked_sub(1)
                    .and_then(|previous| slot.stages[previous].output_sets.get(image));
                let effect = global_effects
                    .get(&desc.kind)
                    .and_then(|id| shader_effects.get(*id).map(|effect| (*id, effect)));
                record_quad(cmd, desc, stage, &bindings, previous_outputs, effect)?;
            }
            cmd.end_render_pass()?;
        }
        cmd.end()?;

        frame.fence.reset()?;
        device.submit(
            frame.command_list.as_ref(),
            &[frame.image_available.as_ref()],
            &[frame.render_finished.as_ref()],
            frame.fence.as_ref(),
        )?;
        frame.has_submitted = true;

        let status = swapchain.present(acquired.index, frame.render_finished.as_ref())?;
        if status == PresentStatus::Suboptimal {
            crate::engine_warn!(LOG_SOURCE, "Swapchain {} is suboptimal on present", index);
        }
        Ok(())
    }

    // ===== DRAW CACHE =====

    /// First live effect of `kind` in a template, with its position
    fn template_effect(&self, template: &MaterialTemplate, kind: RenderStageKind) -> Option<(usize, ShaderEffectId)> {
        template
            .effects
            .iter()
            .enumerate()
            .find(|(_, id)| self.shader_effects.get(**id).is_some_and(|e| e.kind == kind))
            .map(|(position, id)| (position, *id))
    }

    /// Batches and indirect commands of one material-system stage
    fn build_stage_batches(
        &self,
        desc: &RenderStageDescription,
        stage: &RenderStageInstance,
        model_slots: &FxHashMap<ModelId, u32>,
    ) -> Result<(Vec<RenderBatch>, Vec<DrawIndexedIndirectCommand>)> {
        let mut batches = Vec::new();
        let mut commands = Vec::new();

        for (effect_id, effect) in self.shader_effects.iter().filter(|(_, e)| e.kind == desc.kind) {
            for (template_id, template) in self.material_templates.iter() {
                let Some((effect_position, selected)) = self.template_effect(template, desc.kind) else {
                    continue;
                };
                if selected != effect_id {
                    continue;
                }

                for (material_id, material) in self
                    .materials
                    .iter()
                    .filter(|(_, m)| m.template == template_id && !m.models.is_empty())
                {
                    let pipeline = stage.pipelines.get(&effect_id).ok_or_else(|| {
                        Self::consistency_error(format!(
                            "no pipeline built for effect {} in stage '{}'",
                            effect_id, desc.name
                        ))
                    })?;

                    let offset = commands.len() as u32;
                    for model_id in &material.models {
                        let model = self.models.get(*model_id).ok_or_else(|| {
                            Self::consistency_error(format!(
                                "material {} lists destroyed model {}",
                                material_id, model_id
                            ))
                        })?;
                        let Some(mesh) = self.mesh_parts.get(model.mesh) else {
                            crate::engine_warn!(
                                LOG_SOURCE,
                                "Model {} uses destroyed mesh part {}, skipped",
                                model_id,
                                model.mesh
                            );
                            continue;
                        };
                        if !mesh.is_uploaded {
                            return Err(Self::consistency_error(format!(
                                "model {} uses mesh part {} which is not uploaded",
                                model_id, model.mesh
                            )));
                        }
                        if mesh.part.index_count() == 0 {
                            continue;
                        }
                        let first_instance = model_slots.get(model_id).copied().ok_or_else(|| {
                            Self::consistency_error(format!("model {} has no object slot", model_id))
                        })?;

                        commands.push(DrawIndexedIndirectCommand {
                            index_count: mesh.part.index_count(),
                            instance_count: 1,
                            first_index: mesh.index_offset,
                            vertex_offset: mesh.vertex_offset as i32,
                            first_instance,
                        });
                    }

                    let count = commands.len() as u32 - offset;
                    if count == 0 {
                        continue;
                    }
                    batches.push(RenderBatch {
                        offset,
                        count,
                        effect: effect_id,
                        material: material_id,
                        pipeline: Arc::clone(pipeline),
                        layout: Arc::clone(&effect.layout),
                        texture_set: material.texture_sets.get(effect_position).cloned().flatten(),
                    });
                }
            }
        }
        Ok((batches, commands))
    }

    /// Rebuild the batches and indirect buffers of every material-system stage
    pub(crate) fn rebuild_draw_cache(&mut self, index: usize) -> Result<()> {
        let model_slots: FxHashMap<ModelId, u32> = self
            .models
            .ids()
            .enumerate()
            .map(|(slot, id)| (id, slot as u32))
            .collect();

        let mut built = Vec::with_capacity(self.config.render_pipeline.stages.len());
        for (desc, stage) in self.config.render_pipeline.stages.iter().zip(&self.swapchains[index].stages) {
            if desc.uses_material_system {
                built.push(self.build_stage_batches(desc, stage, &model_slots)?);
            } else {
                built.push((Vec::new(), Vec::new()));
            }
        }

        if self.swapchains[index].stages.iter().any(|s| s.indirect_buffer.is_some()) {
            self.wait_all_frames()?;
        }

        let Self { swapchains, device, draw_cache_version, .. } = self;
        let slot = &mut swapchains[index];
        let mut batch_count = 0;
        for (stage, (batches, commands)) in slot.stages.iter_mut().zip(built) {
            stage.indirect_buffer = None;
            if !commands.is_empty() {
                let buffer = device.create_buffer(&BufferDesc {
                    size: (commands.len() * std::mem::size_of::<DrawIndexedIndirectCommand>()) as u64,
                    usage: BufferUsage::Indirect,
                    location: MemoryLocation::CpuToGpu,
                })?;
                buffer.update(0, bytemuck::cast_slice(&commands))?;
                stage.indirect_buffer = Some(buffer);
            }
            batch_count += batches.len();
            stage.batches = batches;
        }
        slot.built_draw_cache_version = *draw_cache_version;

        crate::engine_debug!(LOG_SOURCE, "Draw cache of swapchain {} rebuilt: {} batches", index, batch_count);
        Ok(())
    }
}
