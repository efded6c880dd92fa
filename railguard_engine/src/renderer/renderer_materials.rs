/// Material system registries: shader modules, shader effects, material
/// templates, materials and textures

use std::path::Path;
use std::sync::Arc;

use crate::error::Result;
use crate::graphics_device::{BindingGroupLayout, BindingResource, Texture as GpuTexture, TextureDesc};
use crate::render::{
    FilterMode, MaterialId, MaterialTemplateId, ModelId, RenderStageKind, ShaderEffectId,
    ShaderModuleId, ShaderStage, TextureId, TextureLayout, NULL_ID,
};
use crate::renderer::entities::{
    Material, MaterialTemplate, ShaderEffect, ShaderModule, Texture,
};
use crate::renderer::renderer::{Renderer, LOG_SOURCE};

impl Renderer {
    // ===== SHADER MODULES =====

    /// Create a shader module from SPIR-V bytes
    pub fn create_shader_module(&mut self, code: &[u8], stage: ShaderStage) -> Result<ShaderModuleId> {
        let module = self.device.create_shader_module(code, stage)?;
        let id = self.shader_modules.push(ShaderModule { stage, module });
        crate::engine_trace!(LOG_SOURCE, "Shader module {} created ({:?}, {} bytes)", id, stage, code.len());
        Ok(id)
    }

    /// Read a SPIR-V file and create a shader module from it
    ///
    /// # Errors
    ///
    /// An unreadable file is an [`InvalidResource`](crate::railguard::Error::InvalidResource) error.
    pub fn load_shader_module(&mut self, path: impl AsRef<Path>, stage: ShaderStage) -> Result<ShaderModuleId> {
        let path = path.as_ref();
        let code = std::fs::read(path).map_err(|e| {
            Self::invalid_resource(format!("cannot read shader file {}: {}", path.display(), e))
        })?;
        self.create_shader_module(&code, stage)
    }

    /// Remove a shader module. Effects built from it keep the module alive.
    pub fn destroy_shader_module(&mut self, id: ShaderModuleId) {
        self.shader_modules.remove(id);
    }

    pub fn clear_shader_modules(&mut self) {
        self.shader_modules.clear();
    }

    pub fn get_shader_module_stage(&self, id: ShaderModuleId) -> Option<ShaderStage> {
        self.shader_modules.get(id).map(|m| m.stage)
    }

    // ===== SHADER EFFECTS =====

    /// Create a shader effect
    ///
    /// # Arguments
    ///
    /// * `stages` - Shader modules in pipeline order, at least one
    /// * `kind` - Render stage kind the effect draws in
    /// * `textures` - Layout of the effect's texture set (set 2), empty for none
    pub fn create_shader_effect(
        &mut self,
        stages: &[ShaderModuleId],
        kind: RenderStageKind,
        textures: &[TextureLayout],
    ) -> Result<ShaderEffectId> {
        if stages.is_empty() {
            return Err(Self::invalid_resource("shader effect needs at least one stage".to_string()));
        }

        let modules = stages
            .iter()
            .map(|id| {
                self.shader_modules
                    .get(*id)
                    .map(|m| Arc::clone(&m.module))
                    .ok_or_else(|| Self::invalid_resource(format!("shader module {} does not exist", id)))
            })
            .collect::<Result<Vec<_>>>()?;

        let layout = self.device.create_pipeline_layout(textures)?;

        let id = self.shader_effects.push(ShaderEffect {
            stages: stages.to_vec(),
            modules,
            kind,
            textures: textures.to_vec(),
            layout,
        });
        self.effects_version += 1;

        crate::engine_trace!(LOG_SOURCE, "Shader effect {} created for {:?}", id, kind);
        Ok(id)
    }

    /// Destroy a shader effect and the pipelines built from it
    pub fn destroy_shader_effect(&mut self, id: ShaderEffectId) -> Result<()> {
        if !self.shader_effects.contains(id) {
            return Ok(());
        }
        self.wait_all_frames()?;

        self.shader_effects.remove(id);
        for swapchain in &mut self.swapchains {
            for stage in &mut swapchain.stages {
                stage.pipelines.remove(&id);
            }
        }
        self.global_effects.retain(|_, effect| *effect != id);
        self.draw_cache_version += 1;
        Ok(())
    }

    pub fn clear_shader_effects(&mut self) -> Result<()> {
        self.wait_all_frames()?;

        self.shader_effects.clear();
        for swapchain in &mut self.swapchains {
            for stage in &mut swapchain.stages {
                stage.pipelines.clear();
            }
        }
        self.global_effects.clear();
        self.draw_cache_version += 1;
        Ok(())
    }

    /// Select the effect drawn by the full-screen quad stages of `kind`
    pub fn set_global_shader_effect(&mut self, kind: RenderStageKind, effect: ShaderEffectId) -> Result<()> {
        let stored = self
            .shader_effects
            .get(effect)
            .ok_or_else(|| Self::invalid_resource(format!("shader effect {} does not exist", effect)))?;
        if stored.kind != kind {
            return Err(Self::invalid_resource(format!(
                "shader effect {} is a {:?} effect, not {:?}",
                effect, stored.kind, kind
            )));
        }
        self.global_effects.insert(kind, effect);
        Ok(())
    }

    pub fn get_global_shader_effect(&self, kind: RenderStageKind) -> Option<ShaderEffectId> {
        self.global_effects.get(&kind).copied()
    }

    // ===== MATERIAL TEMPLATES =====

    /// Create a material template from candidate effects
    ///
    /// For each render stage kind, the first listed effect of that kind is used.
    pub fn create_material_template(&mut self, effects: &[ShaderEffectId]) -> Result<MaterialTemplateId> {
        if effects.is_empty() {
            return Err(Self::invalid_resource("material template needs at least one effect".to_string()));
        }
        if let Some(missing) = effects.iter().find(|id| !self.shader_effects.contains(**id)) {
            return Err(Self::invalid_resource(format!("shader effect {} does not exist", missing)));
        }

        let id = self.material_templates.push(MaterialTemplate { effects: effects.to_vec() });
        self.draw_cache_version += 1;
        Ok(id)
    }

    pub fn destroy_material_template(&mut self, id: MaterialTemplateId) {
        if self.material_templates.remove(id).is_some() {
            self.draw_cache_version += 1;
        }
    }

    pub fn clear_material_templates(&mut self) {
        self.material_templates.clear();
        self.draw_cache_version += 1;
    }

    // ===== MATERIALS =====

    /// Create a material
    ///
    /// # Arguments
    ///
    /// * `template` - Material template the material instantiates
    /// * `textures` - One texture list per template effect, matching the
    ///   effect's texture layout. Missing trailing lists count as empty.
    pub fn create_material(
        &mut self,
        template: MaterialTemplateId,
        textures: Vec<Vec<TextureId>>,
    ) -> Result<MaterialId> {
        let stored_template = self
            .material_templates
            .get(template)
            .ok_or_else(|| Self::invalid_resource(format!("material template {} does not exist", template)))?;

        if textures.len() > stored_template.effects.len() {
            return Err(Self::invalid_resource(format!(
                "{} texture lists given for a template of {} effects",
                textures.len(),
                stored_template.effects.len()
            )));
        }

        let mut texture_sets = Vec::with_capacity(stored_template.effects.len());
        let mut bound_textures: Vec<Arc<dyn GpuTexture>> = Vec::new();

        for (index, effect_id) in stored_template.effects.iter().enumerate() {
            let effect = self
                .shader_effects
                .get(*effect_id)
                .ok_or_else(|| Self::invalid_resource(format!("shader effect {} does not exist", effect_id)))?;

            let list = textures.get(index).map(Vec::as_slice).unwrap_or(&[]);
            if list.len() != effect.textures.len() {
                return Err(Self::invalid_resource(format!(
                    "effect {} samples {} textures, {} given",
                    effect_id,
                    effect.textures.len(),
                    list.len()
                )));
            }
            if list.is_empty() {
                texture_sets.push(None);
                continue;
            }

            let images = list
                .iter()
                .map(|id| {
                    self.textures
                        .get(*id)
                        .map(|t| Arc::clone(&t.texture))
                        .ok_or_else(|| Self::invalid_resource(format!("texture {} does not exist", id)))
                })
                .collect::<Result<Vec<_>>>()?;

            let resources: Vec<BindingResource> = images
                .iter()
                .map(|image| BindingResource::SampledTexture(image.as_ref()))
                .collect();
            let set = self
                .material_pool
                .allocate(&BindingGroupLayout::Textures(effect.textures.clone()), &resources)?;

            texture_sets.push(Some(set));
            bound_textures.extend(images);
        }

        let id = self.materials.push(Material {
            template,
            textures,
            texture_sets,
            bound_textures,
            models: Vec::new(),
        });
        self.draw_cache_version += 1;
        Ok(id)
    }

    /// Destroy a material
    ///
    /// Models using it keep the dangling id and are no longer drawn.
    pub fn destroy_material(&mut self, id: MaterialId) -> Result<()> {
        if !self.materials.contains(id) {
            return Ok(());
        }
        self.wait_all_frames()?;
        self.materials.remove(id);
        self.draw_cache_version += 1;
        Ok(())
    }

    pub fn clear_materials(&mut self) -> Result<()> {
        self.wait_all_frames()?;
        self.materials.clear();
        self.material_pool.reset()?;
        self.draw_cache_version += 1;
        Ok(())
    }

    pub fn get_material_template(&self, id: MaterialId) -> Option<MaterialTemplateId> {
        self.materials.get(id).map(|m| m.template)
    }

    /// Models currently using a material
    pub fn get_material_models(&self, id: MaterialId) -> Option<&[ModelId]> {
        self.materials.get(id).map(|m| m.models.as_slice())
    }

    // ===== TEXTURES =====

    /// Decode an image file and upload it as an RGBA8 texture
    ///
    /// An unreadable or undecodable file is logged and yields [`NULL_ID`].
    pub fn load_texture(&mut self, path: impl AsRef<Path>, filter: FilterMode) -> Result<TextureId> {
        let path = path.as_ref();
        let image = match image::open(path) {
            Ok(image) => image.to_rgba8(),
            Err(e) => {
                crate::engine_warn!(LOG_SOURCE, "Cannot load texture {}: {}", path.display(), e);
                return Ok(NULL_ID);
            }
        };
        let (width, height) = image.dimensions();
        self.create_texture_from_pixels(width, height, image.as_raw(), filter)
    }

    /// Create a texture from tightly packed RGBA8 pixels
    pub fn create_texture_from_pixels(
        &mut self,
        width: u32,
        height: u32,
        pixels: &[u8],
        filter: FilterMode,
    ) -> Result<TextureId> {
        let desc = TextureDesc { width, height, filter };
        if width == 0 || height == 0 {
            return Err(Self::invalid_resource(format!("texture size {}x{} is empty", width, height)));
        }
        if pixels.len() as u64 != desc.data_size() {
            return Err(Self::invalid_resource(format!(
                "{} pixel bytes given for a {}x{} RGBA8 texture",
                pixels.len(),
                width,
                height
            )));
        }

        let texture = self.device.create_texture(&desc)?;
        self.device.upload_texture(&texture, pixels)?;

        let id = self.textures.push(Texture { texture });
        crate::engine_debug!(LOG_SOURCE, "Texture {} uploaded ({}x{})", id, width, height);
        Ok(id)
    }

    /// Remove a texture. Materials sampling it keep the image alive.
    pub fn destroy_texture(&mut self, id: TextureId) -> Result<()> {
        if !self.textures.contains(id) {
            return Ok(());
        }
        self.wait_all_frames()?;
        self.textures.remove(id);
        Ok(())
    }

    pub fn clear_textures(&mut self) -> Result<()> {
        self.wait_all_frames()?;
        self.textures.clear();
        Ok(())
    }
}
