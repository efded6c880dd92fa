/// Entities stored in the renderer registries

use std::sync::Arc;
use crate::graphics_device::{
    BindingGroup, Pipeline, PipelineLayout, ShaderModule as GpuShaderModule,
    Texture as GpuTexture,
};
use crate::render::{
    MaterialId, MaterialTemplateId, MeshPart, MeshPartId, ModelId, RenderNodeId,
    RenderStageKind, ShaderEffectId, ShaderModuleId, ShaderStage, TextureId, TextureLayout,
};
use crate::utils::Transform;

pub struct ShaderModule {
    pub stage: ShaderStage,
    pub module: Arc<dyn GpuShaderModule>,
}

/// Full pipeline configuration for one render stage kind
pub struct ShaderEffect {
    pub stages: Vec<ShaderModuleId>,
    /// Modules resolved at creation, kept alive with the effect
    pub modules: Vec<Arc<dyn GpuShaderModule>>,
    pub kind: RenderStageKind,
    pub textures: Vec<TextureLayout>,
    pub layout: Arc<dyn PipelineLayout>,
}

/// Candidate effects, one per stage kind; the first effect of a kind wins
pub struct MaterialTemplate {
    pub effects: Vec<ShaderEffectId>,
}

pub struct Material {
    pub template: MaterialTemplateId,
    /// One texture list per template effect
    pub textures: Vec<Vec<TextureId>>,
    /// One set per template effect, `None` when the effect samples no texture
    pub texture_sets: Vec<Option<Arc<dyn BindingGroup>>>,
    /// Images referenced by the texture sets
    pub bound_textures: Vec<Arc<dyn GpuTexture>>,
    /// Models currently using this material
    pub models: Vec<ModelId>,
}

/// Mesh part with its location in the shared vertex and index buffers
pub struct StoredMeshPart {
    pub part: MeshPart,
    /// First vertex of the part in the vertex buffer
    pub vertex_offset: u32,
    /// First index of the part in the index buffer
    pub index_offset: u32,
    pub is_uploaded: bool,
}

pub struct Model {
    pub mesh: MeshPartId,
    pub material: MaterialId,
    pub transform: Transform,
    /// Render nodes placing this model
    pub instances: Vec<RenderNodeId>,
}

pub struct RenderNode {
    pub model: ModelId,
}

pub struct Texture {
    pub texture: Arc<dyn GpuTexture>,
}

/// Contiguous run of models drawn with one material
#[derive(Clone)]
pub struct RenderBatch {
    /// Index of the first command in the stage's indirect buffer
    pub offset: u32,
    pub count: u32,
    pub effect: ShaderEffectId,
    pub material: MaterialId,
    pub pipeline: Arc<dyn Pipeline>,
    pub layout: Arc<dyn PipelineLayout>,
    pub texture_set: Option<Arc<dyn BindingGroup>>,
}

impl std::fmt::Debug for RenderBatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderBatch")
            .field("offset", &self.offset)
            .field("count", &self.count)
            .field("effect", &self.effect)
            .field("material", &self.material)
            .finish()
    }
}
