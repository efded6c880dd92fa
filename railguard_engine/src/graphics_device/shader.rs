/// Shader module trait

use crate::render::ShaderStage;

/// One compiled shader stage
pub trait ShaderModule: Send + Sync {
    fn stage(&self) -> ShaderStage;
}
