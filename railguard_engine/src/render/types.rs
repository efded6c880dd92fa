/// Identifiers, versions and enums of the scene API

use bitflags::bitflags;

pub use crate::utils::{Id, NULL_ID};

// ===== HANDLES =====

pub type ShaderModuleId = Id;
pub type ShaderEffectId = Id;
pub type MaterialTemplateId = Id;
pub type MaterialId = Id;
pub type MeshPartId = Id;
pub type ModelId = Id;
pub type RenderNodeId = Id;
pub type TextureId = Id;
pub type CameraId = Id;

/// Index of a swapchain slot (one per connected window)
pub type WindowIndex = u32;

// ===== VERSION =====

/// Semantic version triple
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self { major, minor, patch }
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Version of this engine, reported to the graphics driver
pub const ENGINE_VERSION: Version = Version::new(0, 1, 0);

// ===== FORMATS & LAYOUTS =====

/// Pixel format of attachments and textures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum Format {
    UNDEFINED,
    /// Placeholder resolved to the surface format of the window the stage renders to
    WINDOW_FORMAT,
    D32_SFLOAT,
    B8G8R8A8_SRGB,
    R8G8B8A8_SRGB,
    R8G8B8A8_UINT,
    R16G16B16A16_SFLOAT,
}

impl Format {
    pub fn is_depth(&self) -> bool {
        matches!(self, Format::D32_SFLOAT)
    }
}

/// Image layout an attachment starts or ends a render pass in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum ImageLayout {
    UNDEFINED,
    SHADER_READ_ONLY_OPTIMAL,
    PRESENT_SRC,
    DEPTH_STENCIL_OPTIMAL,
}

/// Texture sampling filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum FilterMode {
    NEAREST,
    LINEAR,
}

bitflags! {
    /// Shader stages a module or a binding belongs to
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ShaderStage: u32 {
        const VERTEX = 1;
        const FRAGMENT = 2;
    }
}

/// Kind of a render stage; shader effects are matched to stages by kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum RenderStageKind {
    INVALID,
    FORWARD,
    DEFERRED_GEOMETRY,
    DEFERRED_LIGHTING,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum CameraType {
    PERSPECTIVE,
    ORTHOGRAPHIC,
}

/// One texture binding of a shader effect's texture set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureLayout {
    pub stages: ShaderStage,
}

impl Default for TextureLayout {
    fn default() -> Self {
        Self { stages: ShaderStage::FRAGMENT }
    }
}
