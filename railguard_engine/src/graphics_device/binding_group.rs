/// BindingGroup traits, layouts and descriptor pools
///
/// A BindingGroup is an immutable set of GPU resource bindings (a descriptor
/// set). Binding groups are allocated from a [`DescriptorPool`] and are never
/// freed individually: resetting the pool reclaims all of them at once.

use std::sync::Arc;
use crate::error::Result;
use crate::graphics_device::{Buffer, Texture};
use crate::render::TextureLayout;

// ============================================================================
// Layouts
// ============================================================================

/// Layout of one binding set, shared by every pipeline layout
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BindingGroupLayout {
    /// Set 0: one dynamic uniform buffer read by the vertex stage
    Camera,
    /// Set 1: one storage buffer read by the vertex stage
    Objects,
    /// Set 2: one combined image sampler per entry
    Textures(Vec<TextureLayout>),
}

impl BindingGroupLayout {
    pub const CAMERA_SET: u32 = 0;
    pub const OBJECTS_SET: u32 = 1;
    pub const TEXTURES_SET: u32 = 2;

    pub fn set_index(&self) -> u32 {
        match self {
            BindingGroupLayout::Camera => Self::CAMERA_SET,
            BindingGroupLayout::Objects => Self::OBJECTS_SET,
            BindingGroupLayout::Textures(_) => Self::TEXTURES_SET,
        }
    }

    pub fn binding_count(&self) -> usize {
        match self {
            BindingGroupLayout::Camera | BindingGroupLayout::Objects => 1,
            BindingGroupLayout::Textures(textures) => textures.len(),
        }
    }
}

// ============================================================================
// Binding resources (concrete data passed at allocation time)
// ============================================================================

/// A concrete resource to bind, in binding order
pub enum BindingResource<'a> {
    /// Dynamic uniform buffer binding; `range` bytes are visible from each dynamic offset
    UniformBuffer { buffer: &'a dyn Buffer, range: u64 },
    /// Whole storage buffer
    StorageBuffer(&'a dyn Buffer),
    /// Sampled texture with its own sampler
    SampledTexture(&'a dyn Texture),
}

// ============================================================================
// Traits
// ============================================================================

/// An immutable set of GPU resource bindings.
pub trait BindingGroup: Send + Sync {
    /// Returns the set index this BindingGroup was created for
    fn set_index(&self) -> u32;
}

/// Sizes of a descriptor pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorPoolDesc {
    pub max_sets: u32,
    pub uniform_buffers: u32,
    pub storage_buffers: u32,
    pub sampled_textures: u32,
    /// Chain a new pool of the same size when this one is exhausted
    pub growable: bool,
}

pub trait DescriptorPool: Send + Sync {
    /// Allocate and write one binding group
    fn allocate(
        &mut self,
        layout: &BindingGroupLayout,
        resources: &[BindingResource],
    ) -> Result<Arc<dyn BindingGroup>>;

    /// Reclaim every binding group allocated from this pool
    fn reset(&mut self) -> Result<()>;
}
