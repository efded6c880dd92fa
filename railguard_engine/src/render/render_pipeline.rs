/// Render pipeline description - the static list of render stages a renderer runs each frame
///
/// A stage either draws the scene through the material batching path, or draws
/// a full-screen quad with the global shader effect registered for its kind.
/// A quad stage samples the color outputs of the stage right before it.

use crate::error::{Error, Result};
use crate::render::{Format, ImageLayout, RenderStageKind};

/// One attachment written by a render stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderStageAttachmentDescription {
    pub format: Format,
    pub initial_layout: ImageLayout,
    pub final_layout: ImageLayout,
}

impl RenderStageAttachmentDescription {
    pub const fn new(format: Format, final_layout: ImageLayout) -> Self {
        Self {
            format,
            initial_layout: ImageLayout::UNDEFINED,
            final_layout,
        }
    }

    pub fn is_depth(&self) -> bool {
        self.format.is_depth()
    }

    pub fn is_present(&self) -> bool {
        self.final_layout == ImageLayout::PRESENT_SRC
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderStageDescription {
    pub name: String,
    pub kind: RenderStageKind,
    pub attachments: Vec<RenderStageAttachmentDescription>,
    /// Draw the batched scene geometry (true) or a full-screen quad (false)
    pub uses_material_system: bool,
    /// Vertex count of the quad draw
    pub vertex_count: u32,
    pub do_depth_test: bool,
}

impl RenderStageDescription {
    pub fn new(name: &str, kind: RenderStageKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            attachments: Vec::new(),
            uses_material_system: true,
            vertex_count: 6,
            do_depth_test: false,
        }
    }

    pub fn with_attachment(mut self, attachment: RenderStageAttachmentDescription) -> Self {
        self.attachments.push(attachment);
        self
    }

    pub fn with_material_system(mut self, uses_material_system: bool) -> Self {
        self.uses_material_system = uses_material_system;
        self
    }

    pub fn with_depth_test(mut self, do_depth_test: bool) -> Self {
        self.do_depth_test = do_depth_test;
        self
    }

    /// Color attachments in declaration order
    pub fn color_attachments(&self) -> impl Iterator<Item = &RenderStageAttachmentDescription> {
        self.attachments.iter().filter(|a| !a.is_depth())
    }

    pub fn color_attachment_count(&self) -> usize {
        self.color_attachments().count()
    }

    pub fn depth_attachment(&self) -> Option<&RenderStageAttachmentDescription> {
        self.attachments.iter().find(|a| a.is_depth())
    }

    /// Color outputs other stages can sample (everything but the presented image)
    pub fn sampled_output_count(&self) -> usize {
        self.color_attachments().filter(|a| !a.is_present()).count()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderPipelineDescription {
    pub stages: Vec<RenderStageDescription>,
}

impl RenderPipelineDescription {
    pub fn new(stages: Vec<RenderStageDescription>) -> Self {
        Self { stages }
    }

    /// Check the structural rules every pipeline must follow
    ///
    /// # Errors
    ///
    /// Returns `Error::InitializationFailed` if:
    /// - There is no stage
    /// - A stage has kind `INVALID` or an attachment of format `UNDEFINED`
    /// - The pipeline does not have exactly one presented attachment, in its last stage
    /// - A stage declares more than one depth attachment
    /// - A depth-tested stage has no depth attachment
    pub fn validate(&self) -> Result<()> {
        if self.stages.is_empty() {
            return Err(Error::InitializationFailed(
                "Render pipeline has no stage".to_string(),
            ));
        }

        let mut present_count = 0;
        let last = self.stages.len() - 1;
        for (index, stage) in self.stages.iter().enumerate() {
            if stage.kind == RenderStageKind::INVALID {
                return Err(Error::InitializationFailed(format!(
                    "Render stage '{}' has kind INVALID", stage.name
                )));
            }
            if stage.attachments.iter().any(|a| a.format == Format::UNDEFINED) {
                return Err(Error::InitializationFailed(format!(
                    "Render stage '{}' has an attachment of format UNDEFINED", stage.name
                )));
            }

            let depth_count = stage.attachments.iter().filter(|a| a.is_depth()).count();
            if depth_count > 1 {
                return Err(Error::InitializationFailed(format!(
                    "Render stage '{}' declares {} depth attachments (max 1)",
                    stage.name, depth_count
                )));
            }
            if stage.do_depth_test && depth_count == 0 {
                return Err(Error::InitializationFailed(format!(
                    "Render stage '{}' does depth test without a depth attachment", stage.name
                )));
            }

            let stage_presents = stage.attachments.iter().filter(|a| a.is_present()).count();
            if stage_presents > 0 && index != last {
                return Err(Error::InitializationFailed(format!(
                    "Render stage '{}' presents but is not the last stage", stage.name
                )));
            }
            present_count += stage_presents;
        }

        if present_count != 1 {
            return Err(Error::InitializationFailed(format!(
                "Render pipeline must present exactly one attachment, found {}",
                present_count
            )));
        }

        self.warn_unvalidated_layouts();
        Ok(())
    }

    fn warn_unvalidated_layouts(&self) {
        if self.stages.len() > 2 {
            crate::engine_warn!("railguard::Renderer",
                "Render pipeline has {} stages; only one and two stage layouts are validated",
                self.stages.len());
        }
        for pair in self.stages.windows(2) {
            if !pair[0].uses_material_system && !pair[1].uses_material_system {
                crate::engine_warn!("railguard::Renderer",
                    "Quad stage '{}' follows quad stage '{}'; chained quad stages are not validated",
                    pair[1].name, pair[0].name);
            }
        }
    }
}

impl Default for RenderPipelineDescription {
    fn default() -> Self {
        basic_forward_render_pipeline()
    }
}

// ===== PRESETS =====

/// Geometry stage writing a G-buffer, then a lighting quad stage presenting to the window
pub fn deferred_render_pipeline() -> RenderPipelineDescription {
    let gbuffer = |format| RenderStageAttachmentDescription::new(format, ImageLayout::SHADER_READ_ONLY_OPTIMAL);

    RenderPipelineDescription::new(vec![
        RenderStageDescription::new("geometry", RenderStageKind::DEFERRED_GEOMETRY)
            .with_attachment(gbuffer(Format::R16G16B16A16_SFLOAT))
            .with_attachment(gbuffer(Format::R16G16B16A16_SFLOAT))
            .with_attachment(gbuffer(Format::R8G8B8A8_SRGB)),
        RenderStageDescription::new("lighting", RenderStageKind::DEFERRED_LIGHTING)
            .with_attachment(RenderStageAttachmentDescription::new(
                Format::WINDOW_FORMAT, ImageLayout::PRESENT_SRC,
            ))
            .with_material_system(false),
    ])
}

/// Single depth-tested stage drawing the scene straight to the window
pub fn basic_forward_render_pipeline() -> RenderPipelineDescription {
    RenderPipelineDescription::new(vec![
        RenderStageDescription::new("forward", RenderStageKind::FORWARD)
            .with_attachment(RenderStageAttachmentDescription::new(
                Format::WINDOW_FORMAT, ImageLayout::PRESENT_SRC,
            ))
            .with_attachment(RenderStageAttachmentDescription::new(
                Format::D32_SFLOAT, ImageLayout::DEPTH_STENCIL_OPTIMAL,
            ))
            .with_depth_test(true),
    ])
}

#[cfg(test)]
#[path = "render_pipeline_tests.rs"]
mod tests;
