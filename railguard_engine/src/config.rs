/// Renderer configuration and validation-layer message routing

use crate::error::{Error, Result};
use crate::render::{basic_forward_render_pipeline, RenderPipelineDescription, Version};

// ============================================================================
// Validation layer routing
// ============================================================================

/// Minimum severity of validation messages to display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugSeverity {
    ErrorsOnly,
    ErrorsAndWarnings,
    All,
}

/// Where validation messages are written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebugOutput {
    /// stderr, colored
    Console,
    /// Append to the file at this path
    File(String),
    Both(String),
}

/// Message categories to display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebugMessageFilter {
    pub show_general: bool,
    pub show_validation: bool,
    pub show_performance: bool,
}

impl Default for DebugMessageFilter {
    fn default() -> Self {
        Self {
            show_general: true,
            show_validation: true,
            show_performance: true,
        }
    }
}

/// Counters of validation messages received since the renderer was created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ValidationStats {
    pub errors: u32,
    pub warnings: u32,
    pub info: u32,
    pub verbose: u32,
}

impl ValidationStats {
    pub fn total(&self) -> u32 {
        self.errors + self.warnings + self.info + self.verbose
    }

    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }
}

// ============================================================================
// RendererConfig
// ============================================================================

#[derive(Debug, Clone)]
pub struct RendererConfig {
    pub application_name: String,
    pub application_version: Version,
    /// Number of swapchain slots (windows that can be connected at once)
    pub window_capacity: u32,
    pub render_pipeline: RenderPipelineDescription,

    /// Enable validation layers and the debug messenger
    pub enable_validation: bool,
    pub debug_severity: DebugSeverity,
    pub debug_output: DebugOutput,
    pub debug_message_filter: DebugMessageFilter,
    /// Abort the process on the first validation error
    pub break_on_validation_error: bool,
    /// Panic on the first validation error
    pub panic_on_error: bool,
    pub enable_validation_stats: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            application_name: "Railguard Application".to_string(),
            application_version: Version::new(1, 0, 0),
            window_capacity: 1,
            render_pipeline: basic_forward_render_pipeline(),
            enable_validation: cfg!(debug_assertions),
            debug_severity: DebugSeverity::ErrorsAndWarnings,
            debug_output: DebugOutput::Console,
            debug_message_filter: DebugMessageFilter::default(),
            break_on_validation_error: false,
            panic_on_error: false,
            enable_validation_stats: false,
        }
    }
}

impl RendererConfig {
    /// # Errors
    ///
    /// Returns `Error::InitializationFailed` if `window_capacity` is zero or the
    /// render pipeline description is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.window_capacity == 0 {
            return Err(Error::InitializationFailed(
                "window_capacity must be at least 1".to_string(),
            ));
        }
        self.render_pipeline.validate()
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
