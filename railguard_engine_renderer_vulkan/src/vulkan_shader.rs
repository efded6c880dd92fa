/// ShaderModule - Vulkan implementation of the device ShaderModule trait

use railguard_engine::railguard::device::ShaderModule as DeviceShaderModule;
use railguard_engine::railguard::render::ShaderStage;
use railguard_engine::railguard::Result;
use railguard_engine::{engine_bail, engine_bail_warn, engine_err};
use ash::vk;
use std::io::Cursor;

/// Entry point every shader module must expose
pub(crate) const ENTRY_POINT: &std::ffi::CStr = c"main";

/// Vulkan shader module implementation
pub struct ShaderModule {
    /// Vulkan shader module
    pub(crate) module: vk::ShaderModule,
    pub(crate) stage: ShaderStage,
    /// Vulkan device (for cleanup)
    pub(crate) device: ash::Device,
}

/// Decode SPIR-V bytes into words
pub(crate) fn spirv_words(code: &[u8]) -> Result<Vec<u32>> {
    if code.is_empty() || code.len() % 4 != 0 {
        engine_bail_warn!("railguard::vulkan",
            "Shader code is not a sequence of 32-bit words (size: {} bytes)", code.len());
    }
    ash::util::read_spv(&mut Cursor::new(code))
        .map_err(|e| engine_err!("railguard::vulkan", "Invalid SPIR-V: {}", e))
}

/// Names of the entry points declared by a SPIR-V module
fn entry_point_names(code: &[u32]) -> Result<Vec<String>> {
    let entry_points = spirq::ReflectConfig::new()
        .spv(code)
        .ref_all_rscs(true)
        .reflect()
        .map_err(|e| engine_err!("railguard::vulkan", "SPIR-V reflection failed: {:?}", e))?;

    Ok(entry_points.into_iter().map(|entry_point| entry_point.name).collect())
}

impl ShaderModule {
    pub(crate) fn create(device: &ash::Device, code: &[u8], stage: ShaderStage) -> Result<Self> {
        if stage != ShaderStage::VERTEX && stage != ShaderStage::FRAGMENT {
            engine_bail!("railguard::vulkan", "A shader module has exactly one stage, got {:?}", stage);
        }

        let words = spirv_words(code)?;
        let names = entry_point_names(&words)?;
        if !names.iter().any(|name| name == "main") {
            engine_bail!("railguard::vulkan",
                "{:?} shader has no 'main' entry point (found: {:?})", stage, names);
        }

        let create_info = vk::ShaderModuleCreateInfo::default().code(&words);
        let module = unsafe { device.create_shader_module(&create_info, None) }
            .map_err(|e| engine_err!("railguard::vulkan", "Failed to create shader module: {:?}", e))?;

        Ok(Self {
            module,
            stage,
            device: device.clone(),
        })
    }
}

impl DeviceShaderModule for ShaderModule {
    fn stage(&self) -> ShaderStage {
        self.stage
    }
}

impl Drop for ShaderModule {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_shader_module(self.module, None);
        }
    }
}
