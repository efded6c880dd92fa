/// Fence and Semaphore - Vulkan implementations of the device sync traits

use railguard_engine::railguard::device::{Fence as DeviceFence, Semaphore as DeviceSemaphore};
use railguard_engine::railguard::{Error, Result};
use railguard_engine::{engine_err, engine_warn};
use ash::vk;

/// Vulkan fence implementation
pub struct Fence {
    pub(crate) fence: vk::Fence,
    device: ash::Device,
}

impl Fence {
    pub(crate) fn new(device: ash::Device, signaled: bool) -> Result<Self> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };
        let create_info = vk::FenceCreateInfo::default().flags(flags);

        let fence = unsafe { device.create_fence(&create_info, None) }
            .map_err(|e| engine_err!("railguard::vulkan", "Failed to create fence: {:?}", e))?;

        Ok(Self { fence, device })
    }
}

impl DeviceFence for Fence {
    fn wait(&self, timeout_ns: u64) -> Result<()> {
        unsafe {
            match self.device.wait_for_fences(&[self.fence], true, timeout_ns) {
                Ok(()) => Ok(()),
                Err(vk::Result::TIMEOUT) => {
                    engine_warn!("railguard::vulkan", "Fence still unsignaled after {} ns", timeout_ns);
                    Err(Error::Timeout(format!("fence wait exceeded {} ns", timeout_ns)))
                }
                Err(e) => Err(engine_err!("railguard::vulkan", "Failed to wait for fence: {:?}", e)),
            }
        }
    }

    fn reset(&self) -> Result<()> {
        unsafe {
            self.device
                .reset_fences(&[self.fence])
                .map_err(|e| engine_err!("railguard::vulkan", "Failed to reset fence: {:?}", e))
        }
    }
}

impl Drop for Fence {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_fence(self.fence, None);
        }
    }
}

/// Vulkan binary semaphore implementation
pub struct Semaphore {
    pub(crate) semaphore: vk::Semaphore,
    device: ash::Device,
}

impl Semaphore {
    pub(crate) fn new(device: ash::Device) -> Result<Self> {
        let semaphore = unsafe { device.create_semaphore(&vk::SemaphoreCreateInfo::default(), None) }
            .map_err(|e| engine_err!("railguard::vulkan", "Failed to create semaphore: {:?}", e))?;

        Ok(Self { semaphore, device })
    }
}

impl DeviceSemaphore for Semaphore {}

impl Drop for Semaphore {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_semaphore(self.semaphore, None);
        }
    }
}
