/// CPU/GPU synchronization primitives

use crate::error::Result;

/// Signaled by the GPU when a submission completes; waited on by the CPU
pub trait Fence: Send + Sync {
    /// Block until signaled
    ///
    /// # Errors
    ///
    /// Returns `Error::Timeout` if the fence is still unsignaled after `timeout_ns`.
    fn wait(&self, timeout_ns: u64) -> Result<()>;

    fn reset(&self) -> Result<()>;
}

/// GPU-side ordering between queue operations
pub trait Semaphore: Send + Sync {}
