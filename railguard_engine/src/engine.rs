/// Railguard Engine - Singleton manager for engine subsystems
///
/// This module owns the process-global logger and an optional renderer
/// singleton. Thread-safe static storage with RwLock guards both.

use std::sync::{OnceLock, RwLock, Arc, Mutex};
use std::time::SystemTime;
use crate::renderer::Renderer;
use crate::error::{Result, Error};
use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};

// ===== INTERNAL STATE =====

/// Global engine state storage
static ENGINE_STATE: OnceLock<EngineState> = OnceLock::new();

/// Global logger (initialized with DefaultLogger)
static LOGGER: OnceLock<RwLock<Box<dyn Logger>>> = OnceLock::new();

/// Internal state structure holding all engine singletons
struct EngineState {
    /// Renderer singleton (the renderer itself is single-thread owned, the Mutex hands it over)
    renderer: RwLock<Option<Arc<Mutex<Renderer>>>>,
}

impl EngineState {
    fn new() -> Self {
        Self {
            renderer: RwLock::new(None),
        }
    }
}

// ===== PUBLIC API =====

/// Main engine singleton manager
///
/// # Example
///
/// ```ignore
/// use railguard_engine::railguard::{Engine, Renderer, RendererConfig};
///
/// Engine::initialize()?;
/// Engine::create_renderer(Renderer::new(device, RendererConfig::default())?)?;
///
/// let renderer = Engine::renderer()?;
/// renderer.lock().unwrap().draw()?;
///
/// Engine::shutdown();
/// # Ok::<(), railguard_engine::railguard::Error>(())
/// ```
pub struct Engine;

impl Engine {
    /// Helper to log errors before returning them (internal use)
    fn log_and_return_error(error: Error) -> Error {
        match &error {
            Error::InitializationFailed(msg) => {
                crate::engine_error!("railguard::Engine", "Initialization failed: {}", msg);
            }
            Error::BackendError(msg) => {
                crate::engine_error!("railguard::Engine", "Backend error: {}", msg);
            }
            _ => {
                crate::engine_error!("railguard::Engine", "Engine error: {}", error);
            }
        }
        error
    }

    /// Initialize the engine
    ///
    /// Must be called once at application startup before registering a renderer.
    /// Calling it again is a no-op.
    ///
    /// # Errors
    ///
    /// Currently always succeeds, but returns Result for future extensibility.
    pub fn initialize() -> Result<()> {
        ENGINE_STATE.get_or_init(EngineState::new);
        Ok(())
    }

    /// Shutdown the engine and destroy the renderer singleton
    ///
    /// The renderer is dropped here if no other handle to it is alive, which
    /// runs its full GPU teardown.
    pub fn shutdown() {
        if let Some(state) = ENGINE_STATE.get() {
            if let Ok(mut renderer) = state.renderer.write() {
                *renderer = None;
            }
        }
    }

    /// Register the renderer singleton
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The engine is not initialized
    /// - A renderer already exists
    /// - The renderer lock is poisoned
    pub fn create_renderer(renderer: Renderer) -> Result<Arc<Mutex<Renderer>>> {
        let state = ENGINE_STATE.get()
            .ok_or_else(|| Self::log_and_return_error(
                Error::InitializationFailed("Engine not initialized. Call Engine::initialize() first.".to_string())
            ))?;

        let mut lock = state.renderer.write()
            .map_err(|_| Self::log_and_return_error(
                Error::BackendError("Renderer lock poisoned".to_string())
            ))?;

        if lock.is_some() {
            return Err(Self::log_and_return_error(
                Error::InitializationFailed("Renderer already exists. Call Engine::destroy_renderer() first.".to_string())
            ));
        }

        let renderer = Arc::new(Mutex::new(renderer));
        *lock = Some(Arc::clone(&renderer));

        crate::engine_info!("railguard::Engine", "Renderer singleton created successfully");
        Ok(renderer)
    }

    /// Get the renderer singleton
    ///
    /// # Errors
    ///
    /// Returns an error if the engine is not initialized or no renderer was registered.
    pub fn renderer() -> Result<Arc<Mutex<Renderer>>> {
        let state = ENGINE_STATE.get()
            .ok_or_else(|| Self::log_and_return_error(
                Error::InitializationFailed("Engine not initialized. Call Engine::initialize() first.".to_string())
            ))?;

        let lock = state.renderer.read()
            .map_err(|_| Self::log_and_return_error(
                Error::BackendError("Renderer lock poisoned".to_string())
            ))?;

        lock.clone()
            .ok_or_else(|| Self::log_and_return_error(
                Error::InitializationFailed("Renderer not created. Call Engine::create_renderer() first.".to_string())
            ))
    }

    /// Destroy the renderer singleton
    ///
    /// Existing renderer handles stay valid until dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine is not initialized
    pub fn destroy_renderer() -> Result<()> {
        let state = ENGINE_STATE.get()
            .ok_or_else(|| Self::log_and_return_error(
                Error::InitializationFailed("Engine not initialized".to_string())
            ))?;

        let mut lock = state.renderer.write()
            .map_err(|_| Self::log_and_return_error(
                Error::BackendError("Renderer lock poisoned".to_string())
            ))?;

        *lock = None;

        crate::engine_info!("railguard::Engine", "Renderer singleton destroyed");
        Ok(())
    }

    /// Reset all singletons (test helper)
    #[cfg(test)]
    pub fn reset_for_testing() {
        if let Some(state) = ENGINE_STATE.get() {
            if let Ok(mut renderer) = state.renderer.write() {
                *renderer = None;
            }
        }
    }

    // ===== LOGGING API =====

    /// Set a custom logger
    ///
    /// # Example
    ///
    /// ```no_run
    /// use railguard_engine::railguard::{Engine, log::{Logger, LogEntry}};
    ///
    /// struct FileLogger;
    /// impl Logger for FileLogger {
    ///     fn log(&self, entry: &LogEntry) {
    ///         // Write to file...
    ///     }
    /// }
    ///
    /// Engine::set_logger(FileLogger);
    /// ```
    pub fn set_logger<L: Logger + 'static>(logger: L) {
        let logger_lock = LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)));
        if let Ok(mut lock) = logger_lock.write() {
            *lock = Box::new(logger);
        }
    }

    /// Reset logger to default (DefaultLogger)
    pub fn reset_logger() {
        let logger_lock = LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)));
        if let Ok(mut lock) = logger_lock.write() {
            *lock = Box::new(DefaultLogger);
        }
    }

    /// Internal logging method (for simple logs without file:line)
    ///
    /// Used by macros like engine_info!, engine_warn!, etc.
    pub fn log(severity: LogSeverity, source: &str, message: String) {
        let logger_lock = LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)));
        if let Ok(lock) = logger_lock.read() {
            lock.log(&LogEntry {
                severity,
                timestamp: SystemTime::now(),
                source: source.to_string(),
                message,
                file: None,
                line: None,
            });
        }
    }

    /// Internal logging method with file:line information (for ERROR logs)
    ///
    /// # Arguments
    ///
    /// * `severity` - Log severity level (typically Error)
    /// * `source` - Source module (e.g., "railguard::Renderer")
    /// * `message` - Log message
    /// * `file` - Source file path
    /// * `line` - Source line number
    pub fn log_detailed(
        severity: LogSeverity,
        source: &str,
        message: String,
        file: &'static str,
        line: u32,
    ) {
        let logger_lock = LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)));
        if let Ok(lock) = logger_lock.read() {
            lock.log(&LogEntry {
                severity,
                timestamp: SystemTime::now(),
                source: source.to_string(),
                message,
                file: Some(file),
                line: Some(line),
            });
        }
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
