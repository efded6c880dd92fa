//! Unit tests for Engine singleton manager
//!
//! Tests initialization, renderer singleton management and logging APIs.
//!
//! IMPORTANT: ENGINE_STATE is a global OnceLock shared across all tests.
//! All tests are marked with #[serial] to run sequentially and avoid RwLock poisoning.

use crate::railguard::{Engine, Error, Renderer, RendererConfig};
use crate::graphics_device::mock_graphics_device::{MockGraphicsDevice, MockLog};
use crate::railguard::log::{Logger, LogEntry, LogSeverity};
use std::sync::{Arc, Mutex};
use serial_test::serial;

// ============================================================================
// TEST HELPERS
// ============================================================================

/// Test logger that captures log entries for verification
struct TestLogger {
    entries: Arc<Mutex<Vec<String>>>,
}

impl TestLogger {
    fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl Logger for TestLogger {
    fn log(&self, entry: &LogEntry) {
        let mut entries = self.entries.lock().unwrap();
        entries.push(format!("{:?}: {}", entry.severity, entry.message));
    }
}

/// Build a renderer over a fresh mock device, returning the device log too
fn mock_renderer() -> (Renderer, Arc<Mutex<MockLog>>) {
    let device = MockGraphicsDevice::new();
    let log = device.log.clone();
    let renderer = Renderer::new(Box::new(device), RendererConfig::default()).unwrap();
    (renderer, log)
}

/// Setup function to reset engine state before each test
///
/// Note: ENGINE_STATE is a OnceLock, so once initialized it stays initialized.
/// We always call initialize() (idempotent) and use reset_for_testing() to clear the renderer.
fn setup() {
    Engine::reset_for_testing();
    let _ = Engine::initialize(); // Always initialize (idempotent)
}

// ============================================================================
// INITIALIZATION AND SHUTDOWN TESTS
// ============================================================================

#[test]
#[serial]
fn test_engine_initialize() {
    setup();
    // Initialize is idempotent, so calling it again should succeed
    let result = Engine::initialize();
    assert!(result.is_ok());
}

#[test]
#[serial]
fn test_multiple_initialize_calls_idempotent() {
    setup();

    Engine::initialize().unwrap();
    Engine::initialize().unwrap();

    // Engine should still work normally
    let (renderer, _) = mock_renderer();
    assert!(Engine::create_renderer(renderer).is_ok());
}

#[test]
#[serial]
fn test_shutdown_clears_renderer() {
    setup();

    let (renderer, _) = mock_renderer();
    Engine::create_renderer(renderer).unwrap();
    assert!(Engine::renderer().is_ok());

    Engine::shutdown();

    assert!(Engine::renderer().is_err());
}

#[test]
#[serial]
fn test_shutdown_drops_renderer() {
    setup();

    let (renderer, log) = mock_renderer();
    Engine::create_renderer(renderer).unwrap();
    let waits_before = log.lock().unwrap().fence_waits;

    Engine::shutdown();

    // Renderer teardown waits every frame slot
    assert_eq!(log.lock().unwrap().fence_waits, waits_before + 3);
}

#[test]
#[serial]
fn test_shutdown_idempotent() {
    setup();

    Engine::shutdown();
    Engine::shutdown();

    // Re-initialize for next tests
    Engine::initialize().unwrap();
}

#[test]
#[serial]
fn test_reset_for_testing() {
    setup();

    let (renderer, _) = mock_renderer();
    Engine::create_renderer(renderer).unwrap();

    Engine::reset_for_testing();

    assert!(Engine::renderer().is_err());
}

// ============================================================================
// RENDERER API TESTS
// ============================================================================

#[test]
#[serial]
fn test_create_renderer_success() {
    setup();

    let (renderer, _) = mock_renderer();
    let handle = Engine::create_renderer(renderer).unwrap();

    assert_eq!(handle.lock().unwrap().frame_number(), 1);
}

#[test]
#[serial]
fn test_create_renderer_twice_fails() {
    setup();

    let (first, _) = mock_renderer();
    let (second, _) = mock_renderer();
    Engine::create_renderer(first).unwrap();

    let result = Engine::create_renderer(second);
    assert!(matches!(result, Err(Error::InitializationFailed(_))));
}

#[test]
#[serial]
fn test_renderer_retrieval_returns_same_instance() {
    setup();

    let (renderer, _) = mock_renderer();
    let created = Engine::create_renderer(renderer).unwrap();
    let retrieved = Engine::renderer().unwrap();

    assert!(Arc::ptr_eq(&created, &retrieved));
}

#[test]
#[serial]
fn test_renderer_not_created_fails() {
    setup();

    let result = Engine::renderer();
    assert!(matches!(result, Err(Error::InitializationFailed(_))));
}

#[test]
#[serial]
fn test_destroy_renderer_success() {
    setup();

    let (renderer, _) = mock_renderer();
    Engine::create_renderer(renderer).unwrap();

    Engine::destroy_renderer().unwrap();
    assert!(Engine::renderer().is_err());

    // A new renderer can be registered afterwards
    let (renderer, _) = mock_renderer();
    assert!(Engine::create_renderer(renderer).is_ok());
}

#[test]
#[serial]
fn test_destroy_renderer_without_renderer_is_ok() {
    setup();
    assert!(Engine::destroy_renderer().is_ok());
}

#[test]
#[serial]
fn test_handle_outlives_destroy_renderer() {
    setup();

    let (renderer, log) = mock_renderer();
    let handle = Engine::create_renderer(renderer).unwrap();
    let waits_before = log.lock().unwrap().fence_waits;

    Engine::destroy_renderer().unwrap();

    // Still alive through the handle
    assert_eq!(log.lock().unwrap().fence_waits, waits_before);
    handle.lock().unwrap().draw().unwrap();
    drop(handle);
    assert!(log.lock().unwrap().fence_waits > waits_before);
}

#[test]
#[serial]
fn test_error_messages_logged() {
    setup();

    let logger = TestLogger::new();
    let entries = logger.entries.clone();
    Engine::set_logger(logger);

    let _ = Engine::renderer();

    Engine::reset_logger();

    let entries = entries.lock().unwrap();
    assert!(entries.iter().any(|e| e.starts_with("Error") && e.contains("Renderer not created")));
}

// ============================================================================
// LOGGING API TESTS
// ============================================================================

#[test]
#[serial]
fn test_default_logger_logs_without_panic() {
    Engine::reset_logger();
    Engine::log(LogSeverity::Info, "railguard::test", "default logger".to_string());
    Engine::log_detailed(LogSeverity::Error, "railguard::test", "detailed".to_string(), file!(), line!());
}

#[test]
#[serial]
fn test_custom_logger_receives_logs() {
    let logger = TestLogger::new();
    let entries = logger.entries.clone();
    Engine::set_logger(logger);

    Engine::log(LogSeverity::Warn, "railguard::test", "first".to_string());
    Engine::log(LogSeverity::Debug, "railguard::test", "second".to_string());

    Engine::reset_logger();

    let entries = entries.lock().unwrap();
    assert_eq!(*entries, vec!["Warn: first".to_string(), "Debug: second".to_string()]);
}

#[test]
#[serial]
fn test_reset_logger_to_default() {
    let logger = TestLogger::new();
    let entries = logger.entries.clone();
    Engine::set_logger(logger);
    Engine::reset_logger();

    Engine::log(LogSeverity::Info, "railguard::test", "not captured".to_string());

    assert!(entries.lock().unwrap().is_empty());
}

#[test]
#[serial]
fn test_renderer_creation_is_logged() {
    let logger = TestLogger::new();
    let entries = logger.entries.clone();
    Engine::set_logger(logger);

    let (renderer, _) = mock_renderer();
    drop(renderer);

    Engine::reset_logger();

    let entries = entries.lock().unwrap();
    assert!(entries.iter().any(|e| e.starts_with("Info") && e.contains("Renderer created")));
}

// ============================================================================
// INTEGRATION TESTS
// ============================================================================

#[test]
#[serial]
fn test_full_engine_lifecycle() {
    setup();

    let (renderer, log) = mock_renderer();
    Engine::create_renderer(renderer).unwrap();

    {
        let handle = Engine::renderer().unwrap();
        let mut renderer = handle.lock().unwrap();
        let window = Arc::new(crate::window::mock_window::MockWindow::new(64, 64));
        renderer.connect_window(0, window).unwrap();
        renderer.create_orthographic_camera(0, 0.0, 1.0).unwrap();
        renderer.draw().unwrap();
    }

    Engine::shutdown();
    Engine::initialize().unwrap();

    assert_eq!(log.lock().unwrap().presents, 1);
    assert!(Engine::renderer().is_err());
}

#[test]
#[serial]
fn test_concurrent_renderer_access() {
    setup();

    let (renderer, _) = mock_renderer();
    Engine::create_renderer(renderer).unwrap();

    let threads: Vec<_> = (0..4)
        .map(|_| {
            std::thread::spawn(|| {
                let handle = Engine::renderer().unwrap();
                let frame = handle.lock().unwrap().frame_number();
                frame
            })
        })
        .collect();

    for thread in threads {
        assert_eq!(thread.join().unwrap(), 1);
    }
}
