//! Unit tests for validation message filtering and statistics

use super::*;
use serial_test::serial;
use std::ffi::CString;

fn test_config(severity: DebugSeverity, enable_stats: bool) -> Config {
    Config {
        severity,
        output: DebugOutput::File(
            std::env::temp_dir()
                .join("railguard_debug_tests.log")
                .to_string_lossy()
                .into_owned(),
        ),
        message_filter: DebugMessageFilter::default(),
        break_on_error: false,
        panic_on_error: false,
        enable_stats,
    }
}

fn send(severity: vk::DebugUtilsMessageSeverityFlagsEXT, message_type: vk::DebugUtilsMessageTypeFlagsEXT, text: &str) {
    let id = CString::new("Test-Message").unwrap();
    let message = CString::new(text).unwrap();
    let data = vk::DebugUtilsMessengerCallbackDataEXT::default()
        .message_id_name(&id)
        .message(&message);

    let result = unsafe { vulkan_debug_callback(severity, message_type, &data, std::ptr::null_mut()) };
    assert_eq!(result, vk::FALSE);
}

// ============================================================================
// FILTER TESTS
// ============================================================================

#[test]
fn test_message_level_from_vk() {
    assert_eq!(
        MessageLevel::from_vk(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR),
        MessageLevel::Error
    );
    assert_eq!(
        MessageLevel::from_vk(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING),
        MessageLevel::Warning
    );
    assert_eq!(
        MessageLevel::from_vk(vk::DebugUtilsMessageSeverityFlagsEXT::INFO),
        MessageLevel::Info
    );
    assert_eq!(
        MessageLevel::from_vk(vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE),
        MessageLevel::Verbose
    );
}

#[test]
fn test_passes_severity() {
    assert!(passes_severity(DebugSeverity::ErrorsOnly, MessageLevel::Error));
    assert!(!passes_severity(DebugSeverity::ErrorsOnly, MessageLevel::Warning));
    assert!(passes_severity(DebugSeverity::ErrorsAndWarnings, MessageLevel::Warning));
    assert!(!passes_severity(DebugSeverity::ErrorsAndWarnings, MessageLevel::Info));
    assert!(passes_severity(DebugSeverity::All, MessageLevel::Verbose));
}

#[test]
fn test_severity_flags() {
    assert_eq!(
        severity_flags(DebugSeverity::ErrorsOnly),
        vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
    );
    assert!(severity_flags(DebugSeverity::All).contains(vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE));
    assert!(!severity_flags(DebugSeverity::ErrorsAndWarnings).contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO));
}

#[test]
fn test_displayed_category_respects_filter() {
    let filter = DebugMessageFilter {
        show_general: true,
        show_validation: false,
        show_performance: true,
    };

    assert_eq!(displayed_category(&filter, vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION), None);
    assert_eq!(
        displayed_category(&filter, vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE),
        Some("Performance")
    );
    assert_eq!(
        displayed_category(&filter, vk::DebugUtilsMessageTypeFlagsEXT::GENERAL),
        Some("General")
    );
}

// ============================================================================
// CALLBACK / STATS TESTS
// ============================================================================

#[test]
#[serial]
fn test_callback_counts_displayed_messages() {
    init_debug_config(test_config(DebugSeverity::ErrorsAndWarnings, true));

    send(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR, vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION, "bad call");
    send(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING, vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE, "slow path");
    send(vk::DebugUtilsMessageSeverityFlagsEXT::INFO, vk::DebugUtilsMessageTypeFlagsEXT::GENERAL, "hidden");

    let stats = get_validation_stats();
    assert_eq!(stats.errors, 1);
    assert_eq!(stats.warnings, 1);
    assert_eq!(stats.info, 0);
    assert_eq!(stats.total(), 2);

    cleanup_debug_config();
}

#[test]
#[serial]
fn test_callback_without_stats_counts_nothing() {
    init_debug_config(test_config(DebugSeverity::All, false));

    send(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR, vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION, "bad call");

    assert_eq!(get_validation_stats().total(), 0);
    cleanup_debug_config();
}

#[test]
#[serial]
fn test_callback_after_cleanup_is_ignored() {
    init_debug_config(test_config(DebugSeverity::All, true));
    cleanup_debug_config();

    send(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR, vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION, "late");

    assert_eq!(get_validation_stats().total(), 0);
}

#[test]
#[serial]
fn test_init_resets_stats() {
    init_debug_config(test_config(DebugSeverity::All, true));
    send(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING, vk::DebugUtilsMessageTypeFlagsEXT::GENERAL, "first");
    assert_eq!(get_validation_stats().warnings, 1);

    init_debug_config(test_config(DebugSeverity::All, true));
    assert_eq!(get_validation_stats().total(), 0);
    cleanup_debug_config();
}
