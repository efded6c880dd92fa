/// Vulkan Debug Messenger - Handles validation layer messages with colored output
///
/// This module provides a debug messenger callback for Vulkan validation layers
/// with support for colored console output, file logging, and break-on-error functionality.

use ash::vk;
use colored::*;
use railguard_engine::railguard::{DebugMessageFilter, DebugOutput, DebugSeverity, ValidationStats};
use rustc_hash::FxHashMap;
use std::ffi::CStr;
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

/// Global debug configuration (shared across callbacks)
static DEBUG_CONFIG: Mutex<Option<Config>> = Mutex::new(None);

/// Global validation statistics (thread-safe atomic counters)
static VALIDATION_STATS: ValidationStatsTracker = ValidationStatsTracker::new();

/// Global message tracker for grouping identical messages
static MESSAGE_TRACKER: Mutex<Option<FxHashMap<String, u32>>> = Mutex::new(None);

/// Debug configuration for the callback
#[derive(Debug, Clone)]
pub struct Config {
    pub severity: DebugSeverity,
    pub output: DebugOutput,
    pub message_filter: DebugMessageFilter,
    pub break_on_error: bool,
    pub panic_on_error: bool,
    pub enable_stats: bool,
}

/// Severity class of a validation message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MessageLevel {
    Error,
    Warning,
    Info,
    Verbose,
}

impl MessageLevel {
    pub(crate) fn from_vk(severity: vk::DebugUtilsMessageSeverityFlagsEXT) -> Self {
        if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
            MessageLevel::Error
        } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
            MessageLevel::Warning
        } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
            MessageLevel::Info
        } else {
            MessageLevel::Verbose
        }
    }

    fn label(self) -> &'static str {
        match self {
            MessageLevel::Error => "ERROR",
            MessageLevel::Warning => "WARNING",
            MessageLevel::Info => "INFO",
            MessageLevel::Verbose => "VERBOSE",
        }
    }

    fn colored_label(self) -> ColoredString {
        match self {
            MessageLevel::Error => self.label().red().bold(),
            MessageLevel::Warning => self.label().yellow().bold(),
            MessageLevel::Info => self.label().cyan(),
            MessageLevel::Verbose => self.label().bright_black(),
        }
    }
}

/// Thread-safe validation statistics tracker
struct ValidationStatsTracker {
    errors: AtomicU32,
    warnings: AtomicU32,
    info: AtomicU32,
    verbose: AtomicU32,
}

impl ValidationStatsTracker {
    const fn new() -> Self {
        Self {
            errors: AtomicU32::new(0),
            warnings: AtomicU32::new(0),
            info: AtomicU32::new(0),
            verbose: AtomicU32::new(0),
        }
    }

    fn increment(&self, level: MessageLevel) {
        let counter = match level {
            MessageLevel::Error => &self.errors,
            MessageLevel::Warning => &self.warnings,
            MessageLevel::Info => &self.info,
            MessageLevel::Verbose => &self.verbose,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn get_stats(&self) -> ValidationStats {
        ValidationStats {
            errors: self.errors.load(Ordering::Relaxed),
            warnings: self.warnings.load(Ordering::Relaxed),
            info: self.info.load(Ordering::Relaxed),
            verbose: self.verbose.load(Ordering::Relaxed),
        }
    }

    fn reset(&self) {
        self.errors.store(0, Ordering::Relaxed);
        self.warnings.store(0, Ordering::Relaxed);
        self.info.store(0, Ordering::Relaxed);
        self.verbose.store(0, Ordering::Relaxed);
    }
}

/// Severity flags the messenger subscribes to
pub(crate) fn severity_flags(severity: DebugSeverity) -> vk::DebugUtilsMessageSeverityFlagsEXT {
    match severity {
        DebugSeverity::ErrorsOnly => vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
        DebugSeverity::ErrorsAndWarnings => {
            vk::DebugUtilsMessageSeverityFlagsEXT::ERROR | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
        }
        DebugSeverity::All => {
            vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
                | vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
        }
    }
}

pub(crate) fn passes_severity(severity: DebugSeverity, level: MessageLevel) -> bool {
    match severity {
        DebugSeverity::ErrorsOnly => level == MessageLevel::Error,
        DebugSeverity::ErrorsAndWarnings => matches!(level, MessageLevel::Error | MessageLevel::Warning),
        DebugSeverity::All => true,
    }
}

/// Category name of a message, or `None` if the filter hides it
pub(crate) fn displayed_category(
    filter: &DebugMessageFilter,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
) -> Option<&'static str> {
    if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION) {
        filter.show_validation.then_some("Validation")
    } else if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE) {
        filter.show_performance.then_some("Performance")
    } else {
        filter.show_general.then_some("General")
    }
}

/// Initialize debug configuration
pub fn init_debug_config(config: Config) {
    // Reset statistics when initializing
    VALIDATION_STATS.reset();
    *MESSAGE_TRACKER.lock().unwrap() = Some(FxHashMap::default());
    *DEBUG_CONFIG.lock().unwrap() = Some(config);
}

/// Stop routing messages; statistics stay readable
pub fn cleanup_debug_config() {
    *DEBUG_CONFIG.lock().unwrap() = None;
}

/// Get current validation statistics
pub fn get_validation_stats() -> ValidationStats {
    VALIDATION_STATS.get_stats()
}

/// Print validation statistics report
pub fn print_validation_stats_report() {
    let stats = get_validation_stats();

    if stats.total() == 0 {
        println!("\n{}", "No validation messages".green().bold());
        return;
    }

    println!("\n{}", "=== Validation Statistics Report ===".bright_blue().bold());

    if stats.errors > 0 {
        println!("  {} {}", "Errors:".red().bold(), stats.errors);
    }
    if stats.warnings > 0 {
        println!("  {} {}", "Warnings:".yellow().bold(), stats.warnings);
    }
    if stats.info > 0 {
        println!("  {} {}", "Info:".cyan(), stats.info);
    }
    if stats.verbose > 0 {
        println!("  {} {}", "Verbose:".bright_black(), stats.verbose);
    }

    println!("  {} {}", "Total:".white().bold(), stats.total());

    let tracker_guard = MESSAGE_TRACKER.lock().unwrap();
    if let Some(tracker) = tracker_guard.as_ref() {
        let duplicate_count = tracker.values().filter(|&&count| count > 1).count();

        if duplicate_count > 0 {
            println!("\n  {} message(s) appeared multiple times", duplicate_count);
        }
    }

    println!("{}\n", "====================================".bright_blue().bold());
}

unsafe fn c_str_or<'a>(ptr: *const std::os::raw::c_char, fallback: &'a str) -> &'a str {
    if ptr.is_null() {
        fallback
    } else {
        CStr::from_ptr(ptr).to_str().unwrap_or("Invalid UTF-8")
    }
}

/// Vulkan debug messenger callback
///
/// Called by the validation layers when they detect issues.
///
/// # Safety
///
/// Must only be installed as a `PFN_vkDebugUtilsMessengerCallbackEXT`.
pub unsafe extern "system" fn vulkan_debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _user_data: *mut std::os::raw::c_void,
) -> vk::Bool32 {
    if p_callback_data.is_null() {
        return vk::FALSE;
    }
    let callback_data = &*p_callback_data;
    let message_id_name = c_str_or(callback_data.p_message_id_name, "Unknown");
    let message = c_str_or(callback_data.p_message, "No message");

    let config = match DEBUG_CONFIG.lock().unwrap().as_ref() {
        Some(cfg) => cfg.clone(),
        None => return vk::FALSE,
    };

    let level = MessageLevel::from_vk(message_severity);
    if !passes_severity(config.severity, level) {
        return vk::FALSE;
    }
    let type_str = match displayed_category(&config.message_filter, message_type) {
        Some(category) => category,
        None => return vk::FALSE,
    };

    let occurrence_count = if config.enable_stats {
        VALIDATION_STATS.increment(level);
        let mut tracker_guard = MESSAGE_TRACKER.lock().unwrap();
        let tracker = tracker_guard.get_or_insert_with(FxHashMap::default);
        let count = tracker.entry(message.to_string()).or_insert(0);
        *count += 1;
        *count
    } else {
        1
    };

    let repeat_indicator = if occurrence_count > 1 {
        format!(" [x{}]", occurrence_count)
    } else {
        String::new()
    };

    let console_output = format!(
        "{} {} [{}]{}\n  |- {}: {}\n  `- {}\n",
        "[VULKAN".bright_blue().bold(),
        format!("{}]", level.colored_label()).bright_blue().bold(),
        type_str.bright_black(),
        repeat_indicator.yellow(),
        "Message ID".bright_black(),
        message_id_name.white(),
        message.white()
    );

    let file_output = format!(
        "[VULKAN {}] [{}]{}\n  |- Message ID: {}\n  `- {}\n",
        level.label(), type_str, repeat_indicator, message_id_name, message
    );

    match &config.output {
        DebugOutput::Console => {
            eprint!("{}", console_output);
        }
        DebugOutput::File(path) => {
            write_to_file(path, &file_output);
        }
        DebugOutput::Both(path) => {
            eprint!("{}", console_output);
            write_to_file(path, &file_output);
        }
    }

    if config.panic_on_error && level == MessageLevel::Error {
        panic!(
            "\nPANIC ON VALIDATION ERROR\nMessage ID: {}\nType: {}\nMessage: {}\n",
            message_id_name, type_str, message
        );
    }

    // Abort so an attached debugger stops at the offending call
    if config.break_on_error && level == MessageLevel::Error {
        eprintln!(
            "\n{}\n  Context: {} [{}]\n  Message: {}\n",
            "BREAK ON VALIDATION ERROR - Aborting execution".red().bold(),
            message_id_name.yellow(),
            type_str.cyan(),
            message.white()
        );
        std::process::abort();
    }

    vk::FALSE
}

/// Write message to log file
fn write_to_file(path: &str, message: &str) {
    if let Ok(mut file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
    {
        let _ = writeln!(file, "{}", message);
    }
}

#[cfg(test)]
#[path = "debug_tests.rs"]
mod tests;
