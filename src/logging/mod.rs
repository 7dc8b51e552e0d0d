//! Logging and observability
//!
//! Structured logging with:
//! - JSON-formatted file logs with rotation
//! - Configurable log levels
//! - Builder lifecycle macros shared by every entity builder
//!
//! # Example
//!
//! ```no_run
//! use gar_export::logging::init_logging;
//! use gar_export::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!(uai = "0350063D", "Processing school");
//! ```

pub mod structured;

// Re-export commonly used items
pub use structured::{init_logging, run_span, LoggingGuard};

/// Log the start of a builder pass
///
/// # Example
///
/// ```no_run
/// use gar_export::log_builder_start;
///
/// log_builder_start!("Eleve", 1, 250);
/// ```
#[macro_export]
macro_rules! log_builder_start {
    ($category:expr, $page:expr, $entries:expr) => {
        tracing::info!(
            category = %$category,
            page = $page,
            entries = $entries,
            "Starting builder pass"
        );
    };
}

/// Log the completion of a builder pass
///
/// # Example
///
/// ```no_run
/// use gar_export::log_builder_complete;
/// use std::time::Duration;
///
/// log_builder_complete!("Eleve", 248, 2, Duration::from_secs(3));
/// ```
#[macro_export]
macro_rules! log_builder_complete {
    ($category:expr, $emitted:expr, $skipped:expr, $duration:expr) => {
        tracing::info!(
            category = %$category,
            emitted = $emitted,
            skipped = $skipped,
            duration_ms = $duration.as_millis() as u64,
            "Builder pass completed"
        );
    };
}

/// Log per-entity progress
///
/// # Example
///
/// ```no_run
/// use gar_export::log_entity_progress;
///
/// log_entity_progress!("Eleve", 10, 250, "e1a2b3");
/// ```
#[macro_export]
macro_rules! log_entity_progress {
    ($category:expr, $current:expr, $total:expr, $label:expr) => {
        tracing::trace!(
            category = %$category,
            current = $current,
            total = $total,
            progress_pct = ($current as f64 / ($total as f64).max(1.0) * 100.0),
            entity = %$label,
            "Processing entity"
        );
    };
}

/// Log a skipped entity at the level its reason calls for
///
/// # Example
///
/// ```no_run
/// use gar_export::log_entity_skipped;
/// use gar_export::core::builders::SkipReason;
///
/// let reason = SkipReason::NoProfile;
/// log_entity_skipped!("Enseignant", "e1a2b3", &reason);
/// ```
#[macro_export]
macro_rules! log_entity_skipped {
    ($category:expr, $label:expr, $reason:expr) => {
        if $reason.degrades_health() {
            tracing::warn!(
                category = %$category,
                entity = %$label,
                reason = %$reason,
                "Entity skipped"
            );
        } else {
            tracing::debug!(
                category = %$category,
                entity = %$label,
                reason = %$reason,
                "Entity skipped"
            );
        }
    };
}
