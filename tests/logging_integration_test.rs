//! Integration tests for logging functionality
//!
//! The global subscriber can only be installed once per process, so a single
//! test installs it and checks the second attempt is refused.

use gar_export::config::LoggingConfig;
use gar_export::logging::init_logging;
use tempfile::TempDir;

#[test]
fn test_logging_config_default() {
    let config = LoggingConfig::default();
    assert!(config.local_enabled);
    assert_eq!(config.local_path, "./logs");
    assert_eq!(config.local_rotation, "daily");
}

#[test]
fn test_console_only_config() {
    let config = LoggingConfig::console_only();
    assert!(!config.local_enabled);
    assert!(config.local_path.is_empty());
}

#[test]
fn test_invalid_log_level_is_rejected() {
    let result = init_logging("verbose", &LoggingConfig::console_only());
    assert!(result.is_err());
}

#[test]
fn test_init_logging_creates_directory_once() {
    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join("logs");

    let config = LoggingConfig {
        local_enabled: true,
        local_path: log_path.to_string_lossy().to_string(),
        local_rotation: "never".to_string(),
    };

    let guard = init_logging("debug", &config).unwrap();
    assert!(log_path.exists());

    gar_export::log_builder_start!("Eleve", 1, 2);
    gar_export::log_entity_progress!("Eleve", 1, 2, "e1");
    gar_export::log_builder_complete!("Eleve", 2, 0, std::time::Duration::from_millis(5));

    assert!(init_logging("info", &LoggingConfig::console_only()).is_err());
    drop(guard);
}
