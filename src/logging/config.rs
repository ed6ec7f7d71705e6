//! Logging configuration
//!
//! Per-component log levels and output destinations for the tracing
//! subscriber built in [`super::init_logging`].

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const VALID_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Global log level (trace, debug, info, warn, error)
    pub global_level: String,

    /// Enable console output
    pub console_output: bool,

    /// Directory for daily-rolled JSON log files (None = no file logging)
    pub log_directory: Option<PathBuf>,

    /// Include file location in logs
    pub include_file_location: bool,

    /// Level for the evaluator (batch spans, derived parameters, rejections)
    pub evaluator_level: String,

    /// Level for correspondence strategies
    pub scorer_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            global_level: "info".to_string(),
            console_output: true,
            log_directory: None,
            include_file_location: false,
            evaluator_level: "info".to_string(),
            scorer_level: "info".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Verbose logging including per-candidate traces
    pub fn development() -> Self {
        Self {
            global_level: "debug".to_string(),
            console_output: true,
            log_directory: Some(PathBuf::from("logs")),
            include_file_location: true,
            evaluator_level: "trace".to_string(),
            scorer_level: "debug".to_string(),
        }
    }

    /// Warnings only, written to files
    pub fn production() -> Self {
        Self {
            global_level: "warn".to_string(),
            console_output: false,
            log_directory: Some(PathBuf::from("/var/log/cloud-alignment")),
            include_file_location: false,
            evaluator_level: "warn".to_string(),
            scorer_level: "warn".to_string(),
        }
    }

    /// Same configuration with every level replaced by `level`.
    pub fn with_level(mut self, level: &str) -> Self {
        self.global_level = level.to_string();
        self.evaluator_level = level.to_string();
        self.scorer_level = level.to_string();
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        for (name, level) in [
            ("global_level", &self.global_level),
            ("evaluator_level", &self.evaluator_level),
            ("scorer_level", &self.scorer_level),
        ] {
            if !VALID_LEVELS.contains(&level.as_str()) {
                return Err(format!(
                    "Invalid {}: {}. Must be one of: {:?}",
                    name, level, VALID_LEVELS
                ));
            }
        }

        if let Some(ref log_dir) = self.log_directory {
            if let Some(parent) = log_dir.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    return Err(format!("Log directory parent does not exist: {:?}", parent));
                }
            }
        }

        Ok(())
    }

    /// Get the effective log level for a specific component
    pub fn get_component_level(&self, component: &str) -> &str {
        match component {
            "evaluator" => &self.evaluator_level,
            "scorer" | "scorers" => &self.scorer_level,
            _ => &self.global_level,
        }
    }

    /// `EnvFilter` directives for this crate's modules.
    pub fn filter_directives(&self) -> String {
        let krate = env!("CARGO_PKG_NAME").replace('-', "_");
        format!(
            "{krate}={},{krate}::evaluator={},{krate}::scorers={}",
            self.global_level, self.evaluator_level, self.scorer_level
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LoggingConfig::default();
        assert_eq!(config.global_level, "info");
        assert!(config.console_output);
        assert!(config.log_directory.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_presets() {
        let dev = LoggingConfig::development();
        assert_eq!(dev.evaluator_level, "trace");
        assert!(dev.include_file_location);

        let prod = LoggingConfig::production();
        assert_eq!(prod.global_level, "warn");
        assert!(!prod.console_output);
    }

    #[test]
    fn test_config_validation() {
        let mut config = LoggingConfig::default();
        config.scorer_level = "loud".to_string();
        assert!(config.validate().is_err());

        let config = LoggingConfig::default().with_level("trace");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_component_level_selection() {
        let mut config = LoggingConfig::default();
        config.scorer_level = "debug".to_string();
        assert_eq!(config.get_component_level("scorers"), "debug");
        assert_eq!(config.get_component_level("evaluator"), "info");
        assert_eq!(config.get_component_level("unknown"), "info");
    }

    #[test]
    fn test_filter_directives_cover_components() {
        let directives = LoggingConfig::development().filter_directives();
        assert!(directives.starts_with("cloud_alignment=debug"));
        assert!(directives.contains("cloud_alignment::evaluator=trace"));
        assert!(directives.contains("cloud_alignment::scorers=debug"));
    }
}
