//! Panel configuration with sensible defaults.

use serde::Deserialize;

use crate::capture::{Formatter, LogLevel, PlotStyle};
use crate::sink::DEFAULT_MAX_HISTORY;

/// Settings for a [`LogPanel`](crate::LogPanel).
///
/// Deserializable so hosts can load it from a JSON settings file; missing
/// fields take their defaults.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    /// Maximum number of entries kept. Default: `500`.
    pub max_history: usize,
    /// Logger the Logging toggle attaches to. Default: `None` (root).
    pub logger_name: Option<String>,
    /// Pattern for captured log records. Default: `"{message}"`.
    pub log_format: String,
    /// Minimum level of captured log records. Default: `Trace`.
    pub log_level: LogLevel,
    /// Panel background; drives the plot style. Default: white.
    pub background: [u8; 3],
    /// Initial state of the Printing toggle. Default: `false`.
    pub printing: bool,
    /// Initial state of the HTML toggle. Default: `false`.
    pub html: bool,
    /// Initial state of the Logging toggle. Default: `false`.
    pub logging: bool,
    /// Initial state of the Plotting toggle. Default: `false`.
    pub plotting: bool,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            max_history: DEFAULT_MAX_HISTORY,
            logger_name: None,
            log_format: "{message}".to_string(),
            log_level: LogLevel::Trace,
            background: [255, 255, 255],
            printing: false,
            html: false,
            logging: false,
            plotting: false,
        }
    }
}

impl PanelConfig {
    pub fn with_max_history(mut self, max_history: usize) -> Self {
        self.max_history = max_history;
        self
    }

    pub fn with_logger_name(mut self, name: impl Into<String>) -> Self {
        self.logger_name = Some(name.into());
        self
    }

    pub fn with_log_format(mut self, pattern: impl Into<String>) -> Self {
        self.log_format = pattern.into();
        self
    }

    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    pub fn with_background(mut self, rgb: [u8; 3]) -> Self {
        self.background = rgb;
        self
    }

    pub fn with_printing(mut self, on: bool) -> Self {
        self.printing = on;
        self
    }

    pub fn with_html(mut self, on: bool) -> Self {
        self.html = on;
        self
    }

    pub fn with_logging(mut self, on: bool) -> Self {
        self.logging = on;
        self
    }

    pub fn with_plotting(mut self, on: bool) -> Self {
        self.plotting = on;
        self
    }

    /// Build the record formatter from `log_format`.
    pub fn build_formatter(&self) -> Formatter {
        Formatter::pattern(&self.log_format)
    }

    /// Build the plot style matching `background`.
    pub fn build_plot_style(&self) -> PlotStyle {
        PlotStyle::for_background(self.background)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = PanelConfig::default();
        assert_eq!(config.max_history, 500);
        assert_eq!(config.logger_name, None);
        assert_eq!(config.log_format, "{message}");
        assert!(!config.printing && !config.html && !config.logging && !config.plotting);
        assert!(!config.build_plot_style().dark);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: PanelConfig =
            serde_json::from_str(r#"{"max_history": 20, "background": [0, 0, 0], "log_level": "Warn"}"#)
                .unwrap();
        assert_eq!(config.max_history, 20);
        assert_eq!(config.log_level, LogLevel::Warn);
        assert_eq!(config.log_format, "{message}");
        assert!(config.build_plot_style().dark);
    }

    #[test]
    fn builders() {
        let config = PanelConfig::default()
            .with_logger_name("app")
            .with_log_format("{level}: {message}")
            .with_html(true);
        assert_eq!(config.logger_name.as_deref(), Some("app"));
        assert!(config.html);
    }
}
