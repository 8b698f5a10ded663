use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration from ReviewFlow Config.yaml (plus `REVIEWFLOW_*` environment overrides)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ReviewConfig {
    #[serde(default)]
    pub autosave: AutoSaveSettings,

    #[serde(default)]
    pub review: ReviewSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Debounced persistence settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoSaveSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Quiet period after the last change before a save fires
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,

    /// How long the "saved" indicator stays up before reverting to idle
    #[serde(default = "default_saved_indicator_ms")]
    pub saved_indicator_ms: u64,

    /// Re-run a save that was dropped because another save was in flight
    #[serde(default)]
    pub retry_dropped: bool,
}

impl Default for AutoSaveSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            delay_ms: default_delay_ms(),
            saved_indicator_ms: default_saved_indicator_ms(),
            retry_dropped: false,
        }
    }
}

impl AutoSaveSettings {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn saved_indicator(&self) -> Duration {
        Duration::from_millis(self.saved_indicator_ms)
    }
}

/// Review gate and keyboard settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewSettings {
    /// OCR/hybrid extractions below this confidence require human review
    #[serde(default = "default_review_threshold")]
    pub review_threshold: f64,

    #[serde(default = "default_true")]
    pub document_navigation: bool,

    #[serde(default = "default_true")]
    pub review_shortcuts: bool,
}

impl Default for ReviewSettings {
    fn default() -> Self {
        Self {
            review_threshold: default_review_threshold(),
            document_navigation: true,
            review_shortcuts: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default)]
    pub debug_mode: bool,

    #[serde(default = "default_true")]
    pub console: bool,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    /// Write the log file as JSON lines instead of plain text
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            debug_mode: false,
            console: true,
            log_dir: default_log_dir(),
            json: false,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_delay_ms() -> u64 {
    2000
}

fn default_saved_indicator_ms() -> u64 {
    2000
}

fn default_review_threshold() -> f64 {
    0.7
}

fn default_log_dir() -> String {
    "logs".to_string()
}
