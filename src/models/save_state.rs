use std::fmt;
use std::time::SystemTime;

/// Status of the autosave state machine.
///
/// `Idle -> Saving -> {Saved, Error}`; `Saved` falls back to `Idle` after the
/// cool-down, `Error` sticks until the next save attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveStatus {
    #[default]
    Idle,
    Saving,
    Saved,
    Error,
}

impl fmt::Display for SaveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SaveStatus::Idle => "idle",
            SaveStatus::Saving => "saving",
            SaveStatus::Saved => "saved",
            SaveStatus::Error => "error",
        };
        f.write_str(label)
    }
}

/// Observable output of an autosave session
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SaveState {
    pub status: SaveStatus,
    /// Wall-clock time of the last successful save
    pub last_saved: Option<SystemTime>,
    /// Message of the last failed save; cleared when a new attempt starts
    pub error: Option<String>,
}

impl SaveState {
    pub fn is_saving(&self) -> bool {
        self.status == SaveStatus::Saving
    }

    /// Short label for status indicators
    pub fn label(&self) -> String {
        match (&self.status, &self.error) {
            (SaveStatus::Error, Some(message)) => format!("Save failed: {}", message),
            (SaveStatus::Saving, _) => "Saving...".to_string(),
            (SaveStatus::Saved, _) => "All changes saved".to_string(),
            _ => String::new(),
        }
    }
}
