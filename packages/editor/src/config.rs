//! Session configuration

use crate::form::LocalZone;
use std::time::Duration;

/// Quiet period after the last edit before an autosave is attempted
pub const DEFAULT_AUTOSAVE_DEBOUNCE: Duration = Duration::from_millis(3000);

/// Path the backend serves rendered pages under
pub const DEFAULT_PREVIEW_BASE: &str = "/preview/";

#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub autosave_debounce: Duration,
    pub preview_base: String,

    /// Zone used to show and rebuild datetime fields
    pub zone: LocalZone,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            autosave_debounce: DEFAULT_AUTOSAVE_DEBOUNCE,
            preview_base: DEFAULT_PREVIEW_BASE.to_string(),
            zone: LocalZone::default(),
        }
    }
}

impl SessionConfig {
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.autosave_debounce = debounce;
        self
    }

    pub fn with_preview_base(mut self, base: impl Into<String>) -> Self {
        self.preview_base = base.into();
        self
    }

    pub fn with_zone(mut self, zone: LocalZone) -> Self {
        self.zone = zone;
        self
    }
}
