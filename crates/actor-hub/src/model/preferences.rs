use serde::{Deserialize, Serialize};

/// Per-user preferences, persisted as JSON by the settings actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    pub theme: String,
    pub language: String,
    pub notifications_enabled: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            theme: "light".to_string(),
            language: "en".to_string(),
            notifications_enabled: true,
        }
    }
}

/// Partial update of [`Preferences`]. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreferencesUpdate {
    pub theme: Option<String>,
    pub language: Option<String>,
    pub notifications_enabled: Option<bool>,
}

impl PreferencesUpdate {
    pub fn is_empty(&self) -> bool {
        self.theme.is_none() && self.language.is_none() && self.notifications_enabled.is_none()
    }

    /// Applies every field that is set.
    pub fn apply_to(self, prefs: &mut Preferences) {
        if let Some(theme) = self.theme {
            prefs.theme = theme;
        }
        if let Some(language) = self.language {
            prefs.language = language;
        }
        if let Some(enabled) = self.notifications_enabled {
            prefs.notifications_enabled = enabled;
        }
    }
}
