//! Locale definitions

use serde::{Deserialize, Serialize};

/// Supported content locales
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    /// English (King James Version)
    #[default]
    En,
    /// Russian (Synodal translation)
    Ru,
}

impl Locale {
    /// Wire code sent to the backend
    pub const fn code(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Ru => "ru",
        }
    }

    /// Translation used by default for this locale
    pub const fn default_translation(&self) -> &'static str {
        match self {
            Self::En => "kjv",
            Self::Ru => "rst",
        }
    }

    /// Display name of the default translation
    pub const fn translation_name(&self) -> &'static str {
        match self {
            Self::En => "KJV",
            Self::Ru => "Синодальный",
        }
    }

    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "en" | "english" => Some(Self::En),
            "ru" | "russian" => Some(Self::Ru),
            _ => None,
        }
    }
}

impl std::fmt::Display for Locale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}
