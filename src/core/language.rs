//! Report language.
//!
//! Lives in `core` so the CLI parser, the catalog and the prompt builders
//! share one parsing and display implementation.

use serde::{Deserialize, Serialize};

/// Language a report (and its progress messages) is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// English.
    #[default]
    En,
    /// Simplified Chinese.
    Zh,
}

impl Language {
    /// Parses a language code (case-insensitive).
    ///
    /// Accepts `en`/`english` and `zh`/`chinese`/`zh-cn`. Returns `None` for
    /// anything else.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "en" | "english" | "en-us" | "en-gb" => Some(Self::En),
            "zh" | "chinese" | "zh-cn" | "zh-hans" => Some(Self::Zh),
            _ => None,
        }
    }

    /// Returns the two-letter code.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Zh => "zh",
        }
    }

    /// English name of the language, used in model instructions.
    #[must_use]
    pub const fn english_name(&self) -> &'static str {
        match self {
            Self::En => "English",
            Self::Zh => "Simplified Chinese",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("unknown language '{s}' (expected en or zh)"))
    }
}
