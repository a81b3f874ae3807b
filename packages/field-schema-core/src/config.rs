//! Compiler configuration.

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;
use crate::table::IdType;

/// Identifier limit used by PostgreSQL (NAMEDATALEN - 1).
pub const DEFAULT_MAX_IDENTIFIER_LENGTH: usize = 63;

/// Smallest limit that still leaves room for a readable prefix and a hash suffix.
pub const MIN_IDENTIFIER_LENGTH: usize = 16;

/// Compiler configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompilerConfig {
    /// Maximum identifier length of the target storage engine
    pub max_identifier_length: usize,
    /// Localization support (None = single-locale system)
    pub localization: Option<LocalizationConfig>,
    /// Id type used by collections that do not declare one
    pub default_id_type: IdType,
    /// Fractional second precision of timestamp columns
    pub timestamp_precision: u8,
}

impl CompilerConfig {
    /// Returns true if the owning system supports multiple locales.
    pub fn localization_enabled(&self) -> bool {
        self.localization.is_some()
    }

    /// Checks the capability settings before a session is opened.
    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.max_identifier_length < MIN_IDENTIFIER_LENGTH {
            return Err(SchemaError::IdentifierLimitTooSmall {
                limit: self.max_identifier_length,
                minimum: MIN_IDENTIFIER_LENGTH,
            });
        }
        if let Some(localization) = &self.localization {
            if localization.locales.is_empty() {
                return Err(SchemaError::EmptyLocales);
            }
        }
        Ok(())
    }
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            max_identifier_length: DEFAULT_MAX_IDENTIFIER_LENGTH,
            localization: None,
            default_id_type: IdType::Integer,
            timestamp_precision: 3,
        }
    }
}

/// Locales available to localized fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalizationConfig {
    /// Locale codes, in declaration order
    pub locales: Vec<String>,
    /// Locale used when none is requested
    #[serde(default)]
    pub default_locale: Option<String>,
}

impl LocalizationConfig {
    /// Creates a localization config from locale codes.
    pub fn new<I, S>(locales: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let locales: Vec<String> = locales.into_iter().map(Into::into).collect();
        Self {
            default_locale: locales.first().cloned(),
            locales,
        }
    }
}
