//! Document type definitions that own a field tree.

use serde::{Deserialize, Serialize};

use super::Field;
use crate::config::CompilerConfig;
use crate::table::IdType;

fn default_true() -> bool {
    true
}

/// Version history options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionsConfig {
    /// Drafts add a `_status` field and a `latest` flag on versions
    #[serde(default)]
    pub drafts: bool,
}

/// Repeatable document type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionConfig {
    pub slug: String,
    /// Overrides the table name derived from the slug
    #[serde(default)]
    pub db_name: Option<String>,
    pub fields: Vec<Field>,
    /// Id column type; falls back to the compiler default
    #[serde(default)]
    pub id_type: Option<IdType>,
    #[serde(default = "default_true")]
    pub timestamps: bool,
    #[serde(default)]
    pub versions: Option<VersionsConfig>,
}

impl CollectionConfig {
    /// Creates a collection with timestamps and no versions.
    pub fn new(slug: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            slug: slug.into(),
            db_name: None,
            fields,
            id_type: None,
            timestamps: true,
            versions: None,
        }
    }

    /// Returns true when drafts are enabled.
    pub fn drafts(&self) -> bool {
        self.versions.as_ref().is_some_and(|v| v.drafts)
    }
}

/// Singleton document type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalConfig {
    pub slug: String,
    #[serde(default)]
    pub db_name: Option<String>,
    pub fields: Vec<Field>,
    #[serde(default)]
    pub versions: Option<VersionsConfig>,
}

impl GlobalConfig {
    pub fn new(slug: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            slug: slug.into(),
            db_name: None,
            fields,
            versions: None,
        }
    }

    pub fn drafts(&self) -> bool {
        self.versions.as_ref().is_some_and(|v| v.drafts)
    }
}

/// Everything one compilation run needs, as loaded from a config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaConfig {
    #[serde(default)]
    pub compiler: CompilerConfig,
    #[serde(default)]
    pub collections: Vec<CollectionConfig>,
    #[serde(default)]
    pub globals: Vec<GlobalConfig>,
}
