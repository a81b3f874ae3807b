//! Per-frame walk state.

use crate::naming::logical_path;
use crate::table::IdType;

/// Root table of a compilation pass: the table shared blocks and the
/// consolidated relationship table hang off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootRef {
    pub table: String,
    pub source: String,
    pub id_type: IdType,
}

/// Walk options supplied by whoever starts a table build.
#[derive(Debug, Clone)]
pub struct WalkOptions {
    pub root: RootRef,
    /// Column name prefix segments (raw field names)
    pub column_prefix: Vec<String>,
    /// Relation path prefix segments (raw field names)
    pub path_prefix: Vec<String>,
    /// NOT NULL is inapplicable below this point
    pub disable_not_null: bool,
    /// Unique indexes are demoted to plain indexes
    pub disable_unique: bool,
    /// The table already carries a `_locale` column
    pub within_localized: bool,
}

impl WalkOptions {
    /// Options for walking a root table's own fields.
    pub fn root(root: RootRef) -> Self {
        Self {
            root,
            column_prefix: Vec::new(),
            path_prefix: Vec::new(),
            disable_not_null: false,
            disable_unique: false,
            within_localized: false,
        }
    }
}

/// State of one walk frame.
#[derive(Debug, Clone)]
pub struct WalkContext {
    pub root: RootRef,
    /// Table the current fields store into
    pub table: String,
    pub table_source: String,
    /// Id type of `table`, referenced by child tables
    pub id_type: IdType,
    pub column_prefix: Vec<String>,
    pub path_prefix: Vec<String>,
    pub disable_not_null: bool,
    pub disable_unique: bool,
    pub within_localized: bool,
    /// A localized group or tab encloses the current fields
    pub force_localized: bool,
    /// Localization capability of the session
    pub localization: bool,
}

impl WalkContext {
    pub fn new(
        table: &str,
        table_source: &str,
        id_type: IdType,
        options: WalkOptions,
        localization: bool,
    ) -> Self {
        Self {
            root: options.root,
            table: table.to_string(),
            table_source: table_source.to_string(),
            id_type,
            column_prefix: options.column_prefix,
            path_prefix: options.path_prefix,
            disable_not_null: options.disable_not_null,
            disable_unique: options.disable_unique,
            within_localized: options.within_localized,
            force_localized: false,
            localization,
        }
    }

    /// Dotted field path of a field in this frame (`meta.title`).
    pub fn field_path(&self, name: &str) -> String {
        logical_path("", &self.path_prefix, name)
    }

    /// Logical source of a child table or enum created for a field.
    pub fn child_source(&self, name: &str) -> String {
        logical_path(&self.table_source, &self.path_prefix, name)
    }

    /// True when a field's columns belong on the locale side-table.
    ///
    /// Inside a container that already has a `_locale` column the flag is
    /// redundant and the column stays on the container's table.
    pub fn routes_to_locales(&self, localized: bool) -> bool {
        self.localization && (localized || self.force_localized) && !self.within_localized
    }

    /// True when a field's data varies per locale, wherever it is stored.
    pub fn is_localized(&self, localized: bool) -> bool {
        self.localization && (localized || self.force_localized || self.within_localized)
    }

    /// Frame for the children of a named group or tab.
    pub fn nested(&self, name: &str, localized: bool, conditional: bool) -> Self {
        let mut nested = self.in_place(localized, conditional);
        nested.column_prefix.push(name.to_string());
        nested.path_prefix.push(name.to_string());
        nested
    }

    /// Frame for the children of a pure layout container or anonymous group.
    pub fn in_place(&self, localized: bool, conditional: bool) -> Self {
        let mut frame = self.clone();
        frame.force_localized |= localized && self.localization;
        frame.disable_not_null |= conditional;
        frame
    }

    /// Walk options for a child table keyed back to this frame's table.
    pub fn child_options(&self, within_localized: bool, conditional: bool) -> WalkOptions {
        WalkOptions {
            root: self.root.clone(),
            column_prefix: Vec::new(),
            path_prefix: Vec::new(),
            disable_not_null: self.disable_not_null || conditional,
            disable_unique: self.disable_unique,
            within_localized,
        }
    }
}
