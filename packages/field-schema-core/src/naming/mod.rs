//! Identifier derivation.
//!
//! Every physical name the compiler emits is produced here:
//! - segments are normalized to snake_case and joined with `_`
//! - names over the identifier limit keep a prefix and gain `_` + 8 hex
//!   digits of a CRC-32 over the full name
//!
//! Derivation is pure. Uniqueness across the whole schema is enforced by
//! [`NameTable`], which remembers the logical path that claimed each name.

mod name_table;

pub use name_table::{NameKind, NameTable};

/// Separator between name segments.
pub const SEPARATOR: char = '_';

/// Length of the `_xxxxxxxx` suffix appended to truncated names.
const HASH_SUFFIX_LEN: usize = 9;

/// Derives table, column, index, constraint and enum identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Naming {
    max_len: usize,
}

impl Naming {
    /// Creates a naming service for the given identifier limit.
    pub fn new(max_len: usize) -> Self {
        Self { max_len }
    }

    /// Returns the identifier limit.
    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Joins normalized segments and fits the result to the identifier limit.
    ///
    /// Empty segments are dropped.
    pub fn derive<S: AsRef<str>>(&self, segments: &[S]) -> String {
        let joined = segments
            .iter()
            .map(|s| to_snake_case(s.as_ref()))
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("_");
        self.fit(joined)
    }

    /// Column name for a field under a column prefix.
    pub fn column(&self, prefix: &[String], name: &str) -> String {
        let mut segments: Vec<&str> = prefix.iter().map(String::as_str).collect();
        segments.push(name);
        self.derive(&segments)
    }

    /// Child table name under an already-derived parent table.
    pub fn child_table(&self, parent: &str, prefix: &[String], name: &str) -> String {
        let mut segments: Vec<&str> = Vec::with_capacity(prefix.len() + 2);
        segments.push(parent);
        segments.extend(prefix.iter().map(String::as_str));
        segments.push(name);
        self.derive(&segments)
    }

    /// Index name: `<table>_<columns>_idx`.
    pub fn index(&self, table: &str, columns: &[&str]) -> String {
        let mut segments = Vec::with_capacity(columns.len() + 2);
        segments.push(table);
        segments.extend_from_slice(columns);
        segments.push("idx");
        self.derive(&segments)
    }

    /// Foreign key name: `<table>_<column>_fk`.
    pub fn foreign_key(&self, table: &str, column: &str) -> String {
        self.derive(&[table, column, "fk"])
    }

    /// Enum type name for a field: `enum_<table>_<prefix>_<name>`.
    pub fn enum_type(&self, table: &str, prefix: &[String], name: &str) -> String {
        let mut segments: Vec<&str> = vec!["enum", table];
        segments.extend(prefix.iter().map(String::as_str));
        segments.push(name);
        self.derive(&segments)
    }

    /// Locale side-table name: `<table>_locales`.
    pub fn locales_table(&self, table: &str) -> String {
        self.derive(&[table, "locales"])
    }

    /// Shared block table name: `<root>_blocks_<slug>`.
    pub fn block_table(&self, root: &str, slug: &str) -> String {
        self.derive(&[root, "blocks", slug])
    }

    /// Consolidated relationship table name: `<root>_rels`.
    pub fn relationships_table(&self, root: &str) -> String {
        self.derive(&[root, "rels"])
    }

    /// Version history table name: `_<base>_v`.
    pub fn versions_table(&self, base: &str) -> String {
        self.derive(&[format!("_{}", to_snake_case(base)).as_str(), "v"])
    }

    /// Truncates a name that exceeds the limit, appending a content hash.
    pub fn fit(&self, name: String) -> String {
        if name.len() <= self.max_len {
            return name;
        }
        let digest = crc32fast::hash(name.as_bytes());
        let keep = floor_char_boundary(&name, self.max_len.saturating_sub(HASH_SUFFIX_LEN));
        let fitted = format!("{}_{:08x}", &name[..keep], digest);
        tracing::warn!("Truncated identifier '{}' to '{}'", name, fitted);
        fitted
    }
}

/// Normalizes an identifier segment to snake_case.
///
/// Leading and doubled underscores are preserved so that already-normalized
/// names pass through unchanged.
pub fn to_snake_case(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_uppercase() => next.is_some_and(|n| n.is_lowercase()),
                _ => false,
            };
            if boundary && !out.ends_with(SEPARATOR) {
                out.push(SEPARATOR);
            }
            out.extend(c.to_lowercase());
        } else if c.is_alphanumeric() || c == SEPARATOR {
            out.push(c);
        } else {
            out.push(SEPARATOR);
        }
    }
    out
}

fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    (0..=index).rev().find(|&i| s.is_char_boundary(i)).unwrap_or(0)
}

/// Logical path of a table or field, used as the claim source for names.
///
/// `.` separates field segments, `#` marks a structural suffix such as a
/// locale side-table, so logical paths never look like field paths.
pub fn logical_path(parent: &str, prefix: &[String], name: &str) -> String {
    let mut path = String::from(parent);
    for segment in prefix.iter().map(String::as_str).chain(std::iter::once(name)) {
        if !path.is_empty() {
            path.push('.');
        }
        path.push_str(segment);
    }
    path
}
