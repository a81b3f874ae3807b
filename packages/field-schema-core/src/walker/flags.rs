//! Subtree summaries bubbled up through the walk.

use serde::{Deserialize, Serialize};

/// Presence of multi-valued text or number fields in a subtree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MultiValued {
    #[default]
    Absent,
    Present,
    /// At least one of them asked for an index
    Indexed,
}

impl MultiValued {
    /// State contributed by a single multi-valued field.
    pub fn of(index: bool) -> Self {
        if index {
            MultiValued::Indexed
        } else {
            MultiValued::Present
        }
    }
}

/// Aggregate flags of a walked subtree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateFlags {
    pub has_localized_field: bool,
    pub has_many_text: MultiValued,
    pub has_many_number: MultiValued,
    pub has_localized_relationship: bool,
    pub has_polymorphic_relationship: bool,
}

impl AggregateFlags {
    /// Folds a child subtree's flags into these.
    pub fn merge(&mut self, other: AggregateFlags) {
        self.has_localized_field |= other.has_localized_field;
        self.has_many_text = self.has_many_text.max(other.has_many_text);
        self.has_many_number = self.has_many_number.max(other.has_many_number);
        self.has_localized_relationship |= other.has_localized_relationship;
        self.has_polymorphic_relationship |= other.has_polymorphic_relationship;
    }
}
