//! Field tree definitions.
//!
//! A field tree arrives already validated: names are unique among
//! data-affecting siblings and every variant carries only the attributes
//! that matter for storage.

mod collection;

pub use collection::{CollectionConfig, GlobalConfig, SchemaConfig, VersionsConfig};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field node of a document schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Field {
    Text(TextField),
    Textarea(TextField),
    Email(TextField),
    Code(TextField),
    Number(NumberField),
    Date(ScalarField),
    Checkbox(ScalarField),
    RichText(ScalarField),
    Json(ScalarField),
    Point(ScalarField),
    Select(SelectField),
    Radio(SelectField),
    Relationship(RelationshipField),
    Upload(RelationshipField),
    Group(GroupField),
    Array(ArrayField),
    Blocks(BlocksField),
    Tabs(TabsField),
    Row(LayoutField),
    Collapsible(LayoutField),
    Ui(UiField),
}

impl Field {
    /// Returns the data name of the field, if it has one.
    pub fn name(&self) -> Option<&str> {
        match self {
            Field::Text(f) | Field::Textarea(f) | Field::Email(f) | Field::Code(f) => {
                Some(&f.attrs.name)
            }
            Field::Number(f) => Some(&f.attrs.name),
            Field::Date(f)
            | Field::Checkbox(f)
            | Field::RichText(f)
            | Field::Json(f)
            | Field::Point(f) => Some(&f.attrs.name),
            Field::Select(f) | Field::Radio(f) => Some(&f.attrs.name),
            Field::Relationship(f) | Field::Upload(f) => Some(&f.attrs.name),
            Field::Array(f) => Some(&f.attrs.name),
            Field::Blocks(f) => Some(&f.attrs.name),
            Field::Group(f) => f.name.as_deref(),
            Field::Tabs(_) | Field::Row(_) | Field::Collapsible(_) | Field::Ui(_) => None,
        }
    }

    /// Type tag as written in the field tree.
    pub fn kind(&self) -> &'static str {
        match self {
            Field::Text(_) => "text",
            Field::Textarea(_) => "textarea",
            Field::Email(_) => "email",
            Field::Code(_) => "code",
            Field::Number(_) => "number",
            Field::Date(_) => "date",
            Field::Checkbox(_) => "checkbox",
            Field::RichText(_) => "richText",
            Field::Json(_) => "json",
            Field::Point(_) => "point",
            Field::Select(_) => "select",
            Field::Radio(_) => "radio",
            Field::Relationship(_) => "relationship",
            Field::Upload(_) => "upload",
            Field::Group(_) => "group",
            Field::Array(_) => "array",
            Field::Blocks(_) => "blocks",
            Field::Tabs(_) => "tabs",
            Field::Row(_) => "row",
            Field::Collapsible(_) => "collapsible",
            Field::Ui(_) => "ui",
        }
    }

    /// The `_status` select added to collections with drafts enabled.
    pub fn draft_status() -> Self {
        Field::Select(SelectField {
            attrs: FieldAttrs {
                name: "_status".to_string(),
                default_value: Some(Value::String("draft".to_string())),
                index: true,
                ..FieldAttrs::default()
            },
            options: vec![
                SelectOption::Value("draft".to_string()),
                SelectOption::Value("published".to_string()),
            ],
            has_many: false,
            enum_name: None,
            db_name: None,
        })
    }
}

/// Attributes shared by every data-affecting field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldAttrs {
    pub name: String,
    #[serde(default)]
    pub localized: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub index: bool,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    /// Field is shown behind a display condition
    #[serde(default)]
    pub conditional: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScalarField {
    #[serde(flatten)]
    pub attrs: FieldAttrs,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextField {
    #[serde(flatten)]
    pub attrs: FieldAttrs,
    #[serde(default)]
    pub has_many: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumberField {
    #[serde(flatten)]
    pub attrs: FieldAttrs,
    #[serde(default)]
    pub has_many: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectField {
    #[serde(flatten)]
    pub attrs: FieldAttrs,
    pub options: Vec<SelectOption>,
    #[serde(default)]
    pub has_many: bool,
    /// Overrides the derived enum name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enum_name: Option<String>,
    /// Overrides the derived child table name of a multi-valued select
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_name: Option<String>,
}

impl SelectField {
    /// Option values in declaration order.
    pub fn values(&self) -> Vec<String> {
        self.options.iter().map(|o| o.value().to_string()).collect()
    }
}

/// Select option, either a bare value or a labelled value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SelectOption {
    Value(String),
    Labeled { label: String, value: String },
}

impl SelectOption {
    pub fn value(&self) -> &str {
        match self {
            SelectOption::Value(value) => value,
            SelectOption::Labeled { value, .. } => value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipField {
    #[serde(flatten)]
    pub attrs: FieldAttrs,
    pub relation_to: RelationTo,
    #[serde(default)]
    pub has_many: bool,
}

/// Target collection(s) of a relationship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RelationTo {
    One(String),
    Many(Vec<String>),
}

impl RelationTo {
    /// Target slugs in declaration order.
    pub fn slugs(&self) -> Vec<&str> {
        match self {
            RelationTo::One(slug) => vec![slug.as_str()],
            RelationTo::Many(slugs) => slugs.iter().map(String::as_str).collect(),
        }
    }

    /// True when more than one collection can be referenced.
    pub fn is_polymorphic(&self) -> bool {
        matches!(self, RelationTo::Many(slugs) if slugs.len() > 1)
    }
}

/// Named or anonymous nested field set stored on the enclosing table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupField {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub localized: bool,
    #[serde(default)]
    pub conditional: bool,
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrayField {
    #[serde(flatten)]
    pub attrs: FieldAttrs,
    pub fields: Vec<Field>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlocksField {
    #[serde(flatten)]
    pub attrs: FieldAttrs,
    pub blocks: Vec<Block>,
}

/// Named block shape. One table per slug per root table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub slug: String,
    pub fields: Vec<Field>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabsField {
    pub tabs: Vec<Tab>,
    #[serde(default)]
    pub conditional: bool,
}

/// Tab of a tab set; a named tab stores like a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tab {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub localized: bool,
    #[serde(default)]
    pub conditional: bool,
    pub fields: Vec<Field>,
}

/// Row or collapsible: layout only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutField {
    pub fields: Vec<Field>,
    #[serde(default)]
    pub conditional: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiField {
    pub name: String,
}
