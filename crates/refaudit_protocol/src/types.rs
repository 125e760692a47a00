//! Record shapes exchanged with a content repository.

use crate::ids::{ContentTypeId, EntryId, FieldId, LocaleCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field type of a direct entry reference.
pub const LINK_FIELD_TYPE: &str = "Link";

/// Field type of an ordered collection; link-capable when its items are links.
pub const ARRAY_FIELD_TYPE: &str = "Array";

/// Error kind the repository attaches to an unresolvable link target.
pub const LINK_ERROR_KIND: &str = "Link";

// =============================================================================
// Schema
// =============================================================================

/// A content type as listed by the repository schema API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentTypeRecord {
    pub id: ContentTypeId,
    pub name: String,
    /// Field used as the human-readable title of an entry, if any.
    #[serde(default)]
    pub display_field: Option<FieldId>,
    #[serde(default)]
    pub fields: Vec<FieldRecord>,
}

impl ContentTypeRecord {
    pub fn new(id: impl Into<ContentTypeId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            display_field: None,
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, field: FieldRecord) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_display_field(mut self, field: impl Into<FieldId>) -> Self {
        self.display_field = Some(field.into());
        self
    }
}

/// One field definition of a content type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRecord {
    pub id: FieldId,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default)]
    pub disabled: bool,
    /// Item definition, present for `Array` fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<FieldItems>,
}

impl FieldRecord {
    pub fn new(id: impl Into<FieldId>, field_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            field_type: field_type.into(),
            disabled: false,
            items: None,
        }
    }

    /// A single-reference field.
    pub fn link(id: impl Into<FieldId>) -> Self {
        Self::new(id, LINK_FIELD_TYPE)
    }

    /// An array field whose items are references.
    pub fn link_array(id: impl Into<FieldId>) -> Self {
        Self::new(id, ARRAY_FIELD_TYPE).with_items(LINK_FIELD_TYPE)
    }

    pub fn with_items(mut self, item_type: impl Into<String>) -> Self {
        self.items = Some(FieldItems {
            item_type: item_type.into(),
        });
        self
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    pub fn item_type(&self) -> Option<&str> {
        self.items.as_ref().map(|items| items.item_type.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldItems {
    #[serde(rename = "type")]
    pub item_type: String,
}

/// A locale configured in the repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocaleRecord {
    pub code: LocaleCode,
    pub name: String,
    #[serde(default)]
    pub default: bool,
}

// =============================================================================
// Entries
// =============================================================================

/// An entry in a single locale: its identifier plus raw field values.
///
/// Link values keep the repository's reference shape (`{"sys": {"id": ...}}`),
/// either alone or inside an array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: EntryId,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl Entry {
    pub fn new(id: impl Into<EntryId>) -> Self {
        Self {
            id: id.into(),
            fields: Map::new(),
        }
    }

    pub fn with_field(mut self, field: &str, value: Value) -> Self {
        self.fields.insert(field.to_string(), value);
        self
    }

    pub fn field(&self, field: &FieldId) -> Option<&Value> {
        self.fields.get(field.as_str())
    }
}

/// A link-resolution problem reported alongside one fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkResolutionError {
    pub kind: String,
    #[serde(default)]
    pub target_id: Option<EntryId>,
}

impl LinkResolutionError {
    /// A dangling entry link.
    pub fn link(target_id: impl Into<EntryId>) -> Self {
        Self {
            kind: LINK_ERROR_KIND.to_string(),
            target_id: Some(target_id.into()),
        }
    }

    pub fn is_link(&self) -> bool {
        self.kind == LINK_ERROR_KIND
    }
}

/// Parameters of one entry page request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryPageQuery {
    pub content_type: ContentTypeId,
    pub locale: LocaleCode,
    pub skip: u64,
    pub limit: u64,
}

/// One page of entries plus the errors the repository attached to that fetch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryPage {
    #[serde(default)]
    pub items: Vec<Entry>,
    #[serde(default)]
    pub errors: Vec<LinkResolutionError>,
    /// Total entries of the type, when the repository reports it.
    #[serde(default)]
    pub total: Option<u64>,
}
