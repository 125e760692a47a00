//! Contentful JSON payloads and their conversion into repository records.

use refaudit_protocol::{
    ContentTypeRecord, Entry, EntryId, FieldItems, FieldRecord, LinkResolutionError,
    LocaleRecord,
};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Envelope shared by every collection endpoint.
#[derive(Debug, Deserialize)]
pub struct Collection<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub skip: u64,
    #[serde(default)]
    pub limit: u64,
    /// Present on entry collections when included links could not be resolved.
    #[serde(default = "Vec::new")]
    pub errors: Vec<ApiError>,
}

#[derive(Debug, Deserialize)]
pub struct Sys {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct ContentTypeItem {
    pub sys: Sys,
    pub name: String,
    #[serde(rename = "displayField", default)]
    pub display_field: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldItem>,
}

#[derive(Debug, Deserialize)]
pub struct FieldItem {
    pub id: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub items: Option<FieldItemsItem>,
}

#[derive(Debug, Deserialize)]
pub struct FieldItemsItem {
    #[serde(rename = "type")]
    pub item_type: String,
}

#[derive(Debug, Deserialize)]
pub struct EntryItem {
    pub sys: Sys,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub sys: Option<Sys>,
    #[serde(default)]
    pub details: Option<ErrorDetails>,
}

#[derive(Debug, Deserialize)]
pub struct ErrorDetails {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LocaleItem {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub default: bool,
}

impl From<ContentTypeItem> for ContentTypeRecord {
    fn from(item: ContentTypeItem) -> Self {
        ContentTypeRecord {
            id: item.sys.id.into(),
            name: item.name,
            display_field: item
                .display_field
                .filter(|field| !field.is_empty())
                .map(Into::into),
            fields: item.fields.into_iter().map(FieldRecord::from).collect(),
        }
    }
}

impl From<FieldItem> for FieldRecord {
    fn from(item: FieldItem) -> Self {
        FieldRecord {
            id: item.id.into(),
            field_type: item.field_type,
            disabled: item.disabled,
            items: item.items.map(|items| FieldItems {
                item_type: items.item_type,
            }),
        }
    }
}

impl From<EntryItem> for Entry {
    fn from(item: EntryItem) -> Self {
        Entry {
            id: item.sys.id.into(),
            fields: item.fields,
        }
    }
}

impl From<ApiError> for LinkResolutionError {
    fn from(error: ApiError) -> Self {
        let (kind, target) = match error.details {
            Some(details) => (details.kind, details.id),
            None => (None, None),
        };
        LinkResolutionError {
            // Errors without details fall back to their own id (e.g. "notResolvable").
            kind: kind
                .or_else(|| error.sys.map(|sys| sys.id))
                .unwrap_or_default(),
            target_id: target.map(EntryId::from),
        }
    }
}

impl From<LocaleItem> for LocaleRecord {
    fn from(item: LocaleItem) -> Self {
        LocaleRecord {
            code: item.code.into(),
            name: item.name,
            default: item.default,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_entry_collection_with_errors() {
        let payload = json!({
            "sys": { "type": "Array" },
            "total": 2,
            "skip": 0,
            "limit": 1000,
            "items": [
                {
                    "sys": { "id": "e1", "type": "Entry" },
                    "fields": {
                        "title": "First",
                        "author": { "sys": { "type": "Link", "linkType": "Entry", "id": "x1" } }
                    }
                },
                { "sys": { "id": "e2", "type": "Entry" }, "fields": { "title": "Second" } }
            ],
            "errors": [
                {
                    "sys": { "id": "notResolvable", "type": "error" },
                    "details": { "type": "Link", "linkType": "Entry", "id": "x1" }
                }
            ]
        });

        let collection: Collection<EntryItem> = serde_json::from_value(payload).unwrap();
        assert_eq!(collection.total, Some(2));
        assert_eq!(collection.items.len(), 2);

        let errors: Vec<LinkResolutionError> =
            collection.errors.into_iter().map(Into::into).collect();
        assert_eq!(errors, vec![LinkResolutionError::link("x1")]);

        let entry = Entry::from(collection.items.into_iter().next().unwrap());
        assert_eq!(entry.id.as_str(), "e1");
        assert_eq!(entry.fields["title"], json!("First"));
    }

    #[test]
    fn missing_errors_and_items_default_to_empty() {
        let collection: Collection<EntryItem> =
            serde_json::from_value(json!({ "total": 0, "skip": 0, "limit": 1 })).unwrap();
        assert!(collection.items.is_empty());
        assert!(collection.errors.is_empty());
    }

    #[test]
    fn error_without_details_keeps_sys_id_as_kind() {
        let error: ApiError =
            serde_json::from_value(json!({ "sys": { "id": "notResolvable" } })).unwrap();
        let converted = LinkResolutionError::from(error);
        assert_eq!(converted.kind, "notResolvable");
        assert!(converted.target_id.is_none());
        assert!(!converted.is_link());
    }

    #[test]
    fn decodes_content_type_fields() {
        let item: ContentTypeItem = serde_json::from_value(json!({
            "sys": { "id": "article" },
            "name": "Article",
            "displayField": "title",
            "fields": [
                { "id": "title", "type": "Symbol" },
                { "id": "author", "type": "Link", "linkType": "Entry" },
                { "id": "related", "type": "Array", "items": { "type": "Link", "linkType": "Entry" } },
                { "id": "legacy", "type": "Link", "disabled": true }
            ]
        }))
        .unwrap();

        let record = ContentTypeRecord::from(item);
        assert_eq!(record.id.as_str(), "article");
        assert_eq!(record.display_field.as_ref().map(|f| f.as_str()), Some("title"));
        assert_eq!(record.fields.len(), 4);
        assert_eq!(record.fields[2].item_type(), Some("Link"));
        assert!(record.fields[3].disabled);
    }

    #[test]
    fn empty_display_field_is_absent() {
        let item: ContentTypeItem = serde_json::from_value(json!({
            "sys": { "id": "tag" },
            "name": "Tag",
            "displayField": "",
            "fields": []
        }))
        .unwrap();
        assert!(ContentTypeRecord::from(item).display_field.is_none());
    }

    #[test]
    fn decodes_locales() {
        let collection: Collection<LocaleItem> = serde_json::from_value(json!({
            "items": [
                { "code": "en-US", "name": "English (United States)", "default": true },
                { "code": "de-DE", "name": "German (Germany)" }
            ]
        }))
        .unwrap();
        let locales: Vec<LocaleRecord> = collection.items.into_iter().map(Into::into).collect();
        assert!(locales[0].default);
        assert!(!locales[1].default);
        assert_eq!(locales[1].code.as_str(), "de-DE");
    }
}
