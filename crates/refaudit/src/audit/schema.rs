//! Content model discovery
//!
//! Picks out the content types that can hold entry links and probes each one
//! for its entry count.

use super::state::ContentModel;
use crate::repository::{ContentRepository, RepositoryError};
use refaudit_protocol::{ContentTypeRecord, FieldId, FieldRecord, ARRAY_FIELD_TYPE, LINK_FIELD_TYPE};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// An enabled single link or an enabled array of links
pub fn is_link_field(field: &FieldRecord) -> bool {
    if field.disabled {
        return false;
    }
    field.field_type == LINK_FIELD_TYPE
        || (field.field_type == ARRAY_FIELD_TYPE && field.item_type() == Some(LINK_FIELD_TYPE))
}

/// Link-capable field ids of a content type, in schema order
pub fn link_fields(record: &ContentTypeRecord) -> Vec<FieldId> {
    record
        .fields
        .iter()
        .filter(|field| is_link_field(field))
        .map(|field| field.id.clone())
        .collect()
}

/// Fetch the schema and build a pending [`ContentModel`] for every type with
/// at least one link field.
///
/// A failed schema fetch fails discovery. A failed count probe only leaves
/// that model without a total.
pub async fn discover_models(
    repository: &dyn ContentRepository,
) -> Result<Vec<ContentModel>, RepositoryError> {
    let records = repository.list_content_types().await?;
    debug!(
        repository = repository.name(),
        content_types = records.len(),
        "Fetched content type schema"
    );

    let mut seen = HashSet::new();
    let mut models = Vec::new();
    for record in records {
        if !seen.insert(record.id.clone()) {
            warn!(content_type = %record.id, "Duplicate content type in schema, skipping");
            continue;
        }

        let fields = link_fields(&record);
        if fields.is_empty() {
            debug!(content_type = %record.id, "No link fields, excluded from scan");
            continue;
        }

        let total_entries = match repository.count_entries(&record.id).await {
            Ok(total) => Some(total),
            Err(e) => {
                warn!(content_type = %record.id, error = %e, "Entry count probe failed");
                None
            }
        };

        models.push(ContentModel::pending(record, fields, total_entries));
    }

    info!(models = models.len(), "Discovered content models with link fields");
    Ok(models)
}
