//! Broken-link correlation
//!
//! The repository reports unresolvable links per fetch, not per entry. An
//! entry of a batch is broken when one of its link fields points at a target
//! named by a `Link` error of that same batch.

use super::pager::EntryBatch;
use refaudit_protocol::{Entry, EntryId, FieldId, LinkResolutionError};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// Shape of a link field value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkShape<'a> {
    Single(&'a str),
    /// Target ids of an array value; elements without `sys.id` are skipped.
    Many(Vec<&'a str>),
    /// Missing, scalar, or a reference without `sys.id`
    Malformed,
}

fn reference_id(value: &Value) -> Option<&str> {
    value.get("sys")?.get("id")?.as_str()
}

pub fn link_shape(value: Option<&Value>) -> LinkShape<'_> {
    match value {
        Some(Value::Array(items)) => LinkShape::Many(items.iter().filter_map(reference_id).collect()),
        Some(value @ Value::Object(_)) => match reference_id(value) {
            Some(id) => LinkShape::Single(id),
            None => LinkShape::Malformed,
        },
        _ => LinkShape::Malformed,
    }
}

/// Target ids of the `Link` errors; other kinds are ignored.
pub fn dangling_targets(errors: &[LinkResolutionError]) -> HashSet<&str> {
    errors
        .iter()
        .filter(|error| error.is_link())
        .filter_map(|error| error.target_id.as_ref())
        .map(|target| target.as_str())
        .collect()
}

pub fn entry_has_broken_link(entry: &Entry, link_fields: &[FieldId], dangling: &HashSet<&str>) -> bool {
    link_fields
        .iter()
        .any(|field| match link_shape(entry.field(field)) {
            LinkShape::Single(target) => dangling.contains(target),
            LinkShape::Many(targets) => targets.iter().any(|target| dangling.contains(target)),
            LinkShape::Malformed => false,
        })
}

/// Entries of the batch with at least one dangling link, in batch order.
pub fn classify_batch(batch: &EntryBatch, link_fields: &[FieldId]) -> Vec<Entry> {
    if batch.errors.is_empty() {
        return Vec::new();
    }
    let dangling = dangling_targets(&batch.errors);
    if dangling.is_empty() {
        return Vec::new();
    }

    batch
        .items
        .iter()
        .filter(|entry| entry_has_broken_link(entry, link_fields, &dangling))
        .cloned()
        .collect()
}

/// Broken entries of one content type, unique by id in first-seen order
#[derive(Debug, Clone, Default)]
pub struct BrokenEntries {
    entries: Vec<Entry>,
    positions: HashMap<EntryId, usize>,
}

impl BrokenEntries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry. A known id replaces the stored copy in place; returns
    /// whether the entry was new.
    pub fn insert(&mut self, entry: Entry) -> bool {
        match self.positions.get(&entry.id) {
            Some(&position) => {
                self.entries[position] = entry;
                false
            }
            None => {
                self.positions.insert(entry.id.clone(), self.entries.len());
                self.entries.push(entry);
                true
            }
        }
    }

    /// Add many entries; returns how many were new.
    pub fn extend(&mut self, entries: impl IntoIterator<Item = Entry>) -> usize {
        entries
            .into_iter()
            .map(|entry| self.insert(entry))
            .filter(|added| *added)
            .count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &EntryId) -> bool {
        self.positions.contains_key(id)
    }

    pub fn to_vec(&self) -> Vec<Entry> {
        self.entries.clone()
    }

    pub fn into_vec(self) -> Vec<Entry> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn link(id: &str) -> Value {
        json!({ "sys": { "type": "Link", "linkType": "Entry", "id": id } })
    }

    fn batch(items: Vec<Entry>, errors: Vec<LinkResolutionError>) -> EntryBatch {
        EntryBatch {
            page_index: 0,
            skip: 0,
            items,
            errors,
        }
    }

    fn ids(entries: &[Entry]) -> Vec<&str> {
        entries.iter().map(|entry| entry.id.as_str()).collect()
    }

    #[test]
    fn shapes() {
        let single = link("a");
        let many = json!([link("a"), { "sys": {} }, link("b")]);
        let scalar = json!("a");
        let no_sys = json!({ "id": "a" });

        assert_eq!(link_shape(Some(&single)), LinkShape::Single("a"));
        assert_eq!(link_shape(Some(&many)), LinkShape::Many(vec!["a", "b"]));
        assert_eq!(link_shape(Some(&scalar)), LinkShape::Malformed);
        assert_eq!(link_shape(Some(&no_sys)), LinkShape::Malformed);
        assert_eq!(link_shape(None), LinkShape::Malformed);
    }

    #[test]
    fn single_link_field() {
        let fields = vec![FieldId::from("author")];
        let batch = batch(
            vec![
                Entry::new("e1").with_field("author", link("x1")),
                Entry::new("e2").with_field("author", link("a1")),
                Entry::new("e3"),
            ],
            vec![LinkResolutionError::link("x1")],
        );

        assert_eq!(ids(&classify_batch(&batch, &fields)), vec!["e1"]);
    }

    #[test]
    fn array_link_field() {
        let fields = vec![FieldId::from("related")];
        let batch = batch(
            vec![
                Entry::new("e1").with_field("related", json!([link("ok"), link("gone")])),
                Entry::new("e2").with_field("related", json!([link("ok")])),
                Entry::new("e3").with_field("related", json!([])),
            ],
            vec![LinkResolutionError::link("gone")],
        );

        assert_eq!(ids(&classify_batch(&batch, &fields)), vec!["e1"]);
    }

    #[test]
    fn only_tracked_fields_count() {
        let fields = vec![FieldId::from("author")];
        let batch = batch(
            vec![Entry::new("e1").with_field("untracked", link("x1"))],
            vec![LinkResolutionError::link("x1")],
        );
        assert!(classify_batch(&batch, &fields).is_empty());
    }

    #[test]
    fn empty_errors_mean_nothing_broken() {
        let fields = vec![FieldId::from("author")];
        let batch = batch(vec![Entry::new("e1").with_field("author", link("x1"))], Vec::new());
        assert!(classify_batch(&batch, &fields).is_empty());
    }

    #[test]
    fn non_link_errors_are_ignored() {
        let fields = vec![FieldId::from("author")];
        let batch = batch(
            vec![Entry::new("e1").with_field("author", link("x1"))],
            vec![
                LinkResolutionError {
                    kind: "notResolvable".to_string(),
                    target_id: Some("x1".into()),
                },
                LinkResolutionError {
                    kind: "Link".to_string(),
                    target_id: None,
                },
            ],
        );
        assert!(classify_batch(&batch, &fields).is_empty());
    }

    #[test]
    fn malformed_values_are_not_broken() {
        let fields = vec![FieldId::from("author")];
        let batch = batch(
            vec![
                Entry::new("e1").with_field("author", json!("x1")),
                Entry::new("e2").with_field("author", json!({ "id": "x1" })),
                Entry::new("e3").with_field("author", json!(null)),
            ],
            vec![LinkResolutionError::link("x1")],
        );
        assert!(classify_batch(&batch, &fields).is_empty());
    }

    #[test]
    fn broken_entries_deduplicate_in_first_seen_order() {
        let mut broken = BrokenEntries::new();
        assert_eq!(
            broken.extend(vec![Entry::new("e1"), Entry::new("e2")]),
            2
        );
        let updated = Entry::new("e1").with_field("title", json!("Renamed"));
        assert_eq!(broken.extend(vec![updated, Entry::new("e3")]), 1);

        assert_eq!(broken.len(), 3);
        assert!(broken.contains(&EntryId::from("e2")));
        let entries = broken.into_vec();
        assert_eq!(ids(&entries), vec!["e1", "e2", "e3"]);
        assert_eq!(entries[0].fields["title"], json!("Renamed"));
    }
}
