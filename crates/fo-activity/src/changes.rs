//! Field-level change sets
//!
//! Records are compared through their serialised JSON form, so the diff uses
//! the same camelCase names the API exposes.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{json, Map, Value};

/// Bookkeeping fields that change on every write
const IGNORED_FIELDS: &[&str] = &["updatedAt", "updatedById", "lockVersion"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldChange {
    pub from: Value,
    pub to: Value,
}

/// `{field: {from, to}}`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ChangeSet {
    changes: BTreeMap<String, FieldChange>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare two snapshots of the same record
    pub fn diff<T: Serialize>(before: &T, after: &T) -> Self {
        let before = to_object(before);
        let after = to_object(after);
        let mut set = Self::new();

        for (key, new_value) in &after {
            let old_value = before.get(key).unwrap_or(&Value::Null);
            if old_value != new_value {
                set.add(key.clone(), old_value.clone(), new_value.clone());
            }
        }
        for (key, old_value) in &before {
            if !after.contains_key(key) && !old_value.is_null() {
                set.add(key.clone(), old_value.clone(), Value::Null);
            }
        }

        set
    }

    pub fn add(&mut self, field: impl Into<String>, from: Value, to: Value) {
        let field = field.into();
        if IGNORED_FIELDS.contains(&field.as_str()) {
            return;
        }
        self.changes.insert(field, FieldChange { from, to });
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn get(&self, field: &str) -> Option<&FieldChange> {
        self.changes.get(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.changes.keys().map(String::as_str)
    }

    pub fn to_value(&self) -> Value {
        let map: Map<String, Value> = self
            .changes
            .iter()
            .map(|(field, change)| (field.clone(), json!({ "from": change.from, "to": change.to })))
            .collect();
        Value::Object(map)
    }

    /// `None` when nothing changed
    pub fn into_value(self) -> Option<Value> {
        if self.is_empty() {
            None
        } else {
            Some(self.to_value())
        }
    }
}

fn to_object<T: Serialize>(value: &T) -> Map<String, Value> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            let mut map = Map::new();
            map.insert("value".to_string(), other);
            map
        }
        Err(e) => {
            tracing::warn!(error = %e, "Could not serialise record for diff");
            Map::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct Snapshot {
        title: String,
        status: &'static str,
        completion_percentage: i32,
        lock_version: i32,
        updated_at: &'static str,
        #[serde(skip_serializing_if = "Option::is_none")]
        location: Option<String>,
    }

    fn snapshot() -> Snapshot {
        Snapshot {
            title: "Fix leak".into(),
            status: "open",
            completion_percentage: 0,
            lock_version: 1,
            updated_at: "2024-01-01T00:00:00Z",
            location: Some("Basement".into()),
        }
    }

    #[test]
    fn test_diff_reports_changed_fields() {
        let before = snapshot();
        let mut after = snapshot();
        after.status = "in_progress";
        after.completion_percentage = 40;
        after.lock_version = 2;
        after.updated_at = "2024-01-02T00:00:00Z";

        let changes = ChangeSet::diff(&before, &after);
        assert_eq!(changes.len(), 2);
        assert_eq!(
            changes.get("status"),
            Some(&FieldChange {
                from: json!("open"),
                to: json!("in_progress")
            })
        );
        assert!(changes.get("lockVersion").is_none());
        assert!(changes.get("updatedAt").is_none());
    }

    #[test]
    fn test_removed_field_becomes_null() {
        let before = snapshot();
        let mut after = snapshot();
        after.location = None;

        let changes = ChangeSet::diff(&before, &after);
        let value = changes.into_value().unwrap();
        assert_eq!(value["location"]["from"], "Basement");
        assert!(value["location"]["to"].is_null());
    }

    #[test]
    fn test_identical_snapshots() {
        let changes = ChangeSet::diff(&snapshot(), &snapshot());
        assert!(changes.is_empty());
        assert!(changes.into_value().is_none());
    }
}
