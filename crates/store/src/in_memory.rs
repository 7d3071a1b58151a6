use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use std::sync::RwLock;

use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::document::{DocumentStore, ExpectedRevision, StoreError, revision_of};

/// In-memory document store.
///
/// Intended for tests/dev. Documents within a collection are keyed by uuid-v7
/// id, so iteration (and therefore `query_by_field` output) follows creation
/// order.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    collections: RwLock<HashMap<String, BTreeMap<Uuid, JsonValue>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> StoreError {
        StoreError::Backend("lock poisoned".to_string())
    }
}

impl DocumentStore for InMemoryStore {
    fn create(&self, collection: &str, record: JsonValue) -> Result<Uuid, StoreError> {
        let mut doc = match record {
            JsonValue::Object(map) => map,
            other => {
                return Err(StoreError::Serialization(format!(
                    "document must be a JSON object, got {other}"
                )));
            }
        };

        // Keep a caller-supplied uuid id, otherwise assign one.
        let id = doc
            .get("id")
            .and_then(JsonValue::as_str)
            .and_then(|s| Uuid::from_str(s).ok())
            .unwrap_or_else(Uuid::now_v7);

        doc.insert("id".to_string(), JsonValue::String(id.to_string()));
        doc.insert("_rev".to_string(), JsonValue::from(1u64));

        let mut collections = self.collections.write().map_err(|_| Self::poisoned())?;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id, JsonValue::Object(doc));

        Ok(id)
    }

    fn get_by_id(&self, collection: &str, id: Uuid) -> Result<JsonValue, StoreError> {
        let collections = self.collections.read().map_err(|_| Self::poisoned())?;
        collections
            .get(collection)
            .and_then(|docs| docs.get(&id))
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                id,
            })
    }

    fn update_by_id(
        &self,
        collection: &str,
        id: Uuid,
        patch: JsonValue,
        expected: ExpectedRevision,
    ) -> Result<(), StoreError> {
        let patch = match patch {
            JsonValue::Object(map) => map,
            other => {
                return Err(StoreError::Serialization(format!(
                    "patch must be a JSON object, got {other}"
                )));
            }
        };

        let mut collections = self.collections.write().map_err(|_| Self::poisoned())?;
        let doc = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(&id))
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                id,
            })?;

        let current = revision_of(doc);
        if !expected.matches(current) {
            return Err(StoreError::Conflict(format!(
                "expected {expected:?}, found {current}"
            )));
        }

        let fields = doc
            .as_object_mut()
            .ok_or_else(|| StoreError::Backend("stored document is not an object".to_string()))?;

        // Shallow merge; id and revision are store-managed.
        for (key, value) in patch {
            if key == "id" || key == "_rev" {
                continue;
            }
            fields.insert(key, value);
        }
        fields.insert("_rev".to_string(), JsonValue::from(current + 1));

        Ok(())
    }

    fn delete_by_id(&self, collection: &str, id: Uuid) -> Result<(), StoreError> {
        let mut collections = self.collections.write().map_err(|_| Self::poisoned())?;
        let removed = collections
            .get_mut(collection)
            .and_then(|docs| docs.remove(&id));

        match removed {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound {
                collection: collection.to_string(),
                id,
            }),
        }
    }

    fn query_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &JsonValue,
    ) -> Result<Vec<JsonValue>, StoreError> {
        let collections = self.collections.read().map_err(|_| Self::poisoned())?;
        let Some(docs) = collections.get(collection) else {
            return Ok(vec![]);
        };

        Ok(docs
            .values()
            .filter(|doc| doc.get(field) == Some(value))
            .cloned()
            .collect())
    }
}
