use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use tillpoint_core::EngineError;

/// Logical collection names used by the engine.
pub mod collections {
    pub const STOCK_ITEMS: &str = "stockItems";
    pub const STOCK_MOVEMENTS: &str = "stockMovements";
    pub const PURCHASE_ORDERS: &str = "purchaseOrders";
    pub const CUSTOMER_LOANS: &str = "customerLoans";
    pub const CUSTOMER_LOAN_PAYMENTS: &str = "customerLoanPayments";
}

/// Store operation error.
///
/// These are **infrastructure errors** (missing document, stale revision,
/// backend I/O) as opposed to business/domain failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document not found: {collection}/{id}")]
    NotFound { collection: String, id: Uuid },

    #[error("revision conflict: {0}")]
    Conflict(String),

    #[error("document (de)serialization failed: {0}")]
    Serialization(String),

    #[error("storage backend failure: {0}")]
    Backend(String),
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => EngineError::NotFound,
            StoreError::Conflict(msg) => EngineError::Conflict(msg),
            StoreError::Serialization(msg) | StoreError::Backend(msg) => {
                EngineError::Persistence(msg)
            }
        }
    }
}

/// Revision expectation for an update (optimistic concurrency).
///
/// Every stored document carries a store-stamped `_rev` counter: 1 on create,
/// incremented on each successful update. Passing `Exact` turns a lost update
/// into a visible [`StoreError::Conflict`] instead of silent corruption.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedRevision {
    /// Unconditional write (last writer wins).
    Any,
    /// Write only if the current revision matches.
    Exact(u64),
}

impl ExpectedRevision {
    pub fn matches(&self, current: u64) -> bool {
        match self {
            ExpectedRevision::Any => true,
            ExpectedRevision::Exact(expected) => *expected == current,
        }
    }
}

/// Read the store-stamped revision out of a raw document.
pub fn revision_of(doc: &JsonValue) -> u64 {
    doc.get("_rev").and_then(JsonValue::as_u64).unwrap_or(0)
}

/// Generic document persistence collaborator.
///
/// Semantics all implementations must provide:
/// - `create` stamps `_rev = 1` and returns the document id. If the record
///   already carries an `"id"` field holding a uuid, that id is kept;
///   otherwise the store assigns one.
/// - `update_by_id` applies a **shallow object merge** of `patch` onto the
///   stored document (the `id` and `_rev` fields cannot be patched), checks
///   `expected` against the current `_rev`, and bumps `_rev` on success.
/// - `query_by_field` returns every document whose top-level `field` equals
///   `value`. No ordering guarantee; callers sort.
/// - No operation spans more than one document.
pub trait DocumentStore: Send + Sync {
    fn create(&self, collection: &str, record: JsonValue) -> Result<Uuid, StoreError>;

    fn get_by_id(&self, collection: &str, id: Uuid) -> Result<JsonValue, StoreError>;

    fn update_by_id(
        &self,
        collection: &str,
        id: Uuid,
        patch: JsonValue,
        expected: ExpectedRevision,
    ) -> Result<(), StoreError>;

    fn delete_by_id(&self, collection: &str, id: Uuid) -> Result<(), StoreError>;

    fn query_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &JsonValue,
    ) -> Result<Vec<JsonValue>, StoreError>;
}

impl<S> DocumentStore for Arc<S>
where
    S: DocumentStore + ?Sized,
{
    fn create(&self, collection: &str, record: JsonValue) -> Result<Uuid, StoreError> {
        (**self).create(collection, record)
    }

    fn get_by_id(&self, collection: &str, id: Uuid) -> Result<JsonValue, StoreError> {
        (**self).get_by_id(collection, id)
    }

    fn update_by_id(
        &self,
        collection: &str,
        id: Uuid,
        patch: JsonValue,
        expected: ExpectedRevision,
    ) -> Result<(), StoreError> {
        (**self).update_by_id(collection, id, patch, expected)
    }

    fn delete_by_id(&self, collection: &str, id: Uuid) -> Result<(), StoreError> {
        (**self).delete_by_id(collection, id)
    }

    fn query_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &JsonValue,
    ) -> Result<Vec<JsonValue>, StoreError> {
        (**self).query_by_field(collection, field, value)
    }
}

/// Typed convenience layer over the raw JSON interface.
pub trait DocumentStoreExt: DocumentStore {
    /// Serialize and create a record, returning its id.
    fn insert<T: Serialize>(&self, collection: &str, record: &T) -> Result<Uuid, StoreError> {
        let value = serde_json::to_value(record)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.create(collection, value)
    }

    /// Fetch and deserialize one document.
    fn fetch<T: DeserializeOwned>(&self, collection: &str, id: Uuid) -> Result<T, StoreError> {
        let doc = self.get_by_id(collection, id)?;
        serde_json::from_value(doc).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Fetch one document along with its current revision.
    fn fetch_revisioned<T: DeserializeOwned>(
        &self,
        collection: &str,
        id: Uuid,
    ) -> Result<(T, u64), StoreError> {
        let doc = self.get_by_id(collection, id)?;
        let rev = revision_of(&doc);
        let record =
            serde_json::from_value(doc).map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok((record, rev))
    }

    /// Query by field and deserialize the matches.
    fn find<T: DeserializeOwned>(
        &self,
        collection: &str,
        field: &str,
        value: &JsonValue,
    ) -> Result<Vec<T>, StoreError> {
        self.query_by_field(collection, field, value)?
            .into_iter()
            .map(|doc| {
                serde_json::from_value(doc).map_err(|e| StoreError::Serialization(e.to_string()))
            })
            .collect()
    }

    /// Query by field, keeping each match's revision.
    fn find_revisioned<T: DeserializeOwned>(
        &self,
        collection: &str,
        field: &str,
        value: &JsonValue,
    ) -> Result<Vec<(T, u64)>, StoreError> {
        self.query_by_field(collection, field, value)?
            .into_iter()
            .map(|doc| {
                let rev = revision_of(&doc);
                serde_json::from_value(doc)
                    .map(|record| (record, rev))
                    .map_err(|e| StoreError::Serialization(e.to_string()))
            })
            .collect()
    }
}

impl<S: DocumentStore + ?Sized> DocumentStoreExt for S {}
