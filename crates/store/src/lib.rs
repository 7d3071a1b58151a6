//! `tillpoint-store` — the generic persistence collaborator.
//!
//! The engine never talks to a concrete database client. It consumes a
//! [`DocumentStore`]: per-collection create / get-by-id / update-by-id /
//! query-by-field over plain JSON documents, with **no multi-document
//! transaction guarantee**. Cross-document consistency is the engine's
//! problem, not the store's.

pub mod document;
pub mod in_memory;

pub use document::{
    DocumentStore, DocumentStoreExt, ExpectedRevision, StoreError, collections, revision_of,
};
pub use in_memory::InMemoryStore;
