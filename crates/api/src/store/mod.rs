//! Record storage: a namespaced key -> JSON-document store.
//!
//! Every entity lives in one of four collections (`users`, `tokens`,
//! `carts`, `orders`) as a single JSON document. The store guarantees
//! atomicity per record only; there are no cross-record transactions, and
//! every multi-record operation in the services layer is a sequence of
//! independently-committed writes.

mod fs;
mod memory;

pub use fs::FsStore;
pub use memory::MemStore;

use serde_json::Value;

/// Errors returned by a [`RecordStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A create hit an existing record.
    #[error("record already exists")]
    AlreadyExists,

    /// The record is not present in the collection.
    #[error("record not found")]
    NotFound,

    /// The id would escape the collection namespace.
    #[error("invalid record id: {0}")]
    InvalidId(String),

    /// The backing medium failed.
    #[error("storage i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored document could not be encoded or decoded.
    #[error("storage codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Collection names used by the services layer.
pub mod collections {
    pub const USERS: &str = "users";
    pub const TOKENS: &str = "tokens";
    pub const CARTS: &str = "carts";
    pub const ORDERS: &str = "orders";
}

/// A namespaced key -> JSON-document store with atomic single-record
/// operations.
///
/// Implementations must serialize concurrent writes to the *same* record;
/// nothing is guaranteed across different records.
pub trait RecordStore: Send + Sync {
    /// Create a record. Fails with [`StoreError::AlreadyExists`] if a record
    /// with this id is present.
    fn create(
        &self,
        collection: &str,
        id: &str,
        doc: &Value,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Read a record. Fails with [`StoreError::NotFound`] if absent.
    fn read(
        &self,
        collection: &str,
        id: &str,
    ) -> impl Future<Output = Result<Value, StoreError>> + Send;

    /// Overwrite an existing record. Fails with [`StoreError::NotFound`] if
    /// absent.
    fn update(
        &self,
        collection: &str,
        id: &str,
        doc: &Value,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Delete a record. Fails with [`StoreError::NotFound`] if absent.
    fn delete(
        &self,
        collection: &str,
        id: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// List the ids in a collection, in no particular order.
    fn list(&self, collection: &str) -> impl Future<Output = Result<Vec<String>, StoreError>> + Send;
}

/// Reject ids that could escape the collection directory or collide with
/// the on-disk encoding.
pub(crate) fn check_id(id: &str) -> Result<(), StoreError> {
    if id.is_empty()
        || id.contains('/')
        || id.contains('\\')
        || id.contains("..")
        || id.contains('\0')
    {
        return Err(StoreError::InvalidId(id.to_owned()));
    }
    Ok(())
}
