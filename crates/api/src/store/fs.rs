//! Filesystem-backed record store: one JSON file per record.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::{RecordStore, StoreError, check_id};

/// A record store keeping each document at
/// `<base>/<collection>/<id>.json`.
///
/// Create uses `create_new` so two concurrent creates of the same id cannot
/// both succeed. Updates truncate in place; a crash mid-write can leave a
/// torn document, which surfaces later as a codec error on read.
#[derive(Debug, Clone)]
pub struct FsStore {
    base: PathBuf,
}

impl FsStore {
    /// Open a store rooted at `base`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the base directory cannot be created.
    pub async fn open(base: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let base = base.into();
        fs::create_dir_all(&base).await?;
        Ok(Self { base })
    }

    fn record_path(&self, collection: &str, id: &str) -> Result<PathBuf, StoreError> {
        check_id(collection)?;
        check_id(id)?;
        Ok(self.base.join(collection).join(format!("{id}.json")))
    }

    async fn write_doc(path: &Path, doc: &Value, create_new: bool) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(doc)?;
        let mut options = fs::OpenOptions::new();
        options.write(true);
        if create_new {
            options.create_new(true);
        } else {
            options.truncate(true);
        }
        let mut file = options.open(path).await.map_err(|e| match e.kind() {
            ErrorKind::AlreadyExists => StoreError::AlreadyExists,
            ErrorKind::NotFound => StoreError::NotFound,
            _ => StoreError::Io(e),
        })?;
        file.write_all(&bytes).await?;
        file.flush().await?;
        Ok(())
    }
}

impl RecordStore for FsStore {
    async fn create(&self, collection: &str, id: &str, doc: &Value) -> Result<(), StoreError> {
        let path = self.record_path(collection, id)?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).await?;
        }
        Self::write_doc(&path, doc, true).await
    }

    async fn read(&self, collection: &str, id: &str) -> Result<Value, StoreError> {
        let path = self.record_path(collection, id)?;
        let bytes = fs::read(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => StoreError::NotFound,
            _ => StoreError::Io(e),
        })?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn update(&self, collection: &str, id: &str, doc: &Value) -> Result<(), StoreError> {
        let path = self.record_path(collection, id)?;
        Self::write_doc(&path, doc, false).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let path = self.record_path(collection, id)?;
        fs::remove_file(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => StoreError::NotFound,
            _ => StoreError::Io(e),
        })
    }

    async fn list(&self, collection: &str) -> Result<Vec<String>, StoreError> {
        check_id(collection)?;
        let dir = self.base.join(collection);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            // A collection nobody has written to yet is just empty.
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::Io(e)),
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Some(id) = name.strip_suffix(".json") {
                ids.push(id.to_owned());
            }
        }
        Ok(ids)
    }
}
