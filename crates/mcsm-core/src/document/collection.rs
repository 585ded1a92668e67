//! Documents holding an ordered list of records.

use super::{AcceptAll, AllOf, Codec, Document, JsonCodec, UniqueKeys, Validator};
use crate::Result;
use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};

/// A [`Document`] whose value is a record list.
///
/// Every write re-checks the declared unique keys over the whole list, so a
/// duplicate is rejected before anything reaches the disk. The
/// read-modify-write helpers (`update`, `add`, `remove`) are not atomic with
/// respect to another writer on the same path.
pub struct CollectionDocument<T> {
    document: Document<Vec<T>>,
    unique_keys: Vec<String>,
}

impl<T> CollectionDocument<T>
where
    T: Clone + Serialize + Send + Sync + 'static,
{
    /// A collection with a custom codec and unique keys.
    pub fn new<K: Into<String>>(
        path: impl Into<PathBuf>,
        codec: impl Codec<Vec<T>> + 'static,
        unique_keys: impl IntoIterator<Item = K>,
    ) -> Self {
        Self::with_validator(path, codec, unique_keys, AcceptAll)
    }

    /// A collection with an additional whole-list validator, run after the
    /// uniqueness check.
    pub fn with_validator<K: Into<String>>(
        path: impl Into<PathBuf>,
        codec: impl Codec<Vec<T>> + 'static,
        unique_keys: impl IntoIterator<Item = K>,
        validator: impl Validator<Vec<T>> + 'static,
    ) -> Self {
        let path = path.into();
        let collection_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let unique = UniqueKeys::new(collection_name, unique_keys);
        let unique_keys = unique.keys().to_vec();
        let validator = AllOf::new().with(unique).with(validator);

        Self {
            document: Document::validated(path, codec, validator),
            unique_keys,
        }
    }

    /// Value returned by `read` when the file does not exist.
    pub fn with_fallback(mut self, fallback: impl Fn() -> Vec<T> + Send + Sync + 'static) -> Self {
        self.document = self.document.with_fallback(fallback);
        self
    }

    /// An empty list when the file does not exist.
    pub fn empty_when_missing(self) -> Self {
        self.with_fallback(Vec::new)
    }

    pub fn read_only(mut self) -> Self {
        self.document = self.document.read_only();
        self
    }

    pub fn document(&self) -> &Document<Vec<T>> {
        &self.document
    }

    pub fn path(&self) -> &Path {
        self.document.path()
    }

    pub fn unique_keys(&self) -> &[String] {
        &self.unique_keys
    }

    pub async fn read(&self) -> Result<Vec<T>> {
        self.document.read().await
    }

    pub async fn reload(&self) -> Result<Vec<T>> {
        self.document.reload().await
    }

    pub async fn write(&self, collection: Vec<T>) -> Result<()> {
        self.document.write(collection).await
    }

    pub async fn delete(&self) -> Result<()> {
        self.document.delete().await
    }

    /// First record matching `predicate`.
    pub async fn find(&self, predicate: impl Fn(&T) -> bool) -> Result<Option<T>> {
        let collection = self.read().await?;
        Ok(collection.into_iter().find(|item| predicate(item)))
    }

    /// Every record matching `predicate`, in order.
    pub async fn filter(&self, predicate: impl Fn(&T) -> bool) -> Result<Vec<T>> {
        let collection = self.read().await?;
        Ok(collection.into_iter().filter(|item| predicate(item)).collect())
    }

    /// Replace the collection with `updater(current)`, re-validated.
    pub async fn update(&self, updater: impl FnOnce(Vec<T>) -> Vec<T>) -> Result<()> {
        let collection = self.read().await?;
        self.write(updater(collection)).await
    }

    /// Apply `updater` to each record matching `predicate`.
    ///
    /// Returns how many records were updated.
    pub async fn update_item(
        &self,
        predicate: impl Fn(&T) -> bool,
        mut updater: impl FnMut(T) -> T,
    ) -> Result<usize> {
        let mut updated = 0;
        self.update(|collection| {
            collection
                .into_iter()
                .map(|item| {
                    if predicate(&item) {
                        updated += 1;
                        updater(item)
                    } else {
                        item
                    }
                })
                .collect()
        })
        .await?;
        Ok(updated)
    }

    /// Append records and write the whole collection.
    pub async fn add(&self, records: impl IntoIterator<Item = T>) -> Result<()> {
        let records: Vec<T> = records.into_iter().collect();
        self.update(move |mut collection| {
            collection.extend(records);
            collection
        })
        .await
    }

    /// Drop every record matching `predicate`.
    ///
    /// Returns how many records were removed.
    pub async fn remove(&self, predicate: impl Fn(&T) -> bool) -> Result<usize> {
        let mut removed = 0;
        self.update(|collection| {
            let before = collection.len();
            let kept: Vec<T> = collection.into_iter().filter(|item| !predicate(item)).collect();
            removed = before - kept.len();
            kept
        })
        .await?;
        Ok(removed)
    }
}

impl<T> CollectionDocument<T>
where
    T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// A JSON array file.
    pub fn json<K: Into<String>>(
        path: impl Into<PathBuf>,
        unique_keys: impl IntoIterator<Item = K>,
    ) -> Self {
        Self::new(path, JsonCodec::new(), unique_keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::McsmError;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Entry {
        uuid: String,
        name: String,
        level: u8,
    }

    fn entry(uuid: &str, name: &str) -> Entry {
        Entry {
            uuid: uuid.into(),
            name: name.into(),
            level: 4,
        }
    }

    fn collection(temp_dir: &TempDir) -> CollectionDocument<Entry> {
        CollectionDocument::json(temp_dir.path().join("ops.json"), ["uuid", "name"])
    }

    #[tokio::test]
    async fn test_duplicate_rejected_before_disk_write() {
        let temp_dir = TempDir::new().unwrap();
        let ops = collection(&temp_dir);

        let err = ops
            .write(vec![entry("1", "alice"), entry("1", "bob")])
            .await
            .unwrap_err();
        match err {
            McsmError::Duplicate { key, value, collection } => {
                assert_eq!(key, "uuid");
                assert_eq!(value, "1");
                assert_eq!(collection, "ops.json");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!ops.path().exists());
    }

    #[tokio::test]
    async fn test_add_then_remove_restores_collection() {
        let temp_dir = TempDir::new().unwrap();
        let ops = collection(&temp_dir);
        ops.write(vec![entry("1", "alice")]).await.unwrap();
        let before = ops.read().await.unwrap();

        ops.add([entry("2", "bob")]).await.unwrap();
        assert_eq!(ops.read().await.unwrap().len(), 2);

        let removed = ops.remove(|e| e.uuid == "2").await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(ops.read().await.unwrap(), before);
        assert_eq!(ops.reload().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_add_duplicate_leaves_collection_unchanged() {
        let temp_dir = TempDir::new().unwrap();
        let ops = collection(&temp_dir);
        ops.write(vec![entry("1", "alice")]).await.unwrap();

        let err = ops.add([entry("2", "alice")]).await.unwrap_err();
        assert!(matches!(err, McsmError::Duplicate { .. }));
        assert_eq!(ops.read().await.unwrap(), vec![entry("1", "alice")]);
    }

    #[tokio::test]
    async fn test_find_and_filter() {
        let temp_dir = TempDir::new().unwrap();
        let ops = collection(&temp_dir);
        ops.write(vec![entry("1", "alice"), entry("2", "bob"), entry("3", "carol")])
            .await
            .unwrap();

        assert_eq!(ops.find(|e| e.name == "bob").await.unwrap(), Some(entry("2", "bob")));
        assert_eq!(ops.find(|e| e.name == "dave").await.unwrap(), None);
        let filtered = ops.filter(|e| e.uuid != "2").await.unwrap();
        assert_eq!(filtered.len(), 2);
    }

    #[tokio::test]
    async fn test_update_item_touches_only_matches() {
        let temp_dir = TempDir::new().unwrap();
        let ops = collection(&temp_dir);
        ops.write(vec![entry("1", "alice"), entry("2", "bob")]).await.unwrap();

        let updated = ops
            .update_item(|e| e.uuid == "2", |mut e| {
                e.level = 1;
                e
            })
            .await
            .unwrap();
        assert_eq!(updated, 1);
        let all = ops.reload().await.unwrap();
        assert_eq!(all[0].level, 4);
        assert_eq!(all[1].level, 1);
    }

    #[tokio::test]
    async fn test_missing_file_not_found_vs_empty_fallback() {
        let temp_dir = TempDir::new().unwrap();
        let ops = collection(&temp_dir);
        assert!(ops.read().await.unwrap_err().is_not_found());

        let mods: CollectionDocument<Entry> =
            CollectionDocument::json(temp_dir.path().join("mods.json"), ["uuid"])
                .empty_when_missing();
        assert!(mods.read().await.unwrap().is_empty());
        // An empty list is a valid collection.
        mods.write(Vec::new()).await.unwrap();
        assert!(mods.path().exists());
    }
}
