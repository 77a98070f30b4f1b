use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use super::{Document, DocumentPath, DocumentStore, Query, Write};
use crate::error::StoreError;

type Collections = BTreeMap<String, BTreeMap<String, Value>>;

/// In-process store. Commits apply under one lock, so they are atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: Mutex<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently held in `collection`.
    pub fn len(&self, collection: &str) -> usize {
        self.lock()
            .map(|c| c.get(collection).map_or(0, BTreeMap::len))
            .unwrap_or(0)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Collections>, StoreError> {
        self.collections
            .lock()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, path: &DocumentPath) -> Result<Option<Value>, StoreError> {
        let collections = self.lock()?;
        Ok(collections
            .get(&path.collection)
            .and_then(|docs| docs.get(&path.id))
            .cloned())
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StoreError> {
        let documents = {
            let collections = self.lock()?;
            collections
                .get(collection)
                .map(|docs| {
                    docs.iter()
                        .map(|(id, data)| Document {
                            id: id.clone(),
                            data: data.clone(),
                        })
                        .collect()
                })
                .unwrap_or_default()
        };
        Ok(query.apply(documents))
    }

    async fn commit(&self, writes: &[Write]) -> Result<(), StoreError> {
        let mut collections = self.lock()?;
        for write in writes {
            match write {
                Write::Set { path, data } => {
                    collections
                        .entry(path.collection.clone())
                        .or_default()
                        .insert(path.id.clone(), data.clone());
                }
                Write::Delete { path } => {
                    if let Some(docs) = collections.get_mut(&path.collection) {
                        docs.remove(&path.id);
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_set_then_get() {
        let store = MemoryStore::new();
        let path = DocumentPath::new("city-safety", "lima-peru");
        store.set(&path, json!({"score": 61})).await.unwrap();

        assert_eq!(store.get(&path).await.unwrap(), Some(json!({"score": 61})));
        assert_eq!(store.len("city-safety"), 1);
    }

    #[tokio::test]
    async fn test_missing_document_is_none() {
        let store = MemoryStore::new();
        let path = DocumentPath::new("city-safety", "nowhere");
        assert_eq!(store.get(&path).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_commit_applies_delete_then_set() {
        let store = MemoryStore::new();
        let old = DocumentPath::new("cost-of-living", "Malmö-Sweden");
        let new = DocumentPath::new("cost-of-living", "malmo-sweden");
        store.set(&old, json!({"city": "Malmö"})).await.unwrap();

        store
            .commit(&[
                Write::Delete { path: old.clone() },
                Write::Set {
                    path: new.clone(),
                    data: json!({"city": "Malmö"}),
                },
            ])
            .await
            .unwrap();

        assert_eq!(store.get(&old).await.unwrap(), None);
        assert!(store.get(&new).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_query_returns_id_order() {
        let store = MemoryStore::new();
        for id in ["c", "a", "b"] {
            store
                .set(&DocumentPath::new("top-destinations", id), json!({"id": id}))
                .await
                .unwrap();
        }

        let docs = store.query("top-destinations", &Query::new()).await.unwrap();
        let ids: Vec<_> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}
