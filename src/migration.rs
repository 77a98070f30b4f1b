//! One-off collection maintenance: id normalization and copies.
//!
//! Every multi-document change goes through the [`BulkWriter`], so a rename
//! lands as a delete and a set in the same commit.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{info, warn};

use crate::bulk::{BulkWriter, CommitSummary, Mutation};
use crate::error::{Error, Result};
use crate::slug::clean_document_id;
use crate::store::{DocumentPath, DocumentStore, Query};

pub struct Migrator {
    store: Arc<dyn DocumentStore>,
    writer: BulkWriter,
}

impl Migrator {
    pub fn new(store: Arc<dyn DocumentStore>, writer: BulkWriter) -> Self {
        Self { store, writer }
    }

    /// Moves every document of `collection` whose id is not in clean form
    /// to its cleaned id.
    ///
    /// Documents whose cleaned id is empty or already taken are left where
    /// they are.
    #[tracing::instrument(skip(self))]
    pub async fn normalize_document_ids(&self, collection: &str) -> Result<CommitSummary> {
        let documents = self.store.query(collection, &Query::new()).await?;
        let mut taken: HashSet<String> = documents.iter().map(|doc| doc.id.clone()).collect();

        let mut mutations = Vec::new();
        for doc in documents {
            let clean = clean_document_id(&doc.id);
            if clean == doc.id {
                continue;
            }
            if clean.is_empty() {
                warn!(id = %doc.id, "Id has nothing left after cleaning, leaving it");
                continue;
            }
            if !taken.insert(clean.clone()) {
                warn!(id = %doc.id, target = %clean, "Cleaned id already taken, leaving it");
                continue;
            }
            mutations.push(Mutation::Rename {
                from: DocumentPath::new(collection, &doc.id),
                to: DocumentPath::new(collection, &clean),
                data: doc.data,
            });
        }

        info!(renames = mutations.len(), "Normalizing document ids");
        self.writer.commit_all(mutations).await
    }

    /// Copies every document of `from` into `to` under the same id,
    /// replacing what is there.
    #[tracing::instrument(skip(self))]
    pub async fn copy_collection(&self, from: &str, to: &str) -> Result<CommitSummary> {
        let mutations: Vec<Mutation> = self
            .store
            .query(from, &Query::new())
            .await?
            .into_iter()
            .map(|doc| Mutation::Upsert {
                path: DocumentPath::new(to, &doc.id),
                data: doc.data,
            })
            .collect();

        info!(documents = mutations.len(), "Copying collection");
        self.writer.commit_all(mutations).await
    }

    /// Copies one document to a new id in the same collection. Refuses to
    /// overwrite an existing document.
    #[tracing::instrument(skip(self))]
    pub async fn copy_document(&self, collection: &str, from: &str, to: &str) -> Result<()> {
        let source = DocumentPath::new(collection, from);
        let target = DocumentPath::new(collection, to);

        let data = self
            .store
            .get(&source)
            .await?
            .ok_or_else(|| Error::Migration(format!("{source} does not exist")))?;
        if self.store.get(&target).await?.is_some() {
            return Err(Error::Migration(format!("{target} already exists")));
        }

        self.store.set(&target, data).await?;
        info!(%source, %target, "Copied document");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{COST_OF_LIVING, MemoryStore};
    use serde_json::json;

    fn migrator(store: Arc<MemoryStore>) -> Migrator {
        Migrator::new(store.clone(), BulkWriter::new(store))
    }

    async fn seed(store: &MemoryStore, collection: &str, id: &str) {
        store
            .set(&DocumentPath::new(collection, id), json!({ "source": id }))
            .await
            .unwrap();
    }

    async fn ids(store: &MemoryStore, collection: &str) -> Vec<String> {
        store
            .query(collection, &Query::new())
            .await
            .unwrap()
            .into_iter()
            .map(|doc| doc.id)
            .collect()
    }

    #[tokio::test]
    async fn test_normalize_renames_unclean_ids() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, COST_OF_LIVING, "São-Paulo--Brazil").await;
        seed(&store, COST_OF_LIVING, "lima-peru").await;

        let summary = migrator(store.clone())
            .normalize_document_ids(COST_OF_LIVING)
            .await
            .unwrap();

        assert_eq!(summary.committed, 1);
        assert_eq!(ids(&store, COST_OF_LIVING).await, vec!["lima-peru", "sao-paulo-brazil"]);
        let moved = store
            .get(&DocumentPath::new(COST_OF_LIVING, "sao-paulo-brazil"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(moved["source"], json!("São-Paulo--Brazil"));
    }

    #[tokio::test]
    async fn test_normalize_skips_taken_targets() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, COST_OF_LIVING, "Lima-Peru").await;
        seed(&store, COST_OF_LIVING, "lima-peru").await;
        seed(&store, COST_OF_LIVING, "!!!").await;

        let summary = migrator(store.clone())
            .normalize_document_ids(COST_OF_LIVING)
            .await
            .unwrap();

        assert_eq!(summary.committed, 0);
        assert_eq!(store.len(COST_OF_LIVING), 3);
    }

    #[tokio::test]
    async fn test_copy_collection() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, "cost-of-travel-staging", "lima-peru").await;
        seed(&store, "cost-of-travel-staging", "quito-ecuador").await;

        let summary = migrator(store.clone())
            .copy_collection("cost-of-travel-staging", COST_OF_LIVING)
            .await
            .unwrap();

        assert_eq!(summary.committed, 2);
        assert_eq!(ids(&store, COST_OF_LIVING).await, vec!["lima-peru", "quito-ecuador"]);
        assert_eq!(store.len("cost-of-travel-staging"), 2);
    }

    #[tokio::test]
    async fn test_copy_document_refuses_existing_target() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, COST_OF_LIVING, "lima-peru").await;
        seed(&store, COST_OF_LIVING, "cusco-peru").await;
        let migrator = migrator(store.clone());

        let err = migrator
            .copy_document(COST_OF_LIVING, "lima-peru", "cusco-peru")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Migration(_)));

        migrator
            .copy_document(COST_OF_LIVING, "lima-peru", "lima-province-peru")
            .await
            .unwrap();
        let copy = store
            .get(&DocumentPath::new(COST_OF_LIVING, "lima-province-peru"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(copy["source"], json!("lima-peru"));
    }

    #[tokio::test]
    async fn test_copy_document_missing_source() {
        let store = Arc::new(MemoryStore::new());
        let err = migrator(store)
            .copy_document(COST_OF_LIVING, "nowhere", "somewhere")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }
}
