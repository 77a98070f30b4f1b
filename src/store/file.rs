use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use super::{Document, DocumentPath, DocumentStore, Query, Write};
use crate::error::StoreError;

/// Stores each document as `<root>/<collection>/<id>.json`.
///
/// A commit first resolves every target and stages every set into a
/// temporary file next to it, then applies deletes and renames in order.
/// A failure while staging leaves the store untouched. An I/O failure while
/// applying is not rolled back: earlier writes of the commit stay applied
/// and the remaining staged files are removed.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn collection_dir(&self, collection: &str) -> Result<PathBuf, StoreError> {
        if !is_safe_segment(collection) {
            return Err(StoreError::InvalidPath(collection.to_string()));
        }
        Ok(self.root.join(collection))
    }

    fn file_for(&self, path: &DocumentPath) -> Result<PathBuf, StoreError> {
        if !is_safe_segment(&path.id) {
            return Err(StoreError::InvalidPath(path.to_string()));
        }
        Ok(self
            .collection_dir(&path.collection)?
            .join(format!("{}.json", path.id)))
    }

    async fn read_document(
        &self,
        file: &Path,
        path: &DocumentPath,
    ) -> Result<Option<Value>, StoreError> {
        match tokio::fs::read_to_string(file).await {
            Ok(content) => serde_json::from_str(&content)
                .map(Some)
                .map_err(|source| StoreError::Decode {
                    path: path.to_string(),
                    source,
                }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn stage(&self, writes: &[Write]) -> Result<Vec<Staged>, StoreError> {
        let mut staged = Vec::with_capacity(writes.len());
        for (n, write) in writes.iter().enumerate() {
            let target = self.file_for(write.path())?;
            let Write::Set { path, data } = write else {
                staged.push(Staged { target, tmp: None });
                continue;
            };
            let tmp = target.with_extension(format!("json.tmp-{n}"));
            let body = serde_json::to_vec_pretty(data).map_err(|source| StoreError::Encode {
                path: path.to_string(),
                source,
            })?;
            if let Some(dir) = tmp.parent() {
                tokio::fs::create_dir_all(dir).await?;
            }
            tokio::fs::write(&tmp, body).await?;
            staged.push(Staged {
                target,
                tmp: Some(tmp),
            });
        }
        Ok(staged)
    }

    async fn discard_staged(&self, writes: &[Write]) {
        for (n, write) in writes.iter().enumerate() {
            if let Ok(target) = self.file_for(write.path()) {
                remove_staged(&target.with_extension(format!("json.tmp-{n}"))).await;
            }
        }
    }
}

/// Resolved target of one write, with its temporary file for sets.
struct Staged {
    target: PathBuf,
    tmp: Option<PathBuf>,
}

async fn apply(staged: &Staged) -> Result<(), StoreError> {
    match &staged.tmp {
        Some(tmp) => tokio::fs::rename(tmp, &staged.target).await?,
        None => match tokio::fs::remove_file(&staged.target).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        },
    }
    Ok(())
}

async fn remove_staged(tmp: &Path) {
    if let Err(e) = tokio::fs::remove_file(tmp).await {
        if e.kind() != ErrorKind::NotFound {
            warn!(file = %tmp.display(), error = %e, "Failed to discard staged document");
        }
    }
}

#[async_trait]
impl DocumentStore for FileStore {
    async fn get(&self, path: &DocumentPath) -> Result<Option<Value>, StoreError> {
        let file = self.file_for(path)?;
        self.read_document(&file, path).await
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StoreError> {
        let dir = self.collection_dir(collection)?;
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let file = entry.path();
            if file.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(id) = file.file_stem().and_then(|s| s.to_str()) {
                ids.push(id.to_string());
            }
        }
        ids.sort();

        let mut documents = Vec::with_capacity(ids.len());
        for id in ids {
            let path = DocumentPath::new(collection, &id);
            if let Some(data) = self.read_document(&self.file_for(&path)?, &path).await? {
                documents.push(Document { id, data });
            }
        }

        debug!(collection, scanned = documents.len(), "File store query");
        Ok(query.apply(documents))
    }

    async fn commit(&self, writes: &[Write]) -> Result<(), StoreError> {
        let staged = match self.stage(writes).await {
            Ok(staged) => staged,
            Err(e) => {
                self.discard_staged(writes).await;
                return Err(e);
            }
        };

        for (n, write) in staged.iter().enumerate() {
            if let Err(e) = apply(write).await {
                warn!(applied = n, total = staged.len(), error = %e, "File store commit failed part way");
                for rest in &staged[n..] {
                    if let Some(tmp) = &rest.tmp {
                        remove_staged(tmp).await;
                    }
                }
                return Err(e);
            }
        }

        Ok(())
    }
}

fn is_safe_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment.contains(['/', '\\'])
}
