//! Grouped, retried document commits.
//!
//! Mutations are split into groups of at most `group_size` writes. Each
//! group is one atomic store commit, retried with linear backoff. Groups
//! run strictly in order; a group that exhausts its retries stops the run,
//! and groups committed before it stay committed.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{Error, Result, StoreError};
use crate::store::{DocumentPath, DocumentStore, Write};

/// Largest atomic commit the store accepts.
pub const DEFAULT_GROUP_SIZE: usize = 500;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BACKOFF_UNIT: Duration = Duration::from_secs(1);

/// A document-level change.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Replace the whole document at `path`.
    Upsert { path: DocumentPath, data: Value },
    /// Move a document to a new id. The delete and the set always land in
    /// the same commit.
    Rename {
        from: DocumentPath,
        to: DocumentPath,
        data: Value,
    },
}

impl Mutation {
    fn into_writes(self) -> Vec<Write> {
        match self {
            Mutation::Upsert { path, data } => vec![Write::Set { path, data }],
            Mutation::Rename { from, to, data } => vec![
                Write::Delete { path: from },
                Write::Set { path: to, data },
            ],
        }
    }

    fn write_count(&self) -> usize {
        match self {
            Mutation::Upsert { .. } => 1,
            Mutation::Rename { .. } => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitSummary {
    /// Mutations committed.
    pub committed: usize,
    /// Store commits issued, one per group.
    pub groups: usize,
}

#[derive(Debug, Default)]
struct Group {
    writes: Vec<Write>,
    mutations: usize,
}

pub struct BulkWriter {
    store: Arc<dyn DocumentStore>,
    group_size: usize,
    max_attempts: u32,
    backoff_unit: Duration,
}

impl BulkWriter {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            group_size: DEFAULT_GROUP_SIZE,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_unit: DEFAULT_BACKOFF_UNIT,
        }
    }

    pub fn with_group_size(mut self, group_size: usize) -> Self {
        self.group_size = group_size.max(1);
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_backoff_unit(mut self, backoff_unit: Duration) -> Self {
        self.backoff_unit = backoff_unit;
        self
    }

    /// Commits every mutation, group by group.
    ///
    /// Returns [`Error::RetryExhausted`] with the number of mutations
    /// committed so far and the number left unwritten.
    #[tracing::instrument(skip_all, fields(mutations = mutations.len()))]
    pub async fn commit_all(&self, mutations: Vec<Mutation>) -> Result<CommitSummary> {
        let total = mutations.len();
        let groups = partition(mutations, self.group_size);
        let group_count = groups.len();
        let mut summary = CommitSummary::default();

        for (index, group) in groups.into_iter().enumerate() {
            if let Err(source) = self.commit_group(&group.writes).await {
                return Err(Error::RetryExhausted {
                    attempts: self.max_attempts,
                    committed: summary.committed,
                    failed: total - summary.committed,
                    source,
                });
            }
            summary.committed += group.mutations;
            summary.groups += 1;
            debug!(
                group = index + 1,
                of = group_count,
                writes = group.writes.len(),
                "Committed group"
            );
        }

        if total > 0 {
            info!(committed = summary.committed, groups = summary.groups, "Bulk commit finished");
        }
        Ok(summary)
    }

    async fn commit_group(&self, writes: &[Write]) -> std::result::Result<(), StoreError> {
        let mut attempt = 1;
        loop {
            match self.store.commit(writes).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt >= self.max_attempts => {
                    warn!(attempt, max_attempts = self.max_attempts, error = %e, "Giving up on group");
                    return Err(e);
                }
                Err(e) => {
                    let delay = self.backoff_unit * attempt;
                    warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Group commit failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

// A mutation never straddles two groups; one larger than the limit gets
// a group of its own.
fn partition(mutations: Vec<Mutation>, group_size: usize) -> Vec<Group> {
    let mut groups = Vec::new();
    let mut current = Group::default();

    for mutation in mutations {
        if !current.writes.is_empty() && current.writes.len() + mutation.write_count() > group_size {
            groups.push(std::mem::take(&mut current));
        }
        current.mutations += 1;
        current.writes.extend(mutation.into_writes());
    }
    if !current.writes.is_empty() {
        groups.push(current);
    }

    groups
}
