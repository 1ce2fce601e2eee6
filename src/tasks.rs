//! In-memory status map for background operations
//!
//! Entries are keyed by job ID. A state only ever moves from `processing` to
//! `completed` or `failed`; later transitions are ignored. Nothing survives a
//! restart.

use crate::error::{Error, Result};
use crate::types::{TaskEntry, TaskState};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Concurrent map of task entries
#[derive(Clone, Debug, Default)]
pub struct TaskStore {
    entries: Arc<RwLock<HashMap<String, TaskEntry>>>,
    retention: Option<Duration>,
}

impl TaskStore {
    /// Store keeping terminal entries for `retention`, or forever when `None`
    pub fn new(retention: Option<Duration>) -> Self {
        Self {
            entries: Arc::default(),
            retention,
        }
    }

    /// Record that an operation started for `task_id`.
    ///
    /// Fails with [`Error::Conflict`] while a previous operation for the same ID
    /// is still processing. A terminal entry is replaced.
    pub async fn start(&self, task_id: &str) -> Result<TaskEntry> {
        let mut entries = self.entries.write().await;
        self.prune_locked(&mut entries);

        if let Some(existing) = entries.get(task_id)
            && existing.status == TaskState::Processing
        {
            return Err(Error::Conflict(format!(
                "task {task_id} is already processing"
            )));
        }

        let entry = TaskEntry {
            task_id: task_id.to_string(),
            status: TaskState::Processing,
            result: None,
            error: None,
            created_at: Utc::now(),
            completed_at: None,
        };
        entries.insert(task_id.to_string(), entry.clone());
        Ok(entry)
    }

    /// Move a processing entry to `completed` with `result`
    ///
    /// Returns false if the entry is missing or already terminal.
    pub async fn complete(&self, task_id: &str, result: serde_json::Value) -> bool {
        self.finish(task_id, TaskState::Completed, Some(result), None)
            .await
    }

    /// Move a processing entry to `failed` with `error`
    ///
    /// Returns false if the entry is missing or already terminal.
    pub async fn fail(&self, task_id: &str, error: impl Into<String>) -> bool {
        self.finish(task_id, TaskState::Failed, None, Some(error.into()))
            .await
    }

    async fn finish(
        &self,
        task_id: &str,
        status: TaskState,
        result: Option<serde_json::Value>,
        error: Option<String>,
    ) -> bool {
        let mut entries = self.entries.write().await;
        match entries.get_mut(task_id) {
            Some(entry) if entry.status == TaskState::Processing => {
                entry.status = status;
                entry.result = result;
                entry.error = error;
                entry.completed_at = Some(Utc::now());
                true
            }
            Some(entry) => {
                tracing::warn!(
                    task_id = %task_id,
                    current = ?entry.status,
                    attempted = ?status,
                    "Ignoring transition of terminal task"
                );
                false
            }
            None => false,
        }
    }

    /// Current entry for `task_id`; terminal entries past retention are absent
    pub async fn get(&self, task_id: &str) -> Option<TaskEntry> {
        let cutoff = self.cutoff();
        self.entries
            .read()
            .await
            .get(task_id)
            .filter(|entry| !is_expired(entry, cutoff))
            .cloned()
    }

    /// Number of entries held
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the store is empty
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Entries still processing
    pub async fn processing_count(&self) -> usize {
        self.entries
            .read()
            .await
            .values()
            .filter(|entry| entry.status == TaskState::Processing)
            .count()
    }

    /// Drop terminal entries older than the retention period; returns how many went
    pub async fn prune_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        self.prune_locked(&mut entries)
    }

    /// Completion time at or before which a terminal entry has expired
    fn cutoff(&self) -> Option<DateTime<Utc>> {
        let retention = chrono::Duration::from_std(self.retention?).ok()?;
        Some(Utc::now() - retention)
    }

    fn prune_locked(&self, entries: &mut HashMap<String, TaskEntry>) -> usize {
        let Some(cutoff) = self.cutoff() else {
            return 0;
        };

        let before = entries.len();
        entries.retain(|_, entry| !is_expired(entry, Some(cutoff)));
        let pruned = before - entries.len();
        if pruned > 0 {
            tracing::debug!(pruned, "Pruned expired task entries");
        }
        pruned
    }
}

fn is_expired(entry: &TaskEntry, cutoff: Option<DateTime<Utc>>) -> bool {
    match (entry.completed_at, cutoff) {
        (Some(done), Some(cutoff)) => done <= cutoff,
        _ => false,
    }
}
