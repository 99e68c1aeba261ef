//! QueueStore - concurrency-safe subject -> ordered participants mapping
//!
//! One coarse reader/writer lock guards every queue. The lock only ever
//! protects in-memory work: callers perform sheet I/O outside of it.

use crate::domain::roster::normalize;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

/// Result of a join attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinAdmission {
    /// 1-based position (new tail, or the existing place when not admitted)
    pub position: usize,
    pub admitted: bool,
}

/// Where someone stands and who is directly ahead of them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueInfo {
    pub position: usize,
    pub predecessor: Option<String>,
}

#[derive(Debug, Default)]
pub struct QueueStore {
    queues: RwLock<HashMap<String, Vec<String>>>,
}

impl QueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Each write is a single in-memory statement, so a poisoned lock never
    // guards a half-applied change.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Vec<String>>> {
        self.queues.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Vec<String>>> {
        self.queues.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append `identity` to the tail unless it is already queued
    pub fn join(&self, subject: &str, identity: &str) -> JoinAdmission {
        let identity = normalize(identity);
        let mut queues = self.write();
        let queue = queues.entry(subject.to_string()).or_default();

        if let Some(index) = queue.iter().position(|name| name == identity) {
            debug!(subject, identity, position = index + 1, "Already in queue");
            return JoinAdmission {
                position: index + 1,
                admitted: false,
            };
        }

        queue.push(identity.to_string());
        let position = queue.len();
        info!(subject, identity, position, "Joined queue");
        JoinAdmission {
            position,
            admitted: true,
        }
    }

    /// Remove `identity`; returns false (and does nothing) if it was absent
    pub fn leave(&self, subject: &str, identity: &str) -> bool {
        let identity = normalize(identity);
        let mut queues = self.write();
        let Some(queue) = queues.get_mut(subject) else {
            return false;
        };

        match queue.iter().position(|name| name == identity) {
            Some(index) => {
                queue.remove(index);
                info!(subject, identity, "Left queue");
                true
            }
            None => false,
        }
    }

    /// Empty a queue, keeping the subject known. Returns how many were removed.
    pub fn clear(&self, subject: &str) -> usize {
        let mut queues = self.write();
        let queue = queues.entry(subject.to_string()).or_default();
        let removed = queue.len();
        queue.clear();
        removed
    }

    /// Owned copy of a queue; empty for subjects never seen
    pub fn snapshot(&self, subject: &str) -> Vec<String> {
        self.read().get(subject).cloned().unwrap_or_default()
    }

    pub fn len(&self, subject: &str) -> usize {
        self.read().get(subject).map_or(0, Vec::len)
    }

    /// 1-based position of `identity`
    pub fn position_of(&self, subject: &str, identity: &str) -> Option<usize> {
        let identity = normalize(identity);
        self.read()
            .get(subject)?
            .iter()
            .position(|name| name == identity)
            .map(|index| index + 1)
    }

    pub fn queue_info(&self, subject: &str, identity: &str) -> Option<QueueInfo> {
        let identity = normalize(identity);
        let queues = self.read();
        let queue = queues.get(subject)?;
        let index = queue.iter().position(|name| name == identity)?;

        Some(QueueInfo {
            position: index + 1,
            predecessor: index.checked_sub(1).map(|prev| queue[prev].clone()),
        })
    }

    /// Overwrite a queue wholesale. Reserved for reconciliation, which
    /// guarantees the sequence is already deduplicated.
    pub(crate) fn replace_all(&self, subject: &str, identities: Vec<String>) -> Vec<String> {
        let mut queues = self.write();
        queues
            .insert(subject.to_string(), identities)
            .unwrap_or_default()
    }
}
