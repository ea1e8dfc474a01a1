//! Bounds concurrent in-flight dispatches per backend key.
//!
//! Admission is FIFO per key (tokio's semaphore queues waiters fairly), a
//! waiter past its deadline is rejected without ever holding a slot, and a
//! dropped acquire future leaves the wait queue without a grant. Release
//! happens exactly once per acquire because the ticket releases on drop.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::{RelayError, Result};

pub struct AdmissionQueue {
    capacity: usize,
    max_wait: Duration,
    slots: Mutex<HashMap<String, Arc<Semaphore>>>,
}

/// One in-flight dispatch slot. Dropping it is the release path, covering
/// success, failure, and abandonment alike.
#[derive(Debug)]
pub struct AdmissionTicket {
    _permit: OwnedSemaphorePermit,
}

impl AdmissionQueue {
    pub fn new(capacity: usize, max_wait: Duration) -> Self {
        Self {
            capacity: capacity.max(1),
            max_wait,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Waits for a slot under `key`, up to the configured deadline.
    pub async fn acquire(&self, key: &str) -> Result<AdmissionTicket> {
        let semaphore = self.semaphore_for(key);
        let acquired = tokio::time::timeout(self.max_wait, semaphore.acquire_owned())
            .await
            .map_err(|_| RelayError::QueueTimeout {
                key: key.to_string(),
                waited_ms: self.max_wait.as_millis() as u64,
            })?;
        let permit = acquired
            .map_err(|_| RelayError::Internal("admission queue was closed".to_string()))?;
        Ok(AdmissionTicket { _permit: permit })
    }

    fn semaphore_for(&self, key: &str) -> Arc<Semaphore> {
        let mut slots = self.slots.lock().unwrap_or_else(|poisoned| {
            // Slot maps hold no invariants beyond the semaphores themselves.
            poisoned.into_inner()
        });
        slots
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(self.capacity)))
            .clone()
    }

    #[cfg(test)]
    fn available(&self, key: &str) -> usize {
        self.semaphore_for(key).available_permits()
    }
}
