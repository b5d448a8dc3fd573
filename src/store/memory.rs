use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Store, StoreError};
use crate::db::models::{BlindCommand, CommandRecord, NewReading, Reading};

#[derive(Default)]
struct Collections {
    /// Insertion order, oldest first.
    readings: Vec<Reading>,
    /// Insertion order, oldest first.
    commands: Vec<CommandRecord>,
}

/// Process-local store used when no `DATABASE_URL` is configured, and by
/// the handler tests.
///
/// Wrapped in `Arc` so it can be cheaply cloned and shared across tasks.
/// Every take operation holds the write lock for its whole read-and-remove.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Collections>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn reading_count(&self) -> usize {
        self.inner.read().await.readings.len()
    }

    pub async fn pending_command_count(&self) -> usize {
        self.inner.read().await.commands.len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_reading(&self, reading: NewReading) -> Result<Reading, StoreError> {
        let now = Utc::now();
        let stored = Reading {
            id: Uuid::new_v4(),
            status: reading.status,
            humidity: reading.humidity,
            light_level: reading.light_level,
            timestamp: reading.timestamp.unwrap_or(now),
            timestamp_raw: reading.timestamp_raw,
            created_at: now,
            updated_at: now,
        };
        self.inner.write().await.readings.push(stored.clone());
        Ok(stored)
    }

    async fn recent_readings(&self, limit: i64) -> Result<Vec<Reading>, StoreError> {
        let limit = usize::try_from(limit).unwrap_or(0);
        // Pushes are in creation order, so reversing gives newest first even
        // when two readings share a `created_at`.
        Ok(self
            .inner
            .read()
            .await
            .readings
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }

    async fn insert_command(&self, command: BlindCommand) -> Result<CommandRecord, StoreError> {
        let now = Utc::now();
        let stored = CommandRecord {
            id: Uuid::new_v4(),
            command,
            timestamp: now,
            created_at: now,
        };
        self.inner.write().await.commands.push(stored.clone());
        Ok(stored)
    }

    async fn latest_command(&self) -> Result<Option<CommandRecord>, StoreError> {
        // `max_by_key` keeps the last of equal keys, i.e. the newest insert.
        Ok(self
            .inner
            .read()
            .await
            .commands
            .iter()
            .max_by_key(|c| c.timestamp)
            .cloned())
    }

    async fn clear_commands(&self) -> Result<u64, StoreError> {
        let mut inner = self.inner.write().await;
        let removed = inner.commands.len() as u64;
        inner.commands.clear();
        Ok(removed)
    }

    async fn take_latest_command(&self) -> Result<Option<CommandRecord>, StoreError> {
        let mut inner = self.inner.write().await;
        let latest = inner.commands.drain(..).max_by_key(|c| c.timestamp);
        Ok(latest)
    }

    async fn take_oldest_command(&self) -> Result<Option<CommandRecord>, StoreError> {
        let mut inner = self.inner.write().await;
        // `min_by_key` keeps the first of equal keys, i.e. the oldest insert.
        let oldest = inner
            .commands
            .iter()
            .enumerate()
            .min_by_key(|(_, c)| c.timestamp)
            .map(|(idx, _)| idx);
        let taken = oldest.map(|idx| inner.commands.remove(idx));
        Ok(taken)
    }
}
