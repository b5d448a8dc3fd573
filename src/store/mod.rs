//! Persistence boundary for readings and pending commands.
//!
//! Handlers only see `Arc<dyn Store>`; `main` picks the implementation.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;

use crate::db::models::{BlindCommand, CommandRecord, NewReading, Reading};

/// How many readings `GET /api/blinds` returns at most.
pub const RECENT_READINGS_LIMIT: i64 = 100;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    /// A request value that could not be coerced into the column type.
    #[error("Cast to {expected} failed for value {value} at path \"{field}\"")]
    Cast {
        field: &'static str,
        expected: &'static str,
        value: String,
    },
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn insert_reading(&self, reading: NewReading) -> Result<Reading, StoreError>;

    /// Newest-first by creation time.
    async fn recent_readings(&self, limit: i64) -> Result<Vec<Reading>, StoreError>;

    async fn insert_command(&self, command: BlindCommand) -> Result<CommandRecord, StoreError>;

    /// The pending command with the greatest timestamp, if any.
    async fn latest_command(&self) -> Result<Option<CommandRecord>, StoreError>;

    /// Deletes every pending command and returns how many were removed.
    async fn clear_commands(&self) -> Result<u64, StoreError>;

    /// Returns the latest pending command and discards all of them.
    ///
    /// This default is a read followed by a separate delete; a command
    /// inserted between the two is lost without being returned.
    /// Implementations that can do both in one step should override it.
    async fn take_latest_command(&self) -> Result<Option<CommandRecord>, StoreError> {
        let latest = self.latest_command().await?;
        if latest.is_some() {
            self.clear_commands().await?;
        }
        Ok(latest)
    }

    /// Removes and returns only the oldest pending command.
    async fn take_oldest_command(&self) -> Result<Option<CommandRecord>, StoreError>;
}
