use async_trait::async_trait;
use sqlx::PgPool;

use super::{Store, StoreError};
use crate::db::models::{BlindCommand, CommandRecord, NewReading, Reading};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn insert_reading(&self, reading: NewReading) -> Result<Reading, StoreError> {
        let row = sqlx::query_as::<_, Reading>(
            r#"
            INSERT INTO readings (status, humidity, light_level, timestamp, timestamp_raw)
            VALUES ($1, $2, $3, COALESCE($4, now()), $5)
            RETURNING id, status, humidity, light_level,
                      timestamp, timestamp_raw, created_at, updated_at
            "#,
        )
        .bind(reading.status)
        .bind(reading.humidity)
        .bind(reading.light_level)
        .bind(reading.timestamp)
        .bind(reading.timestamp_raw)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn recent_readings(&self, limit: i64) -> Result<Vec<Reading>, StoreError> {
        let rows = sqlx::query_as::<_, Reading>(
            r#"
            SELECT id, status, humidity, light_level,
                   timestamp, timestamp_raw, created_at, updated_at
            FROM readings
            ORDER BY created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn insert_command(&self, command: BlindCommand) -> Result<CommandRecord, StoreError> {
        let row = sqlx::query_as::<_, CommandRecord>(
            r#"
            INSERT INTO blind_commands (command)
            VALUES ($1)
            RETURNING id, command, timestamp, created_at
            "#,
        )
        .bind(command)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn latest_command(&self) -> Result<Option<CommandRecord>, StoreError> {
        let row = sqlx::query_as::<_, CommandRecord>(
            r#"
            SELECT id, command, timestamp, created_at
            FROM blind_commands
            ORDER BY timestamp DESC, created_at DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn clear_commands(&self) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM blind_commands")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn take_latest_command(&self) -> Result<Option<CommandRecord>, StoreError> {
        // Single statement: a concurrent poll blocks on the row locks and
        // then finds nothing, so each command is returned at most once.
        let row = sqlx::query_as::<_, CommandRecord>(
            r#"
            WITH drained AS (
                DELETE FROM blind_commands
                RETURNING id, command, timestamp, created_at
            )
            SELECT id, command, timestamp, created_at
            FROM drained
            ORDER BY timestamp DESC, created_at DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn take_oldest_command(&self) -> Result<Option<CommandRecord>, StoreError> {
        let row = sqlx::query_as::<_, CommandRecord>(
            r#"
            DELETE FROM blind_commands
            WHERE id = (
                SELECT id
                FROM blind_commands
                ORDER BY timestamp ASC, created_at ASC
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING id, command, timestamp, created_at
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use sqlx::PgPool;

    use super::*;

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn insert_reading_defaults_timestamp_to_created_at(pool: PgPool) {
        let store = PgStore::new(pool);
        let reading = store
            .insert_reading(NewReading {
                status: Some("open".into()),
                humidity: Some(41.5),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(reading.status.as_deref(), Some("open"));
        assert_eq!(reading.humidity, Some(41.5));
        assert_eq!(reading.light_level, None);
        assert_eq!(reading.timestamp, reading.created_at);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn insert_reading_keeps_device_timestamp(pool: PgPool) {
        let store = PgStore::new(pool);
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let reading = store
            .insert_reading(NewReading {
                light_level: Some(730.0),
                timestamp: Some(at),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(reading.timestamp, at);
        assert_eq!(reading.timestamp_raw, None);
        assert_eq!(reading.light_level, Some(730.0));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn insert_reading_keeps_unparsed_timestamp_text(pool: PgPool) {
        let store = PgStore::new(pool);
        let reading = store
            .insert_reading(NewReading {
                timestamp_raw: Some("boot+42s".into()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(reading.timestamp_raw.as_deref(), Some("boot+42s"));
        assert_eq!(reading.timestamp, reading.created_at);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn recent_readings_are_newest_first_and_limited(pool: PgPool) {
        for i in 0..5 {
            sqlx::query("INSERT INTO readings (status, created_at) VALUES ($1, now() + make_interval(secs => $2))")
                .bind(format!("s{i}"))
                .bind(i as f64)
                .execute(&pool)
                .await
                .unwrap();
        }

        let store = PgStore::new(pool);
        let rows = store.recent_readings(3).await.unwrap();
        let statuses: Vec<_> = rows.iter().map(|r| r.status.clone().unwrap()).collect();
        assert_eq!(statuses, ["s4", "s3", "s2"]);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn take_latest_drains_all_commands(pool: PgPool) {
        let store = PgStore::new(pool);
        store.insert_command(BlindCommand::Open).await.unwrap();
        store.insert_command(BlindCommand::Close).await.unwrap();

        let taken = store.take_latest_command().await.unwrap().unwrap();
        assert_eq!(taken.command, BlindCommand::Close);
        assert!(store.latest_command().await.unwrap().is_none());
        assert!(store.take_latest_command().await.unwrap().is_none());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn take_oldest_dequeues_one_at_a_time(pool: PgPool) {
        let store = PgStore::new(pool);
        store.insert_command(BlindCommand::Open).await.unwrap();
        store.insert_command(BlindCommand::Auto).await.unwrap();

        let first = store.take_oldest_command().await.unwrap().unwrap();
        let second = store.take_oldest_command().await.unwrap().unwrap();
        assert_eq!(first.command, BlindCommand::Open);
        assert_eq!(second.command, BlindCommand::Auto);
        assert!(store.take_oldest_command().await.unwrap().is_none());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn clear_commands_reports_count(pool: PgPool) {
        let store = PgStore::new(pool);
        store.insert_command(BlindCommand::Manual).await.unwrap();
        store.insert_command(BlindCommand::Manual).await.unwrap();

        assert_eq!(store.clear_commands().await.unwrap(), 2);
        assert_eq!(store.clear_commands().await.unwrap(), 0);
    }
}
