//! SqliteRecordStore - 基于 sqlx 的持久化存储
//!
//! 一个批次对应一个事务：全部写入或全部回滚。
//! `AUTOINCREMENT` 保证 id 单调递增且删除后不复用。

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use contracts::{
    Accelerometer, ContractError, GpsPoint, PersistedRecord, ProcessedReading, RecordStore,
    SurfaceState,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use tracing::{debug, info, instrument};

const SELECT_COLUMNS: &str =
    "SELECT id, road_state, x, y, z, latitude, longitude, timestamp FROM processed_agent_data";

/// SQLite 记录存储
#[derive(Debug, Clone)]
pub struct SqliteRecordStore {
    pool: SqlitePool,
}

impl SqliteRecordStore {
    /// 打开 (或创建) 数据库并初始化表结构
    ///
    /// `url` 形如 `sqlite://roadwatch.db` 或 `sqlite::memory:`。
    pub async fn open(url: &str, max_connections: u32) -> Result<Self, ContractError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| persist_error("invalid database url", e))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await
            .map_err(|e| persist_error("failed to open database", e))?;

        let store = Self { pool };
        store.init_schema().await?;

        info!(url, max_connections, "Record store opened");
        Ok(store)
    }

    /// 内存数据库 (测试 / demo)
    ///
    /// 单连接且不回收：内存库随最后一个连接关闭而消失。
    pub async fn in_memory() -> Result<Self, ContractError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| persist_error("invalid database url", e))?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| persist_error("failed to create memory db", e))?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// 底层连接池
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn init_schema(&self) -> Result<(), ContractError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS processed_agent_data (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                road_state TEXT NOT NULL,
                x REAL NOT NULL,
                y REAL NOT NULL,
                z REAL NOT NULL,
                latitude REAL NOT NULL,
                longitude REAL NOT NULL,
                timestamp TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| persist_error("failed to create processed_agent_data table", e))?;

        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl RecordStore for SqliteRecordStore {
    #[instrument(name = "sqlite_insert_batch", skip(self, batch), fields(batch_size = batch.len()))]
    async fn insert_batch(
        &self,
        batch: &[ProcessedReading],
    ) -> Result<Vec<PersistedRecord>, ContractError> {
        // 事务在 drop 时自动回滚，任何 `?` 提前返回都不会留下部分数据
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| persist_error("failed to begin transaction", e))?;

        let mut persisted = Vec::with_capacity(batch.len());
        for reading in batch {
            let result = sqlx::query(
                "INSERT INTO processed_agent_data (road_state, x, y, z, latitude, longitude, timestamp) \
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(reading.road_state.as_str())
            .bind(reading.accelerometer.x)
            .bind(reading.accelerometer.y)
            .bind(reading.accelerometer.z)
            .bind(reading.gps.lat)
            .bind(reading.gps.lon)
            .bind(format_timestamp(&reading.timestamp))
            .execute(&mut *tx)
            .await
            .map_err(|e| persist_error("insert failed, batch rolled back", e))?;

            persisted.push(PersistedRecord::from_reading(
                result.last_insert_rowid(),
                reading,
            ));
        }

        tx.commit()
            .await
            .map_err(|e| persist_error("commit failed, batch rolled back", e))?;

        debug!(records = persisted.len(), "Batch committed");
        Ok(persisted)
    }

    async fn list(&self) -> Result<Vec<PersistedRecord>, ContractError> {
        let rows = sqlx::query(&format!("{SELECT_COLUMNS} ORDER BY id"))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| persist_error("failed to list records", e))?;

        rows.iter().map(row_to_record).collect()
    }

    async fn get(&self, id: i64) -> Result<PersistedRecord, ContractError> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| persist_error("failed to get record", e))?;

        match row {
            Some(row) => row_to_record(&row),
            None => Err(ContractError::NotFound { id }),
        }
    }

    async fn update(
        &self,
        id: i64,
        reading: &ProcessedReading,
    ) -> Result<PersistedRecord, ContractError> {
        let result = sqlx::query(
            "UPDATE processed_agent_data \
             SET road_state = ?, x = ?, y = ?, z = ?, latitude = ?, longitude = ?, timestamp = ? \
             WHERE id = ?",
        )
        .bind(reading.road_state.as_str())
        .bind(reading.accelerometer.x)
        .bind(reading.accelerometer.y)
        .bind(reading.accelerometer.z)
        .bind(reading.gps.lat)
        .bind(reading.gps.lon)
        .bind(format_timestamp(&reading.timestamp))
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| persist_error("failed to update record", e))?;

        if result.rows_affected() == 0 {
            return Err(ContractError::NotFound { id });
        }
        Ok(PersistedRecord::from_reading(id, reading))
    }

    async fn delete(&self, id: i64) -> Result<PersistedRecord, ContractError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| persist_error("failed to begin transaction", e))?;

        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| persist_error("failed to get record", e))?;
        let Some(row) = row else {
            return Err(ContractError::NotFound { id });
        };
        let record = row_to_record(&row)?;

        sqlx::query("DELETE FROM processed_agent_data WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| persist_error("failed to delete record", e))?;

        tx.commit()
            .await
            .map_err(|e| persist_error("failed to commit delete", e))?;
        Ok(record)
    }

    async fn count(&self) -> Result<u64, ContractError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM processed_agent_data")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| persist_error("failed to count records", e))?;

        let n: i64 = row
            .try_get("n")
            .map_err(|e| persist_error("invalid count", e))?;
        Ok(n.max(0) as u64)
    }
}

fn persist_error(context: &str, e: impl std::fmt::Display) -> ContractError {
    ContractError::persist(format!("{context}: {e}"))
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn row_to_record(row: &SqliteRow) -> Result<PersistedRecord, ContractError> {
    let column = |e: sqlx::Error| persist_error("invalid row", e);

    let label: String = row.try_get("road_state").map_err(column)?;
    let road_state = SurfaceState::parse(&label)
        .ok_or_else(|| ContractError::persist(format!("invalid road_state {label:?}")))?;

    let raw_ts: String = row.try_get("timestamp").map_err(column)?;
    let timestamp = DateTime::parse_from_rfc3339(&raw_ts)
        .map_err(|e| persist_error("invalid timestamp", e))?
        .with_timezone(&Utc);

    let accelerometer = Accelerometer {
        x: row.try_get("x").map_err(column)?,
        y: row.try_get("y").map_err(column)?,
        z: row.try_get("z").map_err(column)?,
    };
    let gps = GpsPoint {
        lat: row.try_get("latitude").map_err(column)?,
        lon: row.try_get("longitude").map_err(column)?,
    };

    Ok(PersistedRecord::from_reading(
        row.try_get("id").map_err(column)?,
        &ProcessedReading {
            road_state,
            accelerometer,
            gps,
            timestamp,
        },
    ))
}
