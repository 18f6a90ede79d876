//! 预测日志存储
//!
//! 只追加写入，按时间倒序读取最近 N 条

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension};

use super::model::{PredictionRecord, Resolution};

/// 日志存储错误
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("数据库错误: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("存储任务异常: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("记录数据损坏: {0}")]
    Corrupt(String),
}

/// 预测日志存储 trait
#[async_trait::async_trait]
pub trait LogStore: Send + Sync {
    /// 追加一条记录
    async fn insert(&self, record: PredictionRecord) -> Result<(), StoreError>;

    /// 最近的 `limit` 条记录，按时间倒序，同一时间按写入顺序倒序
    async fn recent(&self, limit: usize) -> Result<Vec<PredictionRecord>, StoreError>;

    /// 记录总数
    async fn count(&self) -> Result<u64, StoreError>;
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("无效时间戳 '{}': {}", s, e)))
}

struct Inner {
    conn: Connection,
    /// 最近一次写入的时间戳，保证写入顺序上时间不回退
    last_timestamp: Option<DateTime<Utc>>,
}

/// 底层 SQLite 存储（同步）
struct SqliteStore {
    inner: Mutex<Inner>,
}

impl SqliteStore {
    fn open(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS prediction_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                bandwidth REAL NOT NULL,
                latency REAL NOT NULL,
                packet_loss REAL NOT NULL,
                resolution TEXT NOT NULL,
                bitrate REAL NOT NULL,
                score REAL NOT NULL,
                timestamp TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_prediction_timestamp ON prediction_logs(timestamp);",
        )?;

        let last: Option<String> = conn
            .query_row("SELECT MAX(timestamp) FROM prediction_logs", [], |row| {
                row.get(0)
            })
            .optional()?
            .flatten();
        let last_timestamp = last.as_deref().map(parse_timestamp).transpose()?;

        Ok(Self {
            inner: Mutex::new(Inner {
                conn,
                last_timestamp,
            }),
        })
    }

    fn insert(&self, record: &PredictionRecord) -> Result<DateTime<Utc>, StoreError> {
        let mut inner = self.inner.lock();

        // 存储精度为毫秒；系统时钟回拨时沿用上一条的时间戳
        let mut timestamp = record.timestamp.trunc_subsecs(3);
        if let Some(last) = inner.last_timestamp {
            if timestamp < last {
                timestamp = last;
            }
        }

        inner.conn.execute(
            "INSERT INTO prediction_logs (bandwidth, latency, packet_loss, resolution, bitrate, score, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                record.bandwidth,
                record.latency,
                record.packet_loss,
                record.resolution.as_str(),
                record.bitrate,
                record.score,
                format_timestamp(&timestamp),
            ],
        )?;
        inner.last_timestamp = Some(timestamp);
        Ok(timestamp)
    }

    fn recent(&self, limit: usize) -> Result<Vec<PredictionRecord>, StoreError> {
        let inner = self.inner.lock();
        let mut stmt = inner.conn.prepare(
            "SELECT bandwidth, latency, packet_loss, resolution, bitrate, score, timestamp
             FROM prediction_logs ORDER BY timestamp DESC, id DESC LIMIT ?1",
        )?;
        // SQLite 将负数 LIMIT 视为不限制
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt
            .query_map([limit], |row| {
                Ok((
                    row.get::<_, f64>(0)?,
                    row.get::<_, f64>(1)?,
                    row.get::<_, f64>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, f64>(4)?,
                    row.get::<_, f64>(5)?,
                    row.get::<_, String>(6)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(
                |(bandwidth, latency, packet_loss, resolution, bitrate, score, timestamp)|
                 -> Result<PredictionRecord, StoreError> {
                    Ok(PredictionRecord {
                        bandwidth,
                        latency,
                        packet_loss,
                        resolution: resolution
                            .parse::<Resolution>()
                            .map_err(StoreError::Corrupt)?,
                        bitrate,
                        score,
                        timestamp: parse_timestamp(&timestamp)?,
                    })
                },
            )
            .collect()
    }

    fn count(&self) -> Result<u64, StoreError> {
        let inner = self.inner.lock();
        let count: i64 =
            inner
                .conn
                .query_row("SELECT COUNT(*) FROM prediction_logs", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

/// SQLite 预测日志（异步 API）
///
/// 阻塞的数据库操作放到 blocking 线程池执行
#[derive(Clone)]
pub struct SqliteLogStore {
    store: Arc<SqliteStore>,
}

impl SqliteLogStore {
    /// 打开（必要时创建）数据库文件
    pub fn open(db_path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(db_path)?;
        Ok(Self {
            store: Arc::new(SqliteStore::open(conn)?),
        })
    }

    /// 内存数据库，进程退出即丢失
    #[cfg(test)]
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            store: Arc::new(SqliteStore::open(conn)?),
        })
    }
}

#[async_trait::async_trait]
impl LogStore for SqliteLogStore {
    async fn insert(&self, record: PredictionRecord) -> Result<(), StoreError> {
        let store = self.store.clone();
        let stored_at = tokio::task::spawn_blocking(move || store.insert(&record)).await??;
        tracing::debug!("预测记录已写入: {}", format_timestamp(&stored_at));
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<PredictionRecord>, StoreError> {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || store.recent(limit)).await?
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || store.count()).await?
    }
}
