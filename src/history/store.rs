//! History Store - rusqlite 기반 질의응답 기록 저장소
//!
//! 저장 위치: <data_dir>/history.db

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OpenFlags};
use serde::Serialize;

use super::{write_csv, HistoryRecord, HistorySink};

/// 저장소 통계
#[derive(Debug, Clone, Serialize)]
pub struct HistoryStats {
    pub record_count: usize,
    pub user_count: usize,
    pub db_path: PathBuf,
}

/// SQLite 기록 저장소
#[derive(Clone)]
pub struct SqliteHistoryStore {
    conn: Arc<Mutex<Connection>>,
    db_path: PathBuf,
}

impl SqliteHistoryStore {
    /// 저장소 열기 (없으면 생성)
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)
                    .context("Failed to create history directory")?;
            }
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .context("Failed to open SQLite database")?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path: path.to_path_buf(),
        };

        store.initialize()?;
        Ok(store)
    }

    /// 데이터 디렉토리 아래에서 열기
    pub fn open_in(data_dir: &Path) -> Result<Self> {
        Self::open(&data_dir.join("history.db"))
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))
    }

    /// 스키마 초기화
    fn initialize(&self) -> Result<()> {
        let conn = self.lock()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS chat_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user TEXT NOT NULL,
                question TEXT NOT NULL,
                answer TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
            [],
        )
        .context("Failed to create chat_history table")?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_chat_history_user ON chat_history(user, created_at)",
            [],
        )
        .context("Failed to create user index")?;

        tracing::debug!("History store initialized at {:?}", self.db_path);
        Ok(())
    }

    /// 기록 추가
    pub fn append(&self, record: &HistoryRecord) -> Result<i64> {
        let conn = self.lock()?;

        conn.execute(
            "INSERT INTO chat_history (user, question, answer, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                record.user,
                record.question,
                record.answer,
                record.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
            ],
        )
        .context("Failed to insert history record")?;

        Ok(conn.last_insert_rowid())
    }

    /// 사용자 기록 조회 (오래된 순)
    ///
    /// `limit` 이 있으면 가장 최근 N건만 (여전히 오래된 순으로) 반환합니다.
    pub fn list_for_user(&self, user: &str, limit: Option<usize>) -> Result<Vec<HistoryRecord>> {
        let conn = self.lock()?;
        let limit = limit.map(|n| n as i64).unwrap_or(-1);

        let mut stmt = conn.prepare(
            "SELECT user, question, answer, created_at FROM (
                 SELECT id, user, question, answer, created_at FROM chat_history
                 WHERE user = ?1
                 ORDER BY created_at DESC, id DESC
                 LIMIT ?2
             )
             ORDER BY created_at ASC, id ASC",
        )?;

        let records = stmt
            .query_map(params![user, limit], |row| {
                Ok(HistoryRecord {
                    user: row.get(0)?,
                    question: row.get(1)?,
                    answer: row.get(2)?,
                    timestamp: parse_datetime(row.get::<_, String>(3)?),
                })
            })?
            .filter_map(|r| r.ok())
            .collect();

        Ok(records)
    }

    /// 사용자 기록을 `Question,Answer` CSV로 내보내기
    ///
    /// 내보낸 건수를 반환합니다.
    pub fn export_csv<W: std::io::Write>(&self, user: &str, writer: W) -> Result<usize> {
        let records = self.list_for_user(user, None)?;
        write_csv(&records, writer).context("Failed to write CSV")?;
        Ok(records.len())
    }

    /// 저장소 통계
    pub fn stats(&self) -> Result<HistoryStats> {
        let conn = self.lock()?;

        let record_count: i64 = conn
            .query_row("SELECT COUNT(*) FROM chat_history", [], |row| row.get(0))
            .unwrap_or(0);

        let user_count: i64 = conn
            .query_row("SELECT COUNT(DISTINCT user) FROM chat_history", [], |row| {
                row.get(0)
            })
            .unwrap_or(0);

        Ok(HistoryStats {
            record_count: record_count as usize,
            user_count: user_count as usize,
            db_path: self.db_path.clone(),
        })
    }
}

#[async_trait]
impl HistorySink for SqliteHistoryStore {
    async fn record(&self, record: HistoryRecord) -> Result<()> {
        // rusqlite 호출은 blocking 이므로 워커 스레드 밖에서 수행
        let store = self.clone();
        let (id, user) = tokio::task::spawn_blocking(move || {
            store.append(&record).map(|id| (id, record.user))
        })
        .await
        .context("History write task failed")??;

        tracing::debug!("Stored history record {} for {}", id, user);
        Ok(())
    }
}

/// RFC3339 문자열을 DateTime<Utc>로 파싱
fn parse_datetime(s: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

// ============================================================================
// Tests
// ============================================================================
