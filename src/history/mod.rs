//! History 모듈 - 완료된 질의응답 기록
//!
//! 답변 하나가 끝날 때마다 정확히 한 건의 기록이 `HistorySink` 로 전달됩니다.
//! 기록 실패는 로그로만 남기고 대화는 계속됩니다.

mod store;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use store::{HistoryStats, SqliteHistoryStore};

/// 질의응답 기록
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// 사용자 식별자 (인증은 외부 책임)
    pub user: String,
    pub question: String,
    pub answer: String,
    pub timestamp: DateTime<Utc>,
}

impl HistoryRecord {
    pub fn new(user: impl Into<String>, question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            question: question.into(),
            answer: answer.into(),
            timestamp: Utc::now(),
        }
    }
}

/// 답변 확정 이벤트 수신자
#[async_trait]
pub trait HistorySink: Send + Sync {
    /// 완료된 답변 한 건 기록
    async fn record(&self, record: HistoryRecord) -> Result<()>;
}

/// 아무것도 저장하지 않는 수신자 (기록 비활성화)
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHistory;

#[async_trait]
impl HistorySink for NoopHistory {
    async fn record(&self, record: HistoryRecord) -> Result<()> {
        tracing::debug!("History disabled, dropping record for {}", record.user);
        Ok(())
    }
}

/// 질의응답 목록을 `Question,Answer` CSV로 기록 (RFC 4180 인용 규칙)
pub fn write_csv<W: std::io::Write>(records: &[HistoryRecord], mut writer: W) -> Result<()> {
    writeln!(writer, "Question,Answer")?;
    for record in records {
        writeln!(
            writer,
            "{},{}",
            csv_field(&record.question),
            csv_field(&record.answer)
        )?;
    }
    writer.flush()?;
    Ok(())
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
