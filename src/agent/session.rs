//! Session - 사용자 한 명의 대화 상태
//!
//! - 문서 인덱스: 있거나(PDF 모드 가능) 없거나(WEB 전용)
//! - 대화 기록: user/assistant 턴의 순서 있는 목록
//!
//! 인덱스는 `Arc` 스냅샷으로 교체되므로 진행 중인 질문은 시작 시점의
//! 인덱스를 끝까지 사용합니다. 대화 기록의 추가는 뮤텍스로 직렬화됩니다.

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use uuid::Uuid;

use crate::knowledge::{DocumentIndex, IndexHandle};
use crate::llm::ChatMessage;

/// 대화 기록 한 턴 (role 은 user 또는 assistant)
pub type ConversationTurn = ChatMessage;

/// 대화 세션
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    user: String,
    index: RwLock<Option<Arc<DocumentIndex>>>,
    transcript: Mutex<Vec<ConversationTurn>>,
}

impl Session {
    /// 새 세션 (문서 없음, 기록 없음)
    pub fn new(user: impl Into<String>) -> Self {
        let session = Self {
            id: Uuid::new_v4(),
            user: user.into(),
            index: RwLock::new(None),
            transcript: Mutex::new(Vec::new()),
        };
        tracing::debug!("Opened session {} for {}", session.id, session.user);
        session
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    /// 현재 인덱스 스냅샷
    pub fn index(&self) -> Option<Arc<DocumentIndex>> {
        self.index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// 현재 인덱스 메타데이터
    pub fn index_handle(&self) -> Option<IndexHandle> {
        self.index().map(|index| index.handle().clone())
    }

    pub fn has_document(&self) -> bool {
        self.index().is_some()
    }

    /// 인덱스 교체 (None 이면 WEB 전용으로 전환)
    pub(crate) fn replace_index(&self, index: Option<Arc<DocumentIndex>>) {
        *self.index.write().unwrap_or_else(PoisonError::into_inner) = index;
    }

    /// 대화 기록 스냅샷
    pub fn transcript(&self) -> Vec<ConversationTurn> {
        self.transcript
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// 완료된 질의응답 한 쌍을 원자적으로 추가
    pub(crate) fn commit_turns(&self, question: &str, answer: &str) {
        let mut transcript = self.transcript.lock().unwrap_or_else(PoisonError::into_inner);
        transcript.push(ChatMessage::user(question));
        transcript.push(ChatMessage::assistant(answer));
    }

    /// 대화 기록과 문서를 모두 비움
    pub fn reset(&self) {
        self.replace_index(None);
        self.transcript
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        tracing::info!("Session {} reset", self.id);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::testing::KeywordEmbedder;
    use crate::llm::Role;

    async fn small_index() -> Arc<DocumentIndex> {
        let index = DocumentIndex::build(
            "text",
            vec!["some text".to_string()],
            &KeywordEmbedder::new(),
            Some("notes.txt".to_string()),
        )
        .await
        .expect("index builds");
        Arc::new(index)
    }

    #[test]
    fn test_new_session_is_empty() {
        let session = Session::new("alice");
        assert_eq!(session.user(), "alice");
        assert!(!session.has_document());
        assert!(session.transcript().is_empty());
    }

    #[test]
    fn test_commit_appends_pair_in_order() {
        let session = Session::new("alice");
        session.commit_turns("q1", "a1");
        session.commit_turns("q2", "a2");

        let transcript = session.transcript();
        assert_eq!(transcript.len(), 4);
        assert_eq!(transcript[0].role, Role::User);
        assert_eq!(transcript[0].content, "q1");
        assert_eq!(transcript[1].role, Role::Assistant);
        assert_eq!(transcript[3].content, "a2");
    }

    #[tokio::test]
    async fn test_snapshot_survives_replacement() {
        let session = Session::new("alice");
        session.replace_index(Some(small_index().await));

        let snapshot = session.index().expect("index present");
        session.replace_index(None);

        assert!(!session.has_document());
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.handle().label.as_deref(), Some("notes.txt"));
    }

    #[tokio::test]
    async fn test_reset_clears_everything() {
        let session = Session::new("alice");
        session.replace_index(Some(small_index().await));
        session.commit_turns("q", "a");

        session.reset();

        assert!(session.index_handle().is_none());
        assert!(session.transcript().is_empty());
    }
}
