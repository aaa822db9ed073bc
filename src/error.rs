//! 에러 타입 정의
//!
//! 파이프라인의 공개 계약에서 드러나는 실패 분류입니다.
//! 라우팅, 검색, 생성 실패는 각 컴포넌트 경계에서 회복되어
//! 품질이 낮아진 결과로 변환되므로 여기에는 나타나지 않습니다.

use thiserror::Error;

// ============================================================================
// ConfigError
// ============================================================================

/// 설정 에러 (치명적 - 해당 작업을 즉시 중단)
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 청크 파라미터 오류 (overlap >= size 이면 윈도우가 전진하지 않음)
    #[error("Invalid chunk parameters: overlap ({overlap}) must be smaller than size ({size})")]
    InvalidChunking { size: usize, overlap: usize },

    /// 자격 증명 누락
    #[error("Missing credential: set {0}")]
    MissingCredential(&'static str),

    /// 잘못된 설정값
    #[error("Invalid setting {name}: {reason}")]
    InvalidSetting { name: &'static str, reason: String },
}

// ============================================================================
// IngestError
// ============================================================================

/// 문서 인덱싱 실패
///
/// 호출자에게는 "문서가 인덱싱되지 않음"으로 전달되며,
/// 세션은 WEB 전용 모드로 동작합니다.
#[derive(Debug, Error)]
pub enum IngestError {
    /// 추출된 텍스트가 비어 있음
    #[error("No text could be extracted from the document")]
    EmptyDocument,

    /// 지원하지 않는 파일 형식
    #[error("Unsupported document type: {0}")]
    Unsupported(String),

    /// 문서 읽기 실패
    #[error("Failed to read document: {0}")]
    Read(String),

    /// 임베딩 호출 실패
    #[error("Failed to embed chunks: {0}")]
    Embedding(String),

    /// 임베딩 개수 또는 차원 불일치
    #[error("Embedder returned inconsistent output: {0}")]
    InconsistentEmbeddings(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
