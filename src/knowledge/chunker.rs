//! Text Chunking Module
//!
//! 고정 크기의 겹치는 윈도우로 텍스트를 분할합니다.
//! 문장/문단 경계는 고려하지 않습니다 (문장 중간에서 잘릴 수 있음).

use crate::error::ConfigError;

/// 기본 청크 크기 (문자 수)
pub const DEFAULT_CHUNK_SIZE: usize = 700;
/// 기본 오버랩 크기 (문자 수)
pub const DEFAULT_CHUNK_OVERLAP: usize = 100;

// ============================================================================
// Chunk Configuration
// ============================================================================

/// 청킹 설정
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkConfig {
    /// 윈도우 크기 (문자 수)
    pub size: usize,
    /// 인접 윈도우 간 겹치는 문자 수
    pub overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl ChunkConfig {
    /// 설정 검증
    ///
    /// `overlap >= size` 이면 시작 위치가 전진하지 않으므로 거부합니다.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.overlap >= self.size {
            return Err(ConfigError::InvalidChunking {
                size: self.size,
                overlap: self.overlap,
            });
        }
        Ok(())
    }

    /// 윈도우 시작 위치 증가량
    pub fn step(&self) -> usize {
        self.size - self.overlap
    }
}

// ============================================================================
// Chunker Trait
// ============================================================================

/// 텍스트 청킹 전략 트레이트
pub trait Chunker: Send + Sync {
    /// 텍스트를 청크로 분할
    fn chunk(&self, text: &str) -> Vec<String>;

    /// 청커 이름
    fn name(&self) -> &'static str;
}

// ============================================================================
// WindowChunker
// ============================================================================

/// 슬라이딩 윈도우 청커
///
/// 시작 위치를 `size - overlap` 씩 전진시키며 `[start, start + size)` 구간을
/// 잘라냅니다. 윈도우가 텍스트 끝에 닿으면 멈추므로 마지막 청크가
/// 직전 청크에 완전히 포함되는 경우는 없습니다.
#[derive(Debug, Clone)]
pub struct WindowChunker {
    config: ChunkConfig,
}

impl WindowChunker {
    /// 설정으로 생성 (잘못된 설정은 ConfigError)
    pub fn new(config: ChunkConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// 기본 설정(700/100)으로 생성
    pub fn with_defaults() -> Self {
        Self {
            config: ChunkConfig::default(),
        }
    }

    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }
}

impl Chunker for WindowChunker {
    fn chunk(&self, text: &str) -> Vec<String> {
        // 문자(char) 단위로 자르기 위해 각 문자의 바이트 오프셋을 기록
        let boundaries: Vec<usize> = text
            .char_indices()
            .map(|(offset, _)| offset)
            .chain(std::iter::once(text.len()))
            .collect();
        let char_count = boundaries.len() - 1;

        let mut chunks = Vec::new();
        let mut start = 0;

        while start < char_count {
            let end = (start + self.config.size).min(char_count);
            chunks.push(text[boundaries[start]..boundaries[end]].to_string());

            if end >= char_count {
                break;
            }

            start += self.config.step();
        }

        chunks
    }

    fn name(&self) -> &'static str {
        "WindowChunker"
    }
}

/// 텍스트를 겹치는 고정 크기 청크로 분할
///
/// # Arguments
/// * `text` - 분할할 텍스트
/// * `config` - 윈도우 크기와 오버랩
///
/// # Returns
/// 청크 문자열 목록 (빈 텍스트는 빈 목록)
pub fn chunk_text(text: &str, config: ChunkConfig) -> Result<Vec<String>, ConfigError> {
    Ok(WindowChunker::new(config)?.chunk(text))
}

// ============================================================================
// Tests
// ============================================================================
