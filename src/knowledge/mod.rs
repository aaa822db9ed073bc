//! Knowledge 모듈 - 문서 인덱싱과 벡터 검색
//!
//! - Chunker: 겹치는 고정 크기 윈도우 분할
//! - Vector: 정확한 제곱 L2 전수 검색
//! - Index: 문서 하나에 대한 청크 + 벡터 스냅샷

mod chunker;
mod index;
mod vector;

// Re-exports
pub use chunker::{
    chunk_text, ChunkConfig, Chunker, WindowChunker, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE,
};
pub use index::{fingerprint, DocumentIndex, IndexHandle};
pub use vector::{squared_l2, Chunk, FlatIndex, SearchResult};
