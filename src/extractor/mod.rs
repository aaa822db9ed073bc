//! 문서 추출 모듈
//!
//! 업로드된 문서에서 인덱싱할 원문 텍스트를 얻습니다.
//! - PDF 파일: pdf-extract로 텍스트 추출
//! - 텍스트 파일(.txt, .md): 그대로 읽기

pub mod pdf;

use std::path::Path;

use crate::error::IngestError;

pub use pdf::extract_text;

/// 지원하는 문서 타입
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Text,
}

impl DocumentKind {
    /// 확장자로 문서 타입 결정
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "pdf" => Some(DocumentKind::Pdf),
            "txt" | "md" | "markdown" => Some(DocumentKind::Text),
            _ => None,
        }
    }
}

/// 파일에서 원문 텍스트 읽기
///
/// PDF 추출은 CPU 바운드이므로 blocking 스레드에서 수행합니다.
pub async fn load_document(path: &Path) -> Result<String, IngestError> {
    let kind = DocumentKind::from_path(path)
        .ok_or_else(|| IngestError::Unsupported(path.display().to_string()))?;

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| IngestError::Read(format!("{}: {}", path.display(), e)))?;

    let text = match kind {
        DocumentKind::Pdf => tokio::task::spawn_blocking(move || extract_text(&bytes))
            .await
            .map_err(|e| IngestError::Read(format!("PDF extraction task failed: {}", e)))?,
        DocumentKind::Text => String::from_utf8(bytes)
            .map_err(|e| IngestError::Read(format!("{}: {}", path.display(), e)))?,
    };

    if text.trim().is_empty() {
        return Err(IngestError::EmptyDocument);
    }

    Ok(text)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_document_kind_from_path() {
        assert_eq!(
            DocumentKind::from_path(&PathBuf::from("paper.PDF")),
            Some(DocumentKind::Pdf)
        );
        assert_eq!(
            DocumentKind::from_path(&PathBuf::from("notes.md")),
            Some(DocumentKind::Text)
        );
        assert_eq!(DocumentKind::from_path(&PathBuf::from("image.png")), None);
        assert_eq!(DocumentKind::from_path(&PathBuf::from("README")), None);
    }

    #[tokio::test]
    async fn test_load_text_document() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("doc.txt");
        std::fs::write(&path, "Paris is the capital of France.").expect("write");

        let text = load_document(&path).await.expect("loads");
        assert_eq!(text, "Paris is the capital of France.");
    }

    #[tokio::test]
    async fn test_load_empty_document_rejected() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("empty.md");
        std::fs::write(&path, "  \n").expect("write");

        let result = load_document(&path).await;
        assert!(matches!(result, Err(IngestError::EmptyDocument)));
    }

    #[tokio::test]
    async fn test_load_unsupported_document() {
        let result = load_document(Path::new("photo.jpg")).await;
        assert!(matches!(result, Err(IngestError::Unsupported(_))));
    }

    #[tokio::test]
    async fn test_load_broken_pdf_is_empty() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"not a pdf").expect("write");

        let result = load_document(&path).await;
        assert!(matches!(result, Err(IngestError::EmptyDocument)));
    }
}
