//! PDF 텍스트 추출 모듈
//!
//! pdf-extract 크레이트를 사용하여 PDF에서 텍스트를 추출합니다.

use regex::Regex;

/// PDF 바이트에서 텍스트 추출
///
/// 페이지별 텍스트를 줄바꿈으로 이어 붙여 반환합니다.
/// 추출에 실패하거나 텍스트가 없는 PDF(스캔 문서 등)는 빈 문자열을 반환합니다.
pub fn extract_text(bytes: &[u8]) -> String {
    // pdf-extract는 일부 손상된 PDF에서 panic 하므로 경계에서 잡는다
    let result = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes));
    let text = match result {
        Ok(Ok(text)) => text,
        Ok(Err(e)) => {
            tracing::warn!("Failed to extract text from PDF: {}", e);
            return String::new();
        }
        Err(_) => {
            tracing::warn!("PDF extractor panicked on malformed input");
            return String::new();
        }
    };

    if text.trim().is_empty() {
        tracing::warn!("No text extracted from PDF. It might be a scanned document.");
        return String::new();
    }

    let pages = split_pdf_pages(&text);
    tracing::debug!("Extracted {} page(s) of text", pages.len());

    let mut joined = String::with_capacity(text.len());
    for page in pages {
        joined.push_str(&page);
        joined.push('\n');
    }
    joined
}

/// PDF 텍스트를 페이지별로 분리
fn split_pdf_pages(text: &str) -> Vec<String> {
    // 폼피드 문자 (\x0c)로 페이지 분리 시도
    let pages: Vec<String> = text
        .split('\x0c')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if pages.len() > 1 {
        return pages;
    }

    // "--- Page 1 ---" 형태의 구분자
    if let Ok(page_pattern) =
        Regex::new(r"(?m)^[\s]*[-=]+[\s]*(?:Page[\s]*)?(\d+)[\s]*[-=]+[\s]*$")
    {
        let pages: Vec<String> = page_pattern
            .split(text)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        if pages.len() > 1 {
            return pages;
        }
    }

    vec![text.trim().to_string()]
}

// ============================================================================
// Tests
// ============================================================================
