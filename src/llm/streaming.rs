//! SSE 스트리밍 파서
//!
//! OpenAI 호환 채팅 완성 API의 `text/event-stream` 바이트 스트림을
//! 텍스트 토큰 스트림으로 변환합니다.
//!
//! - `data: {json}` 줄의 `choices[0].delta.content` 를 토큰으로 방출
//! - `data: [DONE]` 에서 종료
//! - 빈 줄, `event:`/`id:` 등 데이터가 아닌 줄은 무시
//! - 네트워크 청크 경계에서 잘린 줄은 바이트 단위로 버퍼링 (UTF-8 문자 분할 안전)

use std::pin::Pin;
use std::task::{Context, Poll};

use anyhow::{anyhow, Result};
use bytes::Bytes;
use futures::Stream;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Debug, Default, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

/// 파싱된 SSE 줄
enum SseLine {
    Token(String),
    Done,
    Skip,
}

/// 바이트 스트림 -> 토큰 스트림 어댑터
///
/// 드롭되면 내부 HTTP 응답 본문도 함께 해제됩니다.
pub struct SseTokenStream {
    inner: Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>,
    buffer: Vec<u8>,
    finished: bool,
}

impl SseTokenStream {
    pub fn new(byte_stream: impl Stream<Item = reqwest::Result<Bytes>> + Send + 'static) -> Self {
        Self {
            inner: Box::pin(byte_stream),
            buffer: Vec::new(),
            finished: false,
        }
    }

    /// 버퍼에서 완성된 줄 하나를 꺼내 해석
    fn next_buffered(&mut self) -> Option<Result<String>> {
        while let Some(newline) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            match parse_line(&line) {
                Ok(SseLine::Token(token)) => return Some(Ok(token)),
                Ok(SseLine::Done) => {
                    self.finished = true;
                    return None;
                }
                Ok(SseLine::Skip) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
        None
    }
}

impl Stream for SseTokenStream {
    type Item = Result<String>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if this.finished {
                return Poll::Ready(None);
            }

            if let Some(item) = this.next_buffered() {
                return Poll::Ready(Some(item));
            }
            if this.finished {
                return Poll::Ready(None);
            }

            match this.inner.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => this.buffer.extend_from_slice(&bytes),
                Poll::Ready(Some(Err(e))) => {
                    this.finished = true;
                    return Poll::Ready(Some(Err(anyhow!("Stream interrupted: {}", e))));
                }
                Poll::Ready(None) => {
                    // 마지막 줄에 개행이 없을 수 있음
                    this.finished = true;
                    if this.buffer.is_empty() {
                        return Poll::Ready(None);
                    }
                    let line = std::mem::take(&mut this.buffer);
                    return match parse_line(&line) {
                        Ok(SseLine::Token(token)) => Poll::Ready(Some(Ok(token))),
                        Ok(_) => Poll::Ready(None),
                        Err(e) => Poll::Ready(Some(Err(e))),
                    };
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// SSE 한 줄 해석
fn parse_line(raw: &[u8]) -> Result<SseLine> {
    let line = std::str::from_utf8(raw)
        .map_err(|e| anyhow!("Invalid UTF-8 in stream: {}", e))?
        .trim();

    let Some(data) = line.strip_prefix("data:") else {
        return Ok(SseLine::Skip);
    };
    let data = data.trim();

    if data == "[DONE]" {
        return Ok(SseLine::Done);
    }

    let chunk: StreamChunk = serde_json::from_str(data).map_err(|e| {
        anyhow!(
            "Failed to parse stream chunk: {} (data: {})",
            e,
            data.chars().take(200).collect::<String>()
        )
    })?;

    let token = chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .unwrap_or_default();

    if token.is_empty() {
        Ok(SseLine::Skip)
    } else {
        Ok(SseLine::Token(token))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn byte_stream(parts: &[&'static [u8]]) -> impl Stream<Item = reqwest::Result<Bytes>> {
        let parts: Vec<&'static [u8]> = parts.to_vec();
        futures::stream::iter(parts.into_iter().map(|p| Ok(Bytes::from_static(p))))
    }

    async fn collect(stream: SseTokenStream) -> Vec<String> {
        stream
            .map(|item| item.expect("token"))
            .collect::<Vec<_>>()
            .await
    }

    #[tokio::test]
    async fn test_parse_tokens_until_done() {
        let stream = SseTokenStream::new(byte_stream(&[
            b"data: {\"choices\":[{\"delta\":{\"content\":\"Hello\"}}]}\n\n",
            b"data: {\"choices\":[{\"delta\":{\"content\":\" world\"}}]}\n\n",
            b"data: [DONE]\n\n",
            b"data: {\"choices\":[{\"delta\":{\"content\":\"ignored\"}}]}\n\n",
        ]));

        assert_eq!(collect(stream).await, vec!["Hello", " world"]);
    }

    #[tokio::test]
    async fn test_line_split_across_chunks() {
        let stream = SseTokenStream::new(byte_stream(&[
            b"data: {\"choices\":[{\"delta\":",
            b"{\"content\":\"Hi\"}}]}\n",
            b"\ndata: [DONE]\n",
        ]));

        assert_eq!(collect(stream).await, vec!["Hi"]);
    }

    #[tokio::test]
    async fn test_multibyte_char_split_across_chunks() {
        // "세" = 0xEC 0x84 0xB8
        let stream = SseTokenStream::new(byte_stream(&[
            b"data: {\"choices\":[{\"delta\":{\"content\":\"\xEC\x84",
            b"\xB8\"}}]}\n",
        ]));

        assert_eq!(collect(stream).await, vec!["세"]);
    }

    #[tokio::test]
    async fn test_empty_delta_and_comments_skipped() {
        let stream = SseTokenStream::new(byte_stream(&[
            b": keep-alive\n",
            b"event: message\n",
            b"data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n",
            b"data: {\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\n",
        ]));

        assert_eq!(collect(stream).await, vec!["ok"]);
    }

    #[tokio::test]
    async fn test_malformed_chunk_is_error() {
        let mut stream = SseTokenStream::new(byte_stream(&[b"data: {not json}\n"]));
        let item = stream.next().await.expect("one item");
        assert!(item.is_err());
    }
}
