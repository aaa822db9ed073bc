//! 설정 모듈
//!
//! 환경변수(및 `.env`)에서 자격 증명과 파이프라인 파라미터를 읽습니다.
//! 잘못된 설정은 즉시 `ConfigError` 로 실패합니다.

use std::path::PathBuf;

use url::Url;

use crate::error::ConfigError;
use crate::knowledge::ChunkConfig;
use crate::llm::GROQ_BASE_URL;
use crate::search::{DEFAULT_WEB_TOP_K, TAVILY_BASE_URL};

/// 라우터 기본 모델 (빠른 소형 모델)
pub const DEFAULT_ROUTER_MODEL: &str = "llama3-8b-8192";
/// 답변 생성 기본 모델
pub const DEFAULT_ANSWER_MODEL: &str = "llama-3.3-70b-versatile";
/// PDF 검색 기본 결과 수
pub const DEFAULT_PDF_TOP_K: usize = 3;

// ============================================================================
// Data Directory
// ============================================================================

/// 데이터 디렉토리 경로 (~/.carag/)
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".carag")
}

// ============================================================================
// PipelineConfig
// ============================================================================

/// 파이프라인 파라미터
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub chunk: ChunkConfig,
    /// PDF 경로에서 가져올 청크 수
    pub pdf_top_k: usize,
    /// WEB 경로에서 가져올 검색 결과 수
    pub web_top_k: usize,
    pub router_model: String,
    pub answer_model: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk: ChunkConfig::default(),
            pdf_top_k: DEFAULT_PDF_TOP_K,
            web_top_k: DEFAULT_WEB_TOP_K,
            router_model: DEFAULT_ROUTER_MODEL.to_string(),
            answer_model: DEFAULT_ANSWER_MODEL.to_string(),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.chunk.validate()?;

        if self.pdf_top_k == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "CARAG_PDF_TOP_K",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.web_top_k == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "CARAG_WEB_TOP_K",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// Settings
// ============================================================================

/// 전체 설정
#[derive(Debug, Clone)]
pub struct Settings {
    pub groq_api_key: Option<String>,
    pub tavily_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub groq_base_url: String,
    pub tavily_base_url: String,
    pub embedding_dimension: usize,
    pub data_dir: PathBuf,
    pub pipeline: PipelineConfig,
}

impl Settings {
    /// 프로세스 환경변수에서 읽기
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 임의의 조회 함수로 읽기
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        // GEMINI_API_KEY > GOOGLE_AI_API_KEY
        let gemini_api_key = get("GEMINI_API_KEY").or_else(|| get("GOOGLE_AI_API_KEY"));

        let pipeline = PipelineConfig {
            chunk: ChunkConfig {
                size: parse_usize(&get, "CARAG_CHUNK_SIZE")?
                    .unwrap_or(crate::knowledge::DEFAULT_CHUNK_SIZE),
                overlap: parse_usize(&get, "CARAG_CHUNK_OVERLAP")?
                    .unwrap_or(crate::knowledge::DEFAULT_CHUNK_OVERLAP),
            },
            pdf_top_k: parse_usize(&get, "CARAG_PDF_TOP_K")?.unwrap_or(DEFAULT_PDF_TOP_K),
            web_top_k: parse_usize(&get, "CARAG_WEB_TOP_K")?.unwrap_or(DEFAULT_WEB_TOP_K),
            router_model: get("CARAG_ROUTER_MODEL")
                .unwrap_or_else(|| DEFAULT_ROUTER_MODEL.to_string()),
            answer_model: get("CARAG_ANSWER_MODEL")
                .unwrap_or_else(|| DEFAULT_ANSWER_MODEL.to_string()),
        };
        pipeline.validate()?;

        let settings = Self {
            groq_api_key: get("GROQ_API_KEY"),
            tavily_api_key: get("TAVILY_API_KEY"),
            gemini_api_key,
            groq_base_url: parse_url(&get, "GROQ_BASE_URL", GROQ_BASE_URL)?,
            tavily_base_url: parse_url(&get, "TAVILY_BASE_URL", TAVILY_BASE_URL)?,
            embedding_dimension: parse_usize(&get, "CARAG_EMBEDDING_DIM")?
                .unwrap_or(crate::embedding::DEFAULT_DIMENSION),
            data_dir: get("CARAG_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(default_data_dir),
            pipeline,
        };

        tracing::debug!(
            "Loaded settings (chunk {}/{}, data dir {:?})",
            settings.pipeline.chunk.size,
            settings.pipeline.chunk.overlap,
            settings.data_dir
        );

        Ok(settings)
    }

    pub fn groq_key(&self) -> Result<&str, ConfigError> {
        self.groq_api_key
            .as_deref()
            .ok_or(ConfigError::MissingCredential("GROQ_API_KEY"))
    }

    pub fn tavily_key(&self) -> Result<&str, ConfigError> {
        self.tavily_api_key
            .as_deref()
            .ok_or(ConfigError::MissingCredential("TAVILY_API_KEY"))
    }

    pub fn gemini_key(&self) -> Result<&str, ConfigError> {
        self.gemini_api_key
            .as_deref()
            .ok_or(ConfigError::MissingCredential("GEMINI_API_KEY or GOOGLE_AI_API_KEY"))
    }
}

fn parse_usize<F>(get: &F, name: &'static str) -> Result<Option<usize>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    get(name)
        .map(|raw| {
            raw.trim()
                .parse::<usize>()
                .map_err(|e| ConfigError::InvalidSetting {
                    name,
                    reason: format!("{:?}: {}", raw, e),
                })
        })
        .transpose()
}

fn parse_url<F>(get: &F, name: &'static str, default: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = get(name) else {
        return Ok(default.to_string());
    };

    let url = Url::parse(raw.trim()).map_err(|e| ConfigError::InvalidSetting {
        name,
        reason: format!("{:?}: {}", raw, e),
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidSetting {
            name,
            reason: format!("unsupported scheme {}", url.scheme()),
        });
    }

    Ok(raw.trim().trim_end_matches('/').to_string())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings_from(pairs: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|name| env.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let settings = settings_from(&[]).expect("defaults are valid");
        assert_eq!(settings.pipeline, PipelineConfig::default());
        assert_eq!(settings.groq_base_url, GROQ_BASE_URL);
        assert_eq!(settings.embedding_dimension, 768);
        assert!(settings.groq_api_key.is_none());
        assert!(matches!(
            settings.groq_key(),
            Err(ConfigError::MissingCredential("GROQ_API_KEY"))
        ));
    }

    #[test]
    fn test_gemini_key_priority() {
        let settings = settings_from(&[
            ("GEMINI_API_KEY", "primary"),
            ("GOOGLE_AI_API_KEY", "fallback"),
        ])
        .expect("valid");
        assert_eq!(settings.gemini_key().ok(), Some("primary"));

        let settings = settings_from(&[("GEMINI_API_KEY", " "), ("GOOGLE_AI_API_KEY", "fallback")])
            .expect("valid");
        assert_eq!(settings.gemini_key().ok(), Some("fallback"));
    }

    #[test]
    fn test_chunk_overrides() {
        let settings = settings_from(&[("CARAG_CHUNK_SIZE", "500"), ("CARAG_CHUNK_OVERLAP", "50")])
            .expect("valid");
        assert_eq!(settings.pipeline.chunk, ChunkConfig { size: 500, overlap: 50 });
    }

    #[test]
    fn test_invalid_chunking_is_fatal() {
        let result = settings_from(&[("CARAG_CHUNK_SIZE", "100"), ("CARAG_CHUNK_OVERLAP", "100")]);
        assert!(matches!(result, Err(ConfigError::InvalidChunking { .. })));
    }

    #[test]
    fn test_non_numeric_setting() {
        let result = settings_from(&[("CARAG_PDF_TOP_K", "three")]);
        assert!(matches!(
            result,
            Err(ConfigError::InvalidSetting { name: "CARAG_PDF_TOP_K", .. })
        ));
    }

    #[test]
    fn test_zero_top_k_rejected() {
        let result = settings_from(&[("CARAG_WEB_TOP_K", "0")]);
        assert!(result.is_err());
    }

    #[test]
    fn test_base_url_override() {
        let settings = settings_from(&[("GROQ_BASE_URL", "http://localhost:8080/v1/")])
            .expect("valid");
        assert_eq!(settings.groq_base_url, "http://localhost:8080/v1");

        let result = settings_from(&[("TAVILY_BASE_URL", "ftp://example.org")]);
        assert!(result.is_err());

        let result = settings_from(&[("TAVILY_BASE_URL", "not a url")]);
        assert!(result.is_err());
    }
}
