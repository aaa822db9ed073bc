//! CLI 모듈
//!
//! carag CLI 명령어 정의 및 구현

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::agent::{Answer, Pipeline, Session};
use crate::config::Settings;
use crate::extractor::load_document;
use crate::history::SqliteHistoryStore;
use crate::knowledge::fingerprint;

/// 사용자 미지정 시 기본 이름
const DEFAULT_USER: &str = "guest";

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Parser)]
#[command(name = "carag")]
#[command(version, about = "PDF 문서와 웹 검색을 오가는 에이전틱 RAG", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 질문 하나에 답변
    Ask {
        /// 질문
        question: String,

        /// 질문 전에 인덱싱할 문서 (.pdf, .txt, .md)
        #[arg(short, long)]
        doc: Option<PathBuf>,

        /// 사용자 이름 (기록 저장용)
        #[arg(short, long, default_value = DEFAULT_USER)]
        user: String,

        /// 근거 전문 출력
        #[arg(long)]
        show_context: bool,
    },

    /// 대화형 세션
    Chat {
        /// 시작 시 인덱싱할 문서
        #[arg(short, long)]
        doc: Option<PathBuf>,

        /// 사용자 이름 (기록 저장용)
        #[arg(short, long, default_value = DEFAULT_USER)]
        user: String,

        /// 근거 전문 출력
        #[arg(long)]
        show_context: bool,
    },

    /// 저장된 질의응답 기록
    History {
        /// 사용자 이름
        #[arg(short, long, default_value = DEFAULT_USER)]
        user: String,

        /// CSV로 내보낼 경로
        #[arg(long)]
        csv: Option<PathBuf>,

        /// 최근 N건만 표시
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// 상태 확인
    Status,
}

// ============================================================================
// CLI Runner
// ============================================================================

/// CLI 명령어 실행
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Ask {
            question,
            doc,
            user,
            show_context,
        } => cmd_ask(&question, doc, user, show_context).await,
        Commands::Chat {
            doc,
            user,
            show_context,
        } => cmd_chat(doc, user, show_context).await,
        Commands::History { user, csv, limit } => cmd_history(&user, csv, limit),
        Commands::Status => cmd_status(),
    }
}

// ============================================================================
// Command Implementations
// ============================================================================

/// 파이프라인 생성 (자격 증명 누락 시 설정 방법 안내)
fn build_pipeline() -> Result<Pipeline> {
    let settings = Settings::from_env().context("설정 읽기 실패")?;

    Pipeline::from_settings(&settings).with_context(|| {
        "파이프라인 초기화 실패\n\n\
         필요한 환경변수:\n  \
         GROQ_API_KEY      (답변/라우팅 LLM)\n  \
         TAVILY_API_KEY    (웹 검색)\n  \
         GEMINI_API_KEY    (임베딩, 또는 GOOGLE_AI_API_KEY)"
    })
}

/// 단일 질문 명령어 (ask)
async fn cmd_ask(
    question: &str,
    doc: Option<PathBuf>,
    user: String,
    show_context: bool,
) -> Result<()> {
    if question.trim().is_empty() {
        bail!("질문이 비어 있습니다");
    }

    let pipeline = build_pipeline()?;
    let session = Arc::new(Session::new(user));

    if let Some(ref path) = doc {
        load_into(&pipeline, &session, path).await;
    }

    let answer = pipeline.answer_question(&session, question).await;
    render_answer(answer, show_context).await
}

/// 대화형 명령어 (chat)
///
/// `/load <파일>`, `/reset`, `/quit` 을 지원합니다.
async fn cmd_chat(doc: Option<PathBuf>, user: String, show_context: bool) -> Result<()> {
    let pipeline = build_pipeline()?;
    let session = Arc::new(Session::new(user));

    if let Some(ref path) = doc {
        load_into(&pipeline, &session, path).await;
    }

    println!("[*] 대화를 시작합니다 ({}). /load <파일>, /reset, /quit", session.user());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\n> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await.context("입력 읽기 실패")? else {
            break;
        };
        let line = line.trim();

        if line.is_empty() {
            continue;
        }
        if line == "/quit" || line == "/exit" {
            break;
        }
        if line == "/reset" {
            session.reset();
            println!("[OK] 대화 기록과 문서를 비웠습니다");
            continue;
        }
        if let Some(path) = load_argument(line) {
            if path.is_empty() {
                println!("[!] 사용법: /load <파일>");
            } else {
                load_into(&pipeline, &session, Path::new(path)).await;
            }
            continue;
        }

        let answer = pipeline.answer_question(&session, line).await;
        render_answer(answer, show_context).await?;
    }

    println!("[OK] 종료합니다");
    Ok(())
}

/// 문서를 세션에 로드
///
/// 같은 문서(지문 동일)가 이미 인덱싱되어 있으면 건너뜁니다.
/// 실패하면 세션은 웹 검색 전용이 됩니다.
async fn load_into(pipeline: &Pipeline, session: &Session, path: &Path) {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string();

    println!("[*] 문서 읽는 중: {}", path.display());

    let text = match load_document(path).await {
        Ok(text) => text,
        Err(e) => {
            session.replace_index(None);
            println!("[!] 문서를 읽지 못했습니다: {}", e);
            println!("    웹 검색만 사용합니다.");
            return;
        }
    };

    if let Some(handle) = session.index_handle() {
        if handle.fingerprint == fingerprint(&text) {
            println!("[OK] 이미 인덱싱된 문서입니다 ({} 청크)", handle.chunk_count);
            return;
        }
    }

    println!(
        "[*] 청크 분할 및 임베딩 생성 중... ({})",
        format_bytes(text.len())
    );

    match pipeline
        .ingest_document(session, &text, Some(file_name))
        .await
    {
        Ok(handle) => {
            println!(
                "[OK] 문서 인덱싱 완료: {} 청크, {} 차원",
                handle.chunk_count, handle.dimension
            );
        }
        Err(e) => {
            println!("[!] 인덱싱 실패: {}", e);
            println!("    웹 검색만 사용합니다.");
        }
    }
}

/// 답변 스트리밍 출력 + 근거 목록
async fn render_answer(mut answer: Answer, show_context: bool) -> Result<()> {
    println!("[*] 검색 소스: {}\n", answer.source().label());

    let mut stdout = std::io::stdout();
    while let Some(token) = answer.next().await {
        write!(stdout, "{}", token)?;
        stdout.flush()?;
    }
    println!();

    let passages = answer.passages();
    if passages.is_empty() {
        println!("\n[!] 사용된 근거가 없습니다.");
        return Ok(());
    }

    println!();
    for (i, passage) in passages.iter().enumerate() {
        if show_context {
            println!("Source {}: {}", i + 1, passage);
        } else {
            println!("Source {}: {}", i + 1, truncate_text(passage, 200));
        }
    }

    Ok(())
}

/// 기록 명령어 (history)
fn cmd_history(user: &str, csv: Option<PathBuf>, limit: Option<usize>) -> Result<()> {
    let settings = Settings::from_env().context("설정 읽기 실패")?;
    let store =
        SqliteHistoryStore::open_in(&settings.data_dir).context("기록 저장소 열기 실패")?;

    if let Some(ref path) = csv {
        let file = std::fs::File::create(path)
            .with_context(|| format!("파일 생성 실패: {}", path.display()))?;
        let count = store
            .export_csv(user, std::io::BufWriter::new(file))
            .context("CSV 내보내기 실패")?;
        println!("[OK] {} 건을 내보냈습니다: {}", count, path.display());
        return Ok(());
    }

    let records = store
        .list_for_user(user, limit)
        .context("기록 조회 실패")?;

    if records.is_empty() {
        println!("[!] {} 의 기록이 없습니다.", user);
        return Ok(());
    }

    println!("[OK] {} 의 기록 ({} 건):\n", user, records.len());

    for (i, record) in records.iter().enumerate() {
        println!(
            "{}. [{}]",
            i + 1,
            record.timestamp.format("%Y-%m-%d %H:%M")
        );
        println!("   Q: {}", truncate_text(&record.question, 120));
        println!("   A: {}", truncate_text(&record.answer, 200));
        println!();
    }

    Ok(())
}

/// 상태 명령어 (status)
fn cmd_status() -> Result<()> {
    println!("carag v{}", env!("CARGO_PKG_VERSION"));
    println!();

    let settings = Settings::from_env().context("설정 읽기 실패")?;

    println!("[*] 데이터 디렉토리: {}", settings.data_dir.display());
    println!(
        "[*] 청크: {} 자 / 겹침 {} 자, PDF top-k {}, WEB top-k {}",
        settings.pipeline.chunk.size,
        settings.pipeline.chunk.overlap,
        settings.pipeline.pdf_top_k,
        settings.pipeline.web_top_k
    );

    // API 키 상태
    let credentials = [
        ("GROQ_API_KEY", settings.groq_key().is_ok()),
        ("TAVILY_API_KEY", settings.tavily_key().is_ok()),
        ("GEMINI_API_KEY", settings.gemini_key().is_ok()),
    ];
    for (name, present) in credentials {
        if present {
            println!("[OK] {}: 설정됨", name);
        } else {
            println!("[!] {}: 미설정", name);
        }
    }

    // 기록 저장소
    match SqliteHistoryStore::open_in(&settings.data_dir) {
        Ok(store) => match store.stats() {
            Ok(stats) => {
                let size = std::fs::metadata(&stats.db_path)
                    .map(|m| m.len() as usize)
                    .unwrap_or(0);
                println!(
                    "[OK] 저장된 기록: {} 건 (사용자 {} 명, {})",
                    stats.record_count,
                    stats.user_count,
                    format_bytes(size)
                );
            }
            Err(e) => {
                println!("[!] 통계 조회 실패: {}", e);
            }
        },
        Err(e) => {
            println!("[!] 기록 저장소 열기 실패: {}", e);
        }
    }

    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

/// 텍스트 자르기 (UTF-8 안전)
fn truncate_text(text: &str, max_chars: usize) -> String {
    let cleaned = text.replace('\n', " ").replace('\r', "");
    let cleaned = cleaned.trim();

    if cleaned.chars().count() <= max_chars {
        cleaned.to_string()
    } else {
        let truncated: String = cleaned.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}

/// `/load <파일>` 명령의 인자 (명령이 아니면 None)
fn load_argument(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("/load")?;
    if rest.is_empty() || rest.starts_with(char::is_whitespace) {
        Some(rest.trim())
    } else {
        None
    }
}

/// 바이트 크기 포맷팅
fn format_bytes(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

// ============================================================================
// Tests
// ============================================================================
