use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request},
    Router,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::api;
use crate::core::{config::Settings, state::AppState, time::primitive_now_utc};
use crate::db::models::{AnswerSheet, Exam};
use crate::repositories;
use crate::services::ai_grading::{Document, GradedSheet, GradingCapability, QuestionScore};
use crate::services::storage::LocalFileStore;

pub(crate) struct TestContext {
    pub(crate) state: AppState,
    pub(crate) app: Router,
    pub(crate) grader: Arc<ScriptedGrader>,
    _guard: OwnedMutexGuard<()>,
}

pub(crate) async fn env_lock() -> OwnedMutexGuard<()> {
    static LOCK: OnceLock<Arc<Mutex<()>>> = OnceLock::new();
    let lock = LOCK.get_or_init(|| Arc::new(Mutex::new(()))).clone();
    lock.lock_owned().await
}

pub(crate) fn set_test_env() {
    std::env::set_var("GRADER_ENV", "test");
    std::env::set_var("GRADER_STRICT_CONFIG", "0");
    std::env::set_var("PROMETHEUS_ENABLED", "0");
    std::env::set_var("OPENAI_API_KEY", "test-key");
    std::env::remove_var("GRADER_PORT");
    std::env::remove_var("DATABASE_URL");
    std::env::remove_var("API_V1_STR");
    std::env::remove_var("MAX_UPLOAD_SIZE_MB");
    std::env::remove_var("MAX_UPLOAD_REQUEST_MB");
    std::env::remove_var("GRADING_MAX_CONCURRENCY");
}

pub(crate) fn temp_dir(prefix: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("exam-grader-{prefix}-{}", Uuid::new_v4()));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

/// A migrated database in a fresh temporary file; in-memory databases are
/// per-connection and would not survive the pool.
pub(crate) async fn test_pool() -> SqlitePool {
    let options = SqliteConnectOptions::new()
        .filename(temp_dir("db").join("grader.db"))
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(10));

    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await
        .expect("db pool");
    crate::db::run_migrations(&pool).await.expect("migrations");
    pool
}

pub(crate) async fn test_state(grader: Arc<dyn GradingCapability>) -> AppState {
    let settings = {
        let _guard = env_lock().await;
        set_test_env();
        Settings::load().expect("settings")
    };
    build_state(settings, grader).await
}

async fn build_state(settings: Settings, grader: Arc<dyn GradingCapability>) -> AppState {
    let db = test_pool().await;
    let files = Arc::new(LocalFileStore::new(temp_dir("files")));
    AppState::new(settings, db, files, grader)
}

pub(crate) async fn setup_test_context(grader: ScriptedGrader) -> TestContext {
    setup_test_context_with_env(grader, &[]).await
}

/// Like `setup_test_context`, with extra environment overrides applied while settings load.
pub(crate) async fn setup_test_context_with_env(
    grader: ScriptedGrader,
    overrides: &[(&str, &str)],
) -> TestContext {
    let guard = env_lock().await;
    set_test_env();
    for (key, value) in overrides {
        std::env::set_var(key, value);
    }

    let settings = Settings::load().expect("settings");
    set_test_env();
    let grader = Arc::new(grader);
    let state = build_state(settings, grader.clone()).await;
    let app = api::router::router(state.clone());

    TestContext { state, app, grader, _guard: guard }
}

pub(crate) async fn insert_exam(
    pool: &SqlitePool,
    name: &str,
    rubric: &str,
    answer_key: &str,
) -> Exam {
    repositories::exams::create(
        pool,
        repositories::exams::CreateExam {
            id: &Uuid::new_v4().to_string(),
            name,
            description: None,
            rubric,
            answer_key,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .expect("insert exam")
}

pub(crate) async fn insert_sheet(
    pool: &SqlitePool,
    exam_id: &str,
    name: &str,
    answer_file: &str,
) -> AnswerSheet {
    repositories::answer_sheets::create(
        pool,
        repositories::answer_sheets::CreateAnswerSheet {
            id: &Uuid::new_v4().to_string(),
            exam_id,
            name,
            answer_file,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .expect("insert answer sheet")
}

/// A minimal PDF-looking payload whose second line carries `label`.
pub(crate) fn pdf(label: &str) -> Vec<u8> {
    format!("%PDF-1.7\n% {label}\n%%EOF\n").into_bytes()
}

fn label_of(content: &[u8]) -> String {
    String::from_utf8_lossy(content)
        .lines()
        .nth(1)
        .map(|line| line.trim_start_matches('%').trim().to_string())
        .unwrap_or_default()
}

#[derive(Clone)]
enum Script {
    Scores(Vec<QuestionScore>),
    Fail(String),
    Panic,
}

/// Grading capability double. Answers are looked up by the label embedded
/// with [`pdf`], so the same script works whatever handle a file was stored under.
#[derive(Default)]
pub(crate) struct ScriptedGrader {
    scripts: HashMap<String, Script>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedGrader {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_scores(mut self, label: &str, questions: &[(u32, f64, &str)]) -> Self {
        let questions = questions
            .iter()
            .map(|(number, score, feedback)| QuestionScore {
                number: *number,
                score: *score,
                feedback: feedback.to_string(),
            })
            .collect();
        self.scripts.insert(label.to_string(), Script::Scores(questions));
        self
    }

    pub(crate) fn with_failure(mut self, label: &str, message: &str) -> Self {
        self.scripts.insert(label.to_string(), Script::Fail(message.to_string()));
        self
    }

    pub(crate) fn with_panic(mut self, label: &str) -> Self {
        self.scripts.insert(label.to_string(), Script::Panic);
        self
    }

    pub(crate) fn with_delay_ms(mut self, millis: u64) -> Self {
        self.delay = Some(Duration::from_millis(millis));
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GradingCapability for ScriptedGrader {
    async fn grade_one(
        &self,
        _exam: &Document,
        answer: &Document,
        rubric: &str,
        answer_key: &str,
    ) -> anyhow::Result<GradedSheet> {
        assert!(!rubric.is_empty() && !answer_key.is_empty());

        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let label = label_of(&answer.content);
        match self.scripts.get(&label).cloned() {
            Some(Script::Scores(questions)) => Ok(GradedSheet { questions }),
            Some(Script::Fail(message)) => Err(anyhow::anyhow!(message)),
            Some(Script::Panic) => panic!("scripted grader panic for {label}"),
            None => Err(anyhow::anyhow!("no script for {label}")),
        }
    }
}

pub(crate) fn json_request(
    method: Method,
    uri: &str,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let builder = Request::builder().method(method).uri(uri);

    if let Some(body) = body {
        let bytes = serde_json::to_vec(&body).expect("serialize body");
        builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(bytes))
            .expect("request body")
    } else {
        builder.body(Body::empty()).expect("request body")
    }
}

pub(crate) struct UploadPart<'a> {
    pub(crate) field: &'a str,
    pub(crate) filename: Option<&'a str>,
    pub(crate) content_type: Option<&'a str>,
    pub(crate) bytes: Vec<u8>,
}

impl<'a> UploadPart<'a> {
    pub(crate) fn pdf(filename: &'a str, bytes: Vec<u8>) -> Self {
        Self {
            field: "file",
            filename: Some(filename),
            content_type: Some("application/pdf"),
            bytes,
        }
    }

    pub(crate) fn text(field: &'a str, value: &str) -> Self {
        Self { field, filename: None, content_type: None, bytes: value.as_bytes().to_vec() }
    }
}

pub(crate) fn multipart_request(
    method: Method,
    uri: &str,
    parts: Vec<UploadPart<'_>>,
) -> Request<Body> {
    let boundary = format!("----exam-grader-{}", Uuid::new_v4().simple());
    let mut body = Vec::new();

    for part in parts {
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        let mut disposition = format!("Content-Disposition: form-data; name=\"{}\"", part.field);
        if let Some(filename) = part.filename {
            disposition.push_str(&format!("; filename=\"{filename}\""));
        }
        body.extend_from_slice(disposition.as_bytes());
        body.extend_from_slice(b"\r\n");
        if let Some(content_type) = part.content_type {
            body.extend_from_slice(format!("Content-Type: {content_type}\r\n").as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(&part.bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={boundary}"))
        .body(Body::from(body))
        .expect("multipart body")
}

pub(crate) async fn read_json(response: axum::response::Response<Body>) -> serde_json::Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.expect("response body");
    serde_json::from_slice(&body).unwrap_or_else(|err| {
        let body_text = String::from_utf8_lossy(&body);
        panic!("json parse: {err}; body: {body_text}");
    })
}

pub(crate) async fn read_bytes(response: axum::response::Response<Body>) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX).await.expect("response body").to_vec()
}
