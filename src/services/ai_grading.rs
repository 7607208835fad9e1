use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::core::config::Settings;

const GRADING_SYSTEM_PROMPT: &str = r#"You are an experienced examiner grading a student's answer sheet.

You receive two PDF documents: the exam paper and the student's scanned answer sheet,
followed by the grading rubric and the answer key. Grade every question on the exam
strictly according to the rubric, using the answer key as the reference solution.

Rules:
- Produce exactly one entry per question on the exam, numbered as on the exam paper.
- Scores are numbers with at most two decimal places and never exceed the rubric maximum.
- Feedback is addressed to the student, explains lost points and is concise.
- If an answer is missing or unreadable, award 0 for that question and say so in the feedback.

Response format (strict JSON, no prose outside the object):
{
  "questions": [
    {"number": 1, "score": 7.50, "feedback": "..."}
  ]
}
"#;

/// A source document resolved from the file store, shared cheaply across grading tasks.
#[derive(Debug, Clone)]
pub(crate) struct Document {
    pub(crate) handle: String,
    pub(crate) content: Arc<[u8]>,
}

impl Document {
    pub(crate) fn new(handle: impl Into<String>, content: Vec<u8>) -> Self {
        Self { handle: handle.into(), content: content.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct QuestionScore {
    pub(crate) number: u32,
    pub(crate) score: f64,
    pub(crate) feedback: String,
}

/// Per-question decomposition returned by a grading capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct GradedSheet {
    pub(crate) questions: Vec<QuestionScore>,
}

/// Grades one answer sheet against an exam's rubric and answer key.
#[async_trait]
pub(crate) trait GradingCapability: Send + Sync {
    async fn grade_one(
        &self,
        exam: &Document,
        answer: &Document,
        rubric: &str,
        answer_key: &str,
    ) -> Result<GradedSheet>;
}

#[derive(Debug, Clone)]
pub(crate) struct AiGradingService {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    max_retries: u32,
    retry_backoff: Duration,
}

impl AiGradingService {
    pub(crate) fn from_settings(settings: &Settings) -> Result<Self> {
        let timeout = Duration::from_secs(settings.ai().ai_request_timeout);
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_key: settings.ai().openai_api_key.clone(),
            base_url: settings.ai().openai_base_url.trim_end_matches('/').to_string(),
            model: settings.ai().ai_model.clone(),
            max_tokens: settings.ai().ai_max_tokens,
            max_retries: settings.ai().ai_max_retries,
            retry_backoff: Duration::from_secs(1),
        })
    }

    fn build_payload(
        &self,
        exam: &Document,
        answer: &Document,
        rubric: &str,
        answer_key: &str,
    ) -> Value {
        let user_prompt = format!(
            "Grading rubric:\n{rubric}\n\nAnswer key:\n{answer_key}\n\n\
             The first attached PDF is the exam paper, the second is the student's answer sheet.\n\
             Grade every question and answer with the JSON format from the system prompt."
        );

        json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": GRADING_SYSTEM_PROMPT},
                {"role": "user", "content": [
                    {"type": "text", "text": user_prompt},
                    pdf_part("exam.pdf", &exam.content),
                    pdf_part("answer.pdf", &answer.content),
                ]}
            ],
            "max_completion_tokens": self.max_tokens,
            "temperature": 0,
            "response_format": {"type": "json_object"}
        })
    }
}

#[async_trait]
impl GradingCapability for AiGradingService {
    async fn grade_one(
        &self,
        exam: &Document,
        answer: &Document,
        rubric: &str,
        answer_key: &str,
    ) -> Result<GradedSheet> {
        let timer = Instant::now();
        let payload = self.build_payload(exam, answer, rubric, answer_key);
        let url = format!("{}/chat/completions", self.base_url);

        tracing::debug!(
            answer_file = %answer.handle,
            model = %self.model,
            "Sending grading request"
        );

        let mut last_error = None;
        let mut body = Value::Null;

        for attempt in 0..=self.max_retries {
            let response = self
                .client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(&payload)
                .send()
                .await;

            match response {
                Ok(resp) => {
                    let status = resp.status();
                    body = resp.json().await.unwrap_or(Value::Null);
                    if status.is_success() {
                        last_error = None;
                        break;
                    }
                    last_error = Some(anyhow::anyhow!("Grading API returned {status}: {body}"));
                    if status.is_client_error() && status != reqwest::StatusCode::TOO_MANY_REQUESTS
                    {
                        break;
                    }
                }
                Err(err) => {
                    last_error = Some(anyhow::anyhow!(err).context("Failed to call grading API"));
                }
            }

            if attempt < self.max_retries {
                tokio::time::sleep(self.retry_backoff * 2_u32.pow(attempt.min(5))).await;
            }
        }

        if let Some(err) = last_error {
            return Err(err);
        }

        let content = body
            .get("choices")
            .and_then(|choices| choices.get(0))
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(|value| value.as_str())
            .context("Missing grading response content")?;

        let graded = parse_grading_response(content)?;

        let tokens_used = body
            .get("usage")
            .and_then(|usage| usage.get("total_tokens"))
            .and_then(|value| value.as_u64());

        tracing::info!(
            answer_file = %answer.handle,
            questions = graded.questions.len(),
            duration_seconds = timer.elapsed().as_secs_f64(),
            tokens_used = tokens_used,
            "Grading response received"
        );

        Ok(graded)
    }
}

fn pdf_part(filename: &str, content: &[u8]) -> Value {
    json!({
        "type": "file",
        "file": {
            "filename": filename,
            "file_data": format!("data:application/pdf;base64,{}", STANDARD.encode(content)),
        }
    })
}

/// Models occasionally wrap the object in a Markdown code fence despite `json_object` mode.
pub(crate) fn parse_grading_response(content: &str) -> Result<GradedSheet> {
    let trimmed = content.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    serde_json::from_str::<GradedSheet>(unfenced).context("Malformed grading response")
}
