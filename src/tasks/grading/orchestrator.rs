use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::Instrument;

use crate::core::grading_locks::BatchProgress;
use crate::services::ai_grading::{Document, GradingCapability};
use crate::services::scoring::{self, SheetTotal};

/// Everything one batch grades against. The rubric and answer key are captured
/// here once, so edits made while the batch runs do not leak into it.
pub(crate) struct BatchInput {
    pub(crate) exam: Document,
    pub(crate) rubric: String,
    pub(crate) answer_key: String,
    pub(crate) sheets: Vec<(String, Document)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub(crate) enum GradeResult {
    Graded { id: String, score: f64, feedback: String },
    Failed { id: String, error: String },
}

impl GradeResult {
    pub(crate) fn id(&self) -> &str {
        match self {
            GradeResult::Graded { id, .. } | GradeResult::Failed { id, .. } => id,
        }
    }

    pub(crate) fn is_graded(&self) -> bool {
        matches!(self, GradeResult::Graded { .. })
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum ContractError {
    #[error("exam rubric must not be empty")]
    EmptyRubric,
    #[error("exam answer key must not be empty")]
    EmptyAnswerKey,
}

pub(crate) fn validate_contract(rubric: &str, answer_key: &str) -> Result<(), ContractError> {
    if rubric.trim().is_empty() {
        return Err(ContractError::EmptyRubric);
    }
    if answer_key.trim().is_empty() {
        return Err(ContractError::EmptyAnswerKey);
    }
    Ok(())
}

/// Grades every sheet of `input`, one task per sheet, and returns one result per
/// sheet in input order.
///
/// All tasks are spawned up front; `max_concurrency` only bounds how many are
/// talking to the grading capability at once. A failing or panicking task turns
/// into a `Failed` result for its own sheet and nothing else.
pub(crate) async fn grade_batch(
    grader: Arc<dyn GradingCapability>,
    input: BatchInput,
    max_concurrency: Option<usize>,
    progress: Arc<BatchProgress>,
) -> Result<Vec<GradeResult>, ContractError> {
    validate_contract(&input.rubric, &input.answer_key)?;

    let limiter = max_concurrency.map(|limit| Arc::new(Semaphore::new(limit.max(1))));
    let exam = input.exam;
    let rubric: Arc<str> = input.rubric.into();
    let answer_key: Arc<str> = input.answer_key.into();

    progress.start(input.sheets.len());

    let mut ids = Vec::with_capacity(input.sheets.len());
    let mut handles = Vec::with_capacity(input.sheets.len());

    for (sheet_id, answer) in input.sheets {
        let grader = grader.clone();
        let limiter = limiter.clone();
        let exam = exam.clone();
        let rubric = rubric.clone();
        let answer_key = answer_key.clone();
        let progress = progress.clone();
        let span = tracing::info_span!("grade_sheet", sheet_id = %sheet_id);

        handles.push(tokio::spawn(
            async move {
                let _permit = match limiter {
                    Some(semaphore) => Some(
                        semaphore
                            .acquire_owned()
                            .await
                            .map_err(|_| "grading limiter closed".to_string())?,
                    ),
                    None => None,
                };

                let outcome = grade_single(&*grader, &exam, &answer, &rubric, &answer_key).await;
                progress.record(outcome.is_ok());
                outcome
            }
            .instrument(span),
        ));
        ids.push(sheet_id);
    }

    let settled = join_all(handles).await;

    let results = ids
        .into_iter()
        .zip(settled)
        .map(|(id, joined)| match joined {
            Ok(Ok(total)) => {
                GradeResult::Graded { id, score: total.score, feedback: total.feedback }
            }
            Ok(Err(error)) => {
                tracing::warn!(sheet_id = %id, error = %error, "Grading failed");
                GradeResult::Failed { id, error }
            }
            Err(join_err) => {
                tracing::error!(sheet_id = %id, error = %join_err, "Grading task aborted");
                progress.record(false);
                metrics::counter!("grading_jobs_total", "status" => "aborted").increment(1);
                GradeResult::Failed { id, error: "Grading task aborted unexpectedly".to_string() }
            }
        })
        .collect::<Vec<_>>();

    tracing::debug!(
        total = results.len(),
        graded = results.iter().filter(|result| result.is_graded()).count(),
        "Grading tasks settled"
    );

    Ok(results)
}

async fn grade_single(
    grader: &dyn GradingCapability,
    exam: &Document,
    answer: &Document,
    rubric: &str,
    answer_key: &str,
) -> Result<SheetTotal, String> {
    let timer = Instant::now();

    let outcome = match grader.grade_one(exam, answer, rubric, answer_key).await {
        Ok(graded) => scoring::aggregate(&graded).map_err(|err| err.to_string()),
        Err(err) => Err(format!("{err:#}")),
    };

    let status = if outcome.is_ok() { "success" } else { "failed" };
    metrics::counter!("grading_jobs_total", "status" => status).increment(1);
    metrics::histogram!("grading_duration_seconds").record(timer.elapsed().as_secs_f64());

    outcome
}
