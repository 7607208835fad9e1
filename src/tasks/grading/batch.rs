use std::collections::HashSet;
use std::time::Instant;

use thiserror::Error;

use crate::core::state::AppState;
use crate::db::models::AnswerSheet;
use crate::repositories::{answer_sheets, exams};
use crate::services::ai_grading::Document;
use crate::services::storage::{FileStore, StorageError};
use crate::tasks::grading::orchestrator::{self, BatchInput, ContractError, GradeResult};
use crate::tasks::grading::reconciler;

#[derive(Debug, Error)]
pub(crate) enum GradingError {
    #[error("Exam not found")]
    ExamNotFound,
    #[error("Exam is archived")]
    ExamArchived,
    #[error(transparent)]
    Contract(#[from] ContractError),
    #[error("Exam has no document attached")]
    MissingExamDocument,
    #[error("Answer sheet {0} does not belong to this exam")]
    UnknownSheet(String),
    #[error("A grading batch is already running for this exam")]
    BatchInProgress,
    #[error("Document {handle} could not be loaded: {source}")]
    DocumentUnavailable {
        handle: String,
        #[source]
        source: StorageError,
    },
    #[error("Grading batch aborted: {0}")]
    Aborted(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Default)]
pub(crate) struct GradeOptions {
    /// Regrade sheets that already carry a score.
    pub(crate) force: bool,
    /// Restrict the batch to these sheets; every id must belong to the exam.
    pub(crate) sheet_ids: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BatchSummary {
    pub(crate) requested: usize,
    pub(crate) successful: usize,
    pub(crate) failed: usize,
    pub(crate) results: Vec<GradeResult>,
}

impl BatchSummary {
    fn empty() -> Self {
        Self { requested: 0, successful: 0, failed: 0, results: Vec::new() }
    }
}

/// Sheets without a grade, or with a zero score, are due unless `force` is set.
pub(crate) fn needs_grading(sheet: &AnswerSheet, force: bool) -> bool {
    force || sheet.score.map_or(true, |score| score == 0.0)
}

pub(crate) fn select_for_grading(sheets: Vec<AnswerSheet>, force: bool) -> Vec<AnswerSheet> {
    sheets.into_iter().filter(|sheet| needs_grading(sheet, force)).collect()
}

fn restrict_to(
    sheets: Vec<AnswerSheet>,
    sheet_ids: &[String],
) -> Result<Vec<AnswerSheet>, GradingError> {
    let known: HashSet<&str> = sheets.iter().map(|sheet| sheet.id.as_str()).collect();
    if let Some(unknown) = sheet_ids.iter().find(|id| !known.contains(id.as_str())) {
        return Err(GradingError::UnknownSheet(unknown.clone()));
    }

    let wanted: HashSet<&str> = sheet_ids.iter().map(String::as_str).collect();
    Ok(sheets.into_iter().filter(|sheet| wanted.contains(sheet.id.as_str())).collect())
}

async fn resolve(files: &dyn FileStore, handle: &str) -> Result<Document, GradingError> {
    files.retrieve(handle).await.map(|bytes| Document::new(handle, bytes)).map_err(|source| {
        GradingError::DocumentUnavailable { handle: handle.to_string(), source }
    })
}

/// Grades the due answer sheets of one exam and persists the results.
///
/// Every document is loaded before the first grading call, so a missing file
/// aborts the batch without spending any model calls. The batch itself runs on
/// a detached task and finishes even if the caller goes away.
pub(crate) async fn grade_exam(
    state: &AppState,
    exam_id: &str,
    options: GradeOptions,
) -> Result<BatchSummary, GradingError> {
    let db = state.db();

    let exam = exams::find_by_id(db, exam_id).await?.ok_or(GradingError::ExamNotFound)?;
    if exam.status.is_archived() {
        return Err(GradingError::ExamArchived);
    }
    orchestrator::validate_contract(&exam.rubric, &exam.answer_key)?;

    let lease = state.grading_locks().try_acquire(&exam.id).ok_or(GradingError::BatchInProgress)?;

    let mut sheets = answer_sheets::list_by_exam(db, &exam.id).await?;
    if let Some(sheet_ids) = options.sheet_ids.as_deref() {
        sheets = restrict_to(sheets, sheet_ids)?;
    }

    let selected = select_for_grading(sheets, options.force);
    if selected.is_empty() {
        tracing::info!(
            exam_id = %exam.id,
            force = options.force,
            "No answer sheets due for grading"
        );
        return Ok(BatchSummary::empty());
    }

    let exam_handle = exam.exam_file.as_deref().ok_or(GradingError::MissingExamDocument)?;
    let exam_doc = resolve(state.files(), exam_handle).await?;

    let mut documents = Vec::with_capacity(selected.len());
    for sheet in &selected {
        documents.push((sheet.id.clone(), resolve(state.files(), &sheet.answer_file).await?));
    }

    let requested = documents.len();
    let timer = Instant::now();
    tracing::info!(
        exam_id = %exam.id,
        requested,
        force = options.force,
        "Starting grading batch"
    );

    let input = BatchInput {
        exam: exam_doc,
        rubric: exam.rubric,
        answer_key: exam.answer_key,
        sheets: documents,
    };
    let grader = state.grader();
    let max_concurrency = state.settings().grading().max_concurrency;
    let pool = db.clone();

    let batch = tokio::spawn(async move {
        let progress = lease.progress();
        let results = orchestrator::grade_batch(grader, input, max_concurrency, progress).await?;
        let reconciled = reconciler::reconcile(&pool, &results).await;
        drop(lease);
        Ok::<_, ContractError>((results, reconciled))
    });

    let (results, reconciled) =
        batch.await.map_err(|err| GradingError::Aborted(err.to_string()))??;

    let results = results
        .into_iter()
        .map(|result| {
            if reconciled.unwritten.iter().any(|id| id == result.id()) {
                GradeResult::Failed {
                    id: result.id().to_string(),
                    error: "Failed to save grading result".to_string(),
                }
            } else {
                result
            }
        })
        .collect();

    metrics::counter!("grading_batches_total").increment(1);
    tracing::info!(
        exam_id = %exam.id,
        requested,
        successful = reconciled.successful,
        failed = reconciled.failed,
        duration_seconds = timer.elapsed().as_secs_f64(),
        "Grading batch finished"
    );

    Ok(BatchSummary {
        requested,
        successful: reconciled.successful,
        failed: reconciled.failed,
        results,
    })
}
