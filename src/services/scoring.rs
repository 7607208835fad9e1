use thiserror::Error;

use crate::services::ai_grading::GradedSheet;

const FEEDBACK_SEPARATOR: &str = "\n\n";

/// Largest sub-score accepted from a grading capability.
const MAX_QUESTION_SCORE: f64 = 1e9;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SheetTotal {
    pub(crate) score: f64,
    pub(crate) feedback: String,
}

#[derive(Debug, Error, PartialEq)]
pub(crate) enum ScoringError {
    #[error("grading response contained no questions")]
    NoQuestions,
    #[error("question {number} has invalid score {score}")]
    InvalidScore { number: u32, score: f64 },
    #[error("sheet total is out of range")]
    TotalOutOfRange,
}

/// Folds a per-question decomposition into a sheet total.
///
/// Sub-scores are rounded to hundredths and summed as integers, so the total is
/// exact under two-decimal arithmetic. Feedback follows question-number order,
/// one blank line between questions.
pub(crate) fn aggregate(graded: &GradedSheet) -> Result<SheetTotal, ScoringError> {
    if graded.questions.is_empty() {
        return Err(ScoringError::NoQuestions);
    }

    let mut hundredths: i64 = 0;
    for question in &graded.questions {
        if !question.score.is_finite() || !(0.0..=MAX_QUESTION_SCORE).contains(&question.score) {
            return Err(ScoringError::InvalidScore {
                number: question.number,
                score: question.score,
            });
        }
        hundredths = add_hundredths(hundredths, question.score)?;
    }

    let mut ordered: Vec<_> = graded.questions.iter().collect();
    ordered.sort_by_key(|question| question.number);

    let feedback = ordered
        .iter()
        .map(|question| question.feedback.trim())
        .collect::<Vec<_>>()
        .join(FEEDBACK_SEPARATOR);

    Ok(SheetTotal { score: hundredths as f64 / 100.0, feedback })
}

fn add_hundredths(total: i64, score: f64) -> Result<i64, ScoringError> {
    total.checked_add((score * 100.0).round() as i64).ok_or(ScoringError::TotalOutOfRange)
}
