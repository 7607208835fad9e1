use serde::Serialize;

use crate::db::models::AnswerSheet;

/// Exam-level score summary. Average, max and min are `None` until at least
/// one sheet carries a score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct ExamStatistics {
    pub(crate) total_sheets: usize,
    pub(crate) graded_count: usize,
    pub(crate) pending_count: usize,
    pub(crate) average_score: Option<f64>,
    pub(crate) max_score: Option<f64>,
    pub(crate) min_score: Option<f64>,
}

pub(crate) fn summarize(sheets: &[AnswerSheet]) -> ExamStatistics {
    let scores: Vec<f64> = sheets.iter().filter_map(|sheet| sheet.score).collect();
    let graded_count = scores.len();

    let (average_score, max_score, min_score) = if scores.is_empty() {
        (None, None, None)
    } else {
        let sum: f64 = scores.iter().sum();
        let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min = scores.iter().copied().fold(f64::INFINITY, f64::min);
        (Some(round_two(sum / graded_count as f64)), Some(max), Some(min))
    };

    ExamStatistics {
        total_sheets: sheets.len(),
        graded_count,
        pending_count: sheets.len() - graded_count,
        average_score,
        max_score,
        min_score,
    }
}

fn round_two(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
