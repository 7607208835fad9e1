use serde::{Deserialize, Serialize};
use sqlx::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub(crate) enum ExamStatus {
    InProgress,
    Completed,
    Archived,
}

impl ExamStatus {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            ExamStatus::InProgress => "IN_PROGRESS",
            ExamStatus::Completed => "COMPLETED",
            ExamStatus::Archived => "ARCHIVED",
        }
    }

    pub(crate) fn can_transition_to(self, next: ExamStatus) -> bool {
        matches!(
            (self, next),
            (ExamStatus::InProgress, ExamStatus::Completed)
                | (ExamStatus::Completed, ExamStatus::InProgress)
                | (ExamStatus::InProgress, ExamStatus::Archived)
                | (ExamStatus::Completed, ExamStatus::Archived)
                | (ExamStatus::Archived, ExamStatus::InProgress)
        )
    }

    pub(crate) fn is_archived(self) -> bool {
        matches!(self, ExamStatus::Archived)
    }
}

/// Grading state of an answer sheet, derived from which of score/feedback are set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub(crate) enum SheetStatus {
    Pending,
    Partial,
    Graded,
}
