use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::{ExamStatus, SheetStatus};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Exam {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) status: ExamStatus,
    pub(crate) rubric: String,
    pub(crate) answer_key: String,
    pub(crate) exam_file: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct AnswerSheet {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) name: String,
    pub(crate) answer_file: String,
    pub(crate) score: Option<f64>,
    pub(crate) feedback: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

impl AnswerSheet {
    pub(crate) fn status(&self) -> SheetStatus {
        match (self.score.is_some(), self.feedback.is_some()) {
            (true, true) => SheetStatus::Graded,
            (false, false) => SheetStatus::Pending,
            _ => SheetStatus::Partial,
        }
    }
}
