use serde::{Deserialize, Serialize};

use crate::core::time::format_primitive;
use crate::db::models::AnswerSheet;
use crate::db::types::SheetStatus;

#[derive(Debug, Serialize)]
pub(crate) struct AnswerSheetResponse {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) name: String,
    pub(crate) answer_file: String,
    pub(crate) score: Option<f64>,
    pub(crate) feedback: Option<String>,
    pub(crate) status: SheetStatus,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl From<AnswerSheet> for AnswerSheetResponse {
    fn from(sheet: AnswerSheet) -> Self {
        let status = sheet.status();
        Self {
            id: sheet.id,
            exam_id: sheet.exam_id,
            name: sheet.name,
            answer_file: sheet.answer_file,
            score: sheet.score,
            feedback: sheet.feedback,
            status,
            created_at: format_primitive(sheet.created_at),
            updated_at: format_primitive(sheet.updated_at),
        }
    }
}

/// Manual grade edit. Omitted fields are left alone; `null` clears score or feedback.
#[derive(Debug, Deserialize)]
pub(crate) struct AnswerSheetUpdate {
    #[serde(default)]
    pub(crate) name: Option<String>,
    #[serde(default, deserialize_with = "super::nullable")]
    pub(crate) score: Option<Option<f64>>,
    #[serde(default, deserialize_with = "super::nullable")]
    pub(crate) feedback: Option<Option<String>>,
}
