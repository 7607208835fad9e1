use serde::{Deserialize, Serialize};

use crate::tasks::grading::{BatchSummary, GradeResult};

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct GradeBatchRequest {
    #[serde(default)]
    pub(crate) force: bool,
    #[serde(default)]
    #[serde(alias = "sheetIds")]
    pub(crate) sheet_ids: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct GradeBatchResponse {
    pub(crate) requested: usize,
    pub(crate) successful: usize,
    pub(crate) failed: usize,
    pub(crate) results: Vec<GradeResult>,
}

impl From<BatchSummary> for GradeBatchResponse {
    fn from(summary: BatchSummary) -> Self {
        Self {
            requested: summary.requested,
            successful: summary.successful,
            failed: summary.failed,
            results: summary.results,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct GradingStatusResponse {
    pub(crate) exam_id: String,
    pub(crate) in_progress: bool,
    pub(crate) total: usize,
    pub(crate) settled: usize,
    pub(crate) failed: usize,
}
