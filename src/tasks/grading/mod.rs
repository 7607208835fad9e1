//! Batch grading: select due answer sheets, fan them out to the grading
//! capability, and write the outcomes back.

pub(crate) mod batch;
pub(crate) mod orchestrator;
pub(crate) mod reconciler;

pub(crate) use batch::{grade_exam, BatchSummary, GradeOptions, GradingError};
pub(crate) use orchestrator::GradeResult;
