pub(crate) mod ai_grading;
pub(crate) mod exam_statistics;
pub(crate) mod scoring;
pub(crate) mod storage;
