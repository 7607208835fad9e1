pub(crate) mod answer_sheets;
pub(crate) mod exams;
