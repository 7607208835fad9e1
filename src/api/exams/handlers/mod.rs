mod crud;
mod documents;
mod grading;

pub(super) use crud::{change_status, create_exam, delete_exam, get_exam, list_exams, update_exam};
pub(super) use documents::{exam_statistics, list_answers, upload_answers, upload_exam_document};
pub(super) use grading::{grade_exam, grading_status};
