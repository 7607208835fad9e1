mod answers;
pub(crate) mod errors;
mod exams;
mod files;
mod handlers;
mod pagination;
pub(crate) mod router;
mod uploads;
mod validation;
