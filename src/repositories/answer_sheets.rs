use sqlx::SqlitePool;
use time::PrimitiveDateTime;

use crate::db::models::AnswerSheet;

pub(crate) const COLUMNS: &str = "\
    id, exam_id, name, answer_file, score, feedback, created_at, updated_at";

pub(crate) struct CreateAnswerSheet<'a> {
    pub(crate) id: &'a str,
    pub(crate) exam_id: &'a str,
    pub(crate) name: &'a str,
    pub(crate) answer_file: &'a str,
    pub(crate) created_at: PrimitiveDateTime,
}

/// Manual edit of a sheet's grade. `None` leaves a field unchanged; the
/// `clear_*` flags null it out.
pub(crate) struct ManualGradeUpdate {
    pub(crate) name: Option<String>,
    pub(crate) score: Option<f64>,
    pub(crate) clear_score: bool,
    pub(crate) feedback: Option<String>,
    pub(crate) clear_feedback: bool,
    pub(crate) updated_at: PrimitiveDateTime,
}

pub(crate) async fn create(
    pool: &SqlitePool,
    params: CreateAnswerSheet<'_>,
) -> Result<AnswerSheet, sqlx::Error> {
    sqlx::query_as::<_, AnswerSheet>(&format!(
        "INSERT INTO answer_sheets (id, exam_id, name, answer_file, score, feedback,
                                    created_at, updated_at)
         VALUES ($1, $2, $3, $4, NULL, NULL, $5, $5)
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.exam_id)
    .bind(params.name)
    .bind(params.answer_file)
    .bind(params.created_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_by_id(
    pool: &SqlitePool,
    id: &str,
) -> Result<Option<AnswerSheet>, sqlx::Error> {
    sqlx::query_as::<_, AnswerSheet>(&format!("SELECT {COLUMNS} FROM answer_sheets WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn fetch_one_by_id(
    pool: &SqlitePool,
    id: &str,
) -> Result<AnswerSheet, sqlx::Error> {
    sqlx::query_as::<_, AnswerSheet>(&format!("SELECT {COLUMNS} FROM answer_sheets WHERE id = $1"))
        .bind(id)
        .fetch_one(pool)
        .await
}

pub(crate) async fn list_by_exam(
    pool: &SqlitePool,
    exam_id: &str,
) -> Result<Vec<AnswerSheet>, sqlx::Error> {
    sqlx::query_as::<_, AnswerSheet>(&format!(
        "SELECT {COLUMNS} FROM answer_sheets WHERE exam_id = $1 ORDER BY created_at, name"
    ))
    .bind(exam_id)
    .fetch_all(pool)
    .await
}

/// Writes a grading outcome. Score and feedback land in one statement so a
/// sheet is never left half-graded. Returns `false` when the sheet no longer exists.
pub(crate) async fn record_grade(
    pool: &SqlitePool,
    id: &str,
    score: f64,
    feedback: &str,
    updated_at: PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE answer_sheets SET score = $1, feedback = $2, updated_at = $3 WHERE id = $4",
    )
    .bind(score)
    .bind(feedback)
    .bind(updated_at)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn update_manual(
    pool: &SqlitePool,
    id: &str,
    params: ManualGradeUpdate,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE answer_sheets SET
            name = COALESCE($1, name),
            score = CASE WHEN $2 THEN NULL ELSE COALESCE($3, score) END,
            feedback = CASE WHEN $4 THEN NULL ELSE COALESCE($5, feedback) END,
            updated_at = $6
         WHERE id = $7",
    )
    .bind(params.name)
    .bind(params.clear_score)
    .bind(params.score)
    .bind(params.clear_feedback)
    .bind(params.feedback)
    .bind(params.updated_at)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub(crate) async fn delete_by_id(pool: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("DELETE FROM answer_sheets WHERE id = $1").bind(id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}
