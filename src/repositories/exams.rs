use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use time::PrimitiveDateTime;

use crate::db::models::Exam;
use crate::db::types::ExamStatus;

pub(crate) const COLUMNS: &str = "\
    id, name, description, status, rubric, answer_key, exam_file, created_at, updated_at";

pub(crate) struct CreateExam<'a> {
    pub(crate) id: &'a str,
    pub(crate) name: &'a str,
    pub(crate) description: Option<&'a str>,
    pub(crate) rubric: &'a str,
    pub(crate) answer_key: &'a str,
    pub(crate) created_at: PrimitiveDateTime,
}

pub(crate) struct UpdateExam {
    pub(crate) name: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) rubric: Option<String>,
    pub(crate) answer_key: Option<String>,
    pub(crate) updated_at: PrimitiveDateTime,
}

pub(crate) async fn create(pool: &SqlitePool, params: CreateExam<'_>) -> Result<Exam, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "INSERT INTO exams (id, name, description, status, rubric, answer_key, exam_file,
                            created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, NULL, $7, $7)
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.name)
    .bind(params.description)
    .bind(ExamStatus::InProgress)
    .bind(params.rubric)
    .bind(params.answer_key)
    .bind(params.created_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_by_id(pool: &SqlitePool, id: &str) -> Result<Option<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!("SELECT {COLUMNS} FROM exams WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn fetch_one_by_id(pool: &SqlitePool, id: &str) -> Result<Exam, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!("SELECT {COLUMNS} FROM exams WHERE id = $1"))
        .bind(id)
        .fetch_one(pool)
        .await
}

pub(crate) async fn list(
    pool: &SqlitePool,
    status: Option<ExamStatus>,
    skip: i64,
    limit: i64,
) -> Result<Vec<Exam>, sqlx::Error> {
    let mut builder = QueryBuilder::<Sqlite>::new(format!("SELECT {COLUMNS} FROM exams"));

    if let Some(status) = status {
        builder.push(" WHERE status = ");
        builder.push_bind(status);
    }

    builder.push(" ORDER BY created_at DESC LIMIT ");
    builder.push_bind(limit.clamp(1, 1000));
    builder.push(" OFFSET ");
    builder.push_bind(skip.max(0));

    builder.build_query_as::<Exam>().fetch_all(pool).await
}

pub(crate) async fn count(
    pool: &SqlitePool,
    status: Option<ExamStatus>,
) -> Result<i64, sqlx::Error> {
    let mut builder = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM exams");

    if let Some(status) = status {
        builder.push(" WHERE status = ");
        builder.push_bind(status);
    }

    builder.build_query_scalar::<i64>().fetch_one(pool).await
}

pub(crate) async fn update(
    pool: &SqlitePool,
    id: &str,
    params: UpdateExam,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE exams SET
            name = COALESCE($1, name),
            description = COALESCE($2, description),
            rubric = COALESCE($3, rubric),
            answer_key = COALESCE($4, answer_key),
            updated_at = $5
         WHERE id = $6",
    )
    .bind(params.name)
    .bind(params.description)
    .bind(params.rubric)
    .bind(params.answer_key)
    .bind(params.updated_at)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub(crate) async fn update_status(
    pool: &SqlitePool,
    id: &str,
    status: ExamStatus,
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE exams SET status = $1, updated_at = $2 WHERE id = $3")
        .bind(status)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub(crate) async fn set_exam_file(
    pool: &SqlitePool,
    id: &str,
    handle: &str,
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE exams SET exam_file = $1, updated_at = $2 WHERE id = $3")
        .bind(handle)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Answer sheets go with the exam through `ON DELETE CASCADE`.
pub(crate) async fn delete_by_id(pool: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM exams WHERE id = $1").bind(id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}
