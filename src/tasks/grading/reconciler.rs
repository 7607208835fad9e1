use sqlx::SqlitePool;

use crate::core::time::primitive_now_utc;
use crate::repositories::answer_sheets;
use crate::tasks::grading::orchestrator::GradeResult;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct ReconcileSummary {
    pub(crate) successful: usize,
    pub(crate) failed: usize,
    /// Sheets that graded fine but whose grade could not be written.
    pub(crate) unwritten: Vec<String>,
}

/// Writes every successful grade back to its sheet. Failed results are counted
/// and leave the sheet untouched; a write error on one sheet does not stop the rest.
pub(crate) async fn reconcile(pool: &SqlitePool, results: &[GradeResult]) -> ReconcileSummary {
    let mut summary = ReconcileSummary::default();

    for result in results {
        let GradeResult::Graded { id, score, feedback } = result else {
            summary.failed += 1;
            continue;
        };

        match answer_sheets::record_grade(pool, id, *score, feedback, primitive_now_utc()).await {
            Ok(true) => summary.successful += 1,
            Ok(false) => {
                tracing::warn!(sheet_id = %id, "Answer sheet vanished before its grade was saved");
                summary.failed += 1;
                summary.unwritten.push(id.clone());
            }
            Err(err) => {
                tracing::error!(sheet_id = %id, error = %err, "Failed to save grade");
                summary.failed += 1;
                summary.unwritten.push(id.clone());
            }
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;

    #[tokio::test]
    async fn writes_every_success() {
        let pool = test_support::test_pool().await;
        let exam = test_support::insert_exam(&pool, "Midterm", "rubric", "key").await;
        let first = test_support::insert_sheet(&pool, &exam.id, "alice", "h1").await;
        let second = test_support::insert_sheet(&pool, &exam.id, "bob", "h2").await;

        let results = vec![
            GradeResult::Graded { id: first.id.clone(), score: 18.5, feedback: "good".into() },
            GradeResult::Graded { id: second.id.clone(), score: 0.0, feedback: "blank".into() },
        ];

        let summary = reconcile(&pool, &results).await;
        assert_eq!(summary.successful, 2);
        assert_eq!(summary.failed, 0);

        let stored = answer_sheets::fetch_one_by_id(&pool, &second.id).await.expect("sheet");
        assert_eq!(stored.score, Some(0.0));
        assert_eq!(stored.feedback.as_deref(), Some("blank"));
    }

    #[tokio::test]
    async fn failures_keep_prior_grade() {
        let pool = test_support::test_pool().await;
        let exam = test_support::insert_exam(&pool, "Midterm", "rubric", "key").await;
        let graded = test_support::insert_sheet(&pool, &exam.id, "alice", "h1").await;
        let failing = test_support::insert_sheet(&pool, &exam.id, "bob", "h2").await;
        answer_sheets::record_grade(&pool, &failing.id, 11.0, "earlier", primitive_now_utc())
            .await
            .expect("seed grade");

        let results = vec![
            GradeResult::Graded { id: graded.id.clone(), score: 9.0, feedback: "ok".into() },
            GradeResult::Failed { id: failing.id.clone(), error: "timeout".into() },
            GradeResult::Graded { id: "missing".into(), score: 1.0, feedback: "x".into() },
        ];

        let summary = reconcile(&pool, &results).await;
        assert_eq!(summary.successful, 1);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.unwritten, vec!["missing".to_string()]);

        let untouched = answer_sheets::fetch_one_by_id(&pool, &failing.id).await.expect("sheet");
        assert_eq!(untouched.score, Some(11.0));
        assert_eq!(untouched.feedback.as_deref(), Some("earlier"));
    }
}
