use std::sync::Arc;

use sqlx::SqlitePool;

use crate::core::config::Settings;
use crate::core::grading_locks::GradingLocks;
use crate::services::ai_grading::GradingCapability;
use crate::services::storage::FileStore;

#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    db: SqlitePool,
    files: Arc<dyn FileStore>,
    grader: Arc<dyn GradingCapability>,
    grading_locks: GradingLocks,
}

impl AppState {
    pub(crate) fn new(
        settings: Settings,
        db: SqlitePool,
        files: Arc<dyn FileStore>,
        grader: Arc<dyn GradingCapability>,
    ) -> Self {
        Self {
            inner: Arc::new(InnerState {
                settings,
                db,
                files,
                grader,
                grading_locks: GradingLocks::default(),
            }),
        }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn db(&self) -> &SqlitePool {
        &self.inner.db
    }

    pub(crate) fn files(&self) -> &dyn FileStore {
        self.inner.files.as_ref()
    }

    pub(crate) fn grader(&self) -> Arc<dyn GradingCapability> {
        self.inner.grader.clone()
    }

    pub(crate) fn grading_locks(&self) -> &GradingLocks {
        &self.inner.grading_locks
    }
}
