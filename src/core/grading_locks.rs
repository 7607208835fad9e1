use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Tracks which exams currently have a grading batch in flight.
///
/// At most one batch runs per exam; the lease returned by [`GradingLocks::try_acquire`]
/// releases the exam when dropped, including when the batch task panics.
#[derive(Clone, Default)]
pub(crate) struct GradingLocks {
    inner: Arc<Mutex<HashMap<String, Arc<BatchProgress>>>>,
}

#[derive(Debug, Default)]
pub(crate) struct BatchProgress {
    total: AtomicUsize,
    settled: AtomicUsize,
    failed: AtomicUsize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ProgressSnapshot {
    pub(crate) total: usize,
    pub(crate) settled: usize,
    pub(crate) failed: usize,
}

pub(crate) struct GradingLease {
    exam_id: String,
    progress: Arc<BatchProgress>,
    locks: GradingLocks,
}

impl GradingLocks {
    pub(crate) fn try_acquire(&self, exam_id: &str) -> Option<GradingLease> {
        let mut map = self.lock_map();
        if map.contains_key(exam_id) {
            return None;
        }

        let progress = Arc::new(BatchProgress::default());
        map.insert(exam_id.to_string(), progress.clone());

        Some(GradingLease { exam_id: exam_id.to_string(), progress, locks: self.clone() })
    }

    pub(crate) fn progress(&self, exam_id: &str) -> Option<ProgressSnapshot> {
        self.lock_map().get(exam_id).map(|progress| progress.snapshot())
    }

    fn release(&self, exam_id: &str) {
        self.lock_map().remove(exam_id);
    }

    fn lock_map(&self) -> MutexGuard<'_, HashMap<String, Arc<BatchProgress>>> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl GradingLease {
    pub(crate) fn progress(&self) -> Arc<BatchProgress> {
        self.progress.clone()
    }
}

impl Drop for GradingLease {
    fn drop(&mut self) {
        self.locks.release(&self.exam_id);
    }
}

impl BatchProgress {
    pub(crate) fn start(&self, total: usize) {
        self.total.store(total, Ordering::SeqCst);
    }

    pub(crate) fn record(&self, success: bool) {
        if !success {
            self.failed.fetch_add(1, Ordering::SeqCst);
        }
        self.settled.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            total: self.total.load(Ordering::SeqCst),
            settled: self.settled.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_is_rejected_until_lease_dropped() {
        let locks = GradingLocks::default();
        let lease = locks.try_acquire("exam-1").expect("first lease");
        assert!(locks.try_acquire("exam-1").is_none());
        assert!(locks.try_acquire("exam-2").is_some());

        drop(lease);
        assert!(locks.try_acquire("exam-1").is_some());
    }

    #[test]
    fn progress_is_visible_while_lease_held() {
        let locks = GradingLocks::default();
        assert!(locks.progress("exam-1").is_none());

        let lease = locks.try_acquire("exam-1").expect("lease");
        let progress = lease.progress();
        progress.start(3);
        progress.record(true);
        progress.record(false);

        assert_eq!(
            locks.progress("exam-1"),
            Some(ProgressSnapshot { total: 3, settled: 2, failed: 1 })
        );

        drop(lease);
        assert!(locks.progress("exam-1").is_none());
    }
}
