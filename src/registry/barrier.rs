/*!
 * Configuration Barrier
 * Counts scheduled tasks against completed configurations
 */

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
pub(crate) struct ConfigBarrier {
    tasks: AtomicUsize,
    completed: AtomicUsize,
    lock: Mutex<()>,
    cond: Condvar,
}

impl ConfigBarrier {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add_tasks(&self, n: usize) {
        self.tasks.fetch_add(n, Ordering::AcqRel);
    }

    pub(crate) fn add_completed(&self, n: usize) {
        self.completed.fetch_add(n, Ordering::AcqRel);
        self.notify();
    }

    /// Forget one task; `configured` also withdraws its completion
    pub(crate) fn remove_task(&self, configured: bool) {
        let _ = self
            .tasks
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
        if configured {
            let _ = self
                .completed
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
        }
        self.notify();
    }

    #[inline]
    pub(crate) fn tasks(&self) -> usize {
        self.tasks.load(Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn completed(&self) -> usize {
        self.completed.load(Ordering::Acquire)
    }

    pub(crate) fn is_open(&self) -> bool {
        self.completed() >= self.tasks()
    }

    /// Block until every counted task configured; false on timeout
    pub(crate) fn wait(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut guard = self.lock.lock();
        while !self.is_open() {
            if self.cond.wait_until(&mut guard, deadline).timed_out() {
                return self.is_open();
            }
        }
        true
    }

    fn notify(&self) {
        let _guard = self.lock.lock();
        self.cond.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_wait_times_out_when_incomplete() {
        let barrier = ConfigBarrier::new();
        barrier.add_tasks(2);
        barrier.add_completed(1);
        assert!(!barrier.wait(Duration::from_millis(20)));
    }

    #[test]
    fn test_wait_released_by_completion() {
        let barrier = Arc::new(ConfigBarrier::new());
        barrier.add_tasks(1);

        let completer = Arc::clone(&barrier);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            completer.add_completed(1);
        });

        assert!(barrier.wait(Duration::from_secs(5)));
        handle.join().unwrap();
    }

    #[test]
    fn test_remove_never_underflows() {
        let barrier = ConfigBarrier::new();
        barrier.remove_task(true);
        assert_eq!(barrier.tasks(), 0);
        assert_eq!(barrier.completed(), 0);
        assert!(barrier.is_open());
    }
}
