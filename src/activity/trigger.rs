/*!
 * Trigger Gate
 * Condition variable, pending-trigger counter and the active/stopping flags of one activity
 */

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Wake-up primitive shared between an activity handle and its drive loop
///
/// The trigger counter lives under the mutex so that a trigger issued between
/// the "no pending trigger" check and the wait can never be lost.
#[derive(Debug, Default)]
pub struct TriggerGate {
    pending: Mutex<u32>,
    cond: Condvar,
    active: AtomicBool,
    stopping: AtomicBool,
}

impl TriggerGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the activity active and clear any earlier stop request
    pub fn arm(&self) {
        self.stopping.store(false, Ordering::Release);
        self.active.store(true, Ordering::Release);
    }

    pub fn set_inactive(&self) {
        self.active.store(false, Ordering::Release);
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::Acquire)
    }

    /// Set the stopping flag and wake any waiter
    pub fn request_stop(&self) {
        self.stopping.store(true, Ordering::Release);
        let _guard = self.pending.lock();
        self.cond.notify_all();
    }

    /// Add one pending trigger and wake the waiter
    pub fn trigger(&self) {
        let mut pending = self.pending.lock();
        *pending = pending.saturating_add(1);
        self.cond.notify_all();
    }

    /// Drop one pending trigger if any; true if one was removed
    pub fn remove_trigger(&self) -> bool {
        let mut pending = self.pending.lock();
        if *pending > 0 {
            *pending -= 1;
            true
        } else {
            false
        }
    }

    pub fn pending(&self) -> u32 {
        *self.pending.lock()
    }

    /// Block until a trigger is pending or a stop is requested
    ///
    /// Consumes one trigger and returns true, or returns false when stopping.
    pub fn wait_trigger(&self) -> bool {
        let mut pending = self.pending.lock();
        while *pending == 0 && !self.is_stopping() {
            self.cond.wait(&mut pending);
        }

        if self.is_stopping() {
            return false;
        }

        *pending -= 1;
        true
    }

    /// Sleep until `deadline` unless a stop is requested first
    pub fn sleep_until(&self, deadline: Instant) {
        let mut pending = self.pending.lock();
        while !self.is_stopping() {
            if self.cond.wait_until(&mut pending, deadline).timed_out() {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_trigger_before_wait_is_not_lost() {
        let gate = TriggerGate::new();
        gate.trigger();
        gate.trigger();
        assert_eq!(gate.pending(), 2);

        assert!(gate.wait_trigger());
        assert!(gate.wait_trigger());
        assert_eq!(gate.pending(), 0);
    }

    #[test]
    fn test_remove_trigger() {
        let gate = TriggerGate::new();
        assert!(!gate.remove_trigger());
        gate.trigger();
        assert!(gate.remove_trigger());
        assert_eq!(gate.pending(), 0);
    }

    #[test]
    fn test_stop_wakes_waiter() {
        let gate = Arc::new(TriggerGate::new());
        gate.arm();

        let waiter = {
            let gate = gate.clone();
            thread::spawn(move || gate.wait_trigger())
        };

        thread::sleep(Duration::from_millis(20));
        gate.request_stop();
        assert!(!waiter.join().unwrap());
    }

    #[test]
    fn test_sleep_interrupted_by_stop() {
        let gate = Arc::new(TriggerGate::new());
        gate.arm();

        let sleeper = {
            let gate = gate.clone();
            thread::spawn(move || {
                let start = Instant::now();
                gate.sleep_until(start + Duration::from_secs(10));
                start.elapsed()
            })
        };

        thread::sleep(Duration::from_millis(20));
        gate.request_stop();
        assert!(sleeper.join().unwrap() < Duration::from_secs(5));
    }
}
