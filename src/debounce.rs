//! Coalescing of bursty events into one handler call.
//!
//! Every [`trigger`](Debouncer::trigger) clears the previous timeout and
//! schedules a fresh one, so the handler runs once, `delay` after the last
//! event of a burst. The pending timeout lives in the host, which means
//! [`cancel`](Debouncer::cancel) must run on unmount or the host will fire
//! into a component that no longer holds resources.

use std::time::Duration;

use crate::host::{Host, TimerHandle};

#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    pending: Option<TimerHandle>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self { delay, pending: None }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Restart the quiet window.
    pub fn trigger(&mut self, host: &mut dyn Host) {
        if let Some(previous) = self.pending.take() {
            host.clear_timeout(previous);
        }
        self.pending = Some(host.set_timeout(self.delay));
    }

    /// Returns `true` if `handle` is this debouncer's timeout, consuming it.
    pub fn fire(&mut self, handle: TimerHandle) -> bool {
        if self.pending == Some(handle) {
            self.pending = None;
            true
        } else {
            false
        }
    }

    pub fn cancel(&mut self, host: &mut dyn Host) {
        if let Some(handle) = self.pending.take() {
            host.clear_timeout(handle);
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessHost;

    #[test]
    fn test_burst_leaves_one_timer() {
        let mut host = HeadlessHost::new(800.0, 600.0);
        let mut debouncer = Debouncer::new(Duration::from_millis(10));

        for _ in 0..5 {
            debouncer.trigger(&mut host);
        }
        assert_eq!(host.pending_timers(), 1);
        assert!(debouncer.is_pending());
    }

    #[test]
    fn test_fire_only_accepts_own_handle() {
        let mut host = HeadlessHost::new(800.0, 600.0);
        let mut debouncer = Debouncer::new(Duration::from_millis(10));
        debouncer.trigger(&mut host);

        assert!(!debouncer.fire(TimerHandle(9999)));
        let due = host.take_due_timers(10.0);
        assert_eq!(due.len(), 1);
        assert!(debouncer.fire(due[0]));
        assert!(!debouncer.is_pending());
    }

    #[test]
    fn test_cancel_clears_host_timer() {
        let mut host = HeadlessHost::new(800.0, 600.0);
        let mut debouncer = Debouncer::new(Duration::from_millis(100));
        debouncer.trigger(&mut host);
        debouncer.cancel(&mut host);
        assert_eq!(host.pending_timers(), 0);
    }
}
