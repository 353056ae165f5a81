//! Wait group with a timeout
//!
//! Counts in-flight replies on a connection so `close` can let them finish.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

#[derive(Debug, Default)]
pub struct WaitGroup {
    count: Mutex<usize>,
    drained: Condvar,
}

impl WaitGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark one operation as started; it ends when the guard drops
    pub fn enter(&self) -> WaitGuard<'_> {
        *self.count.lock() += 1;
        WaitGuard { group: self }
    }

    fn done(&self) {
        let mut count = self.count.lock();
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.drained.notify_all();
        }
    }

    /// Operations currently in flight
    pub fn pending(&self) -> usize {
        *self.count.lock()
    }

    /// Block until nothing is in flight or `timeout` passes
    ///
    /// Returns true if the group drained.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut count = self.count.lock();
        while *count > 0 {
            if self.drained.wait_until(&mut count, deadline).timed_out() {
                return *count == 0;
            }
        }
        true
    }
}

/// Ends one in-flight operation on drop
pub struct WaitGuard<'a> {
    group: &'a WaitGroup,
}

impl Drop for WaitGuard<'_> {
    fn drop(&mut self) {
        self.group.done();
    }
}
