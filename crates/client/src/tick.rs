//! Shared tick driver for posted and delayed callbacks.

use std::sync::Mutex;
use std::time::{Duration, Instant};

type Callback = Box<dyn FnOnce() + Send>;

/// Process-wide delayed-callback driver.
///
/// All bots share one driver; each bot's scheduler loop advances it once
/// per flush tick, so callback resolution is bounded by the flush interval.
/// Callbacks run outside the internal lock and may post new ones.
#[derive(Default)]
pub struct TickDriver {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    posted: Vec<Callback>,
    delayed: Vec<(Instant, Callback)>,
}

impl TickDriver {
    /// Empty driver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `callback` on the next tick.
    pub fn post(&self, callback: impl FnOnce() + Send + 'static) {
        let mut inner = self.inner.lock().expect("tick lock poisoned");
        inner.posted.push(Box::new(callback));
    }

    /// Run `callback` on the first tick at or after `delay` from now.
    pub fn post_delayed(&self, delay: Duration, callback: impl FnOnce() + Send + 'static) {
        let deadline = Instant::now() + delay;
        let mut inner = self.inner.lock().expect("tick lock poisoned");
        inner.delayed.push((deadline, Box::new(callback)));
    }

    /// Drain and run all due callbacks in insertion order.
    pub fn tick(&self) {
        let (posted, due) = {
            let mut inner = self.inner.lock().expect("tick lock poisoned");
            let posted = std::mem::take(&mut inner.posted);
            let now = Instant::now();
            let mut due = Vec::new();
            let mut waiting = Vec::new();
            for (deadline, callback) in inner.delayed.drain(..) {
                if deadline <= now {
                    due.push(callback);
                } else {
                    waiting.push((deadline, callback));
                }
            }
            inner.delayed = waiting;
            (posted, due)
        };

        for callback in posted {
            callback();
        }
        for callback in due {
            callback();
        }
    }
}
