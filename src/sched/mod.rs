//! A tiny job scheduler for background work like batch preloads.
//!
//! Jobs are plain boxed closures executed on a fixed pool of worker threads.
//! The pool drains gracefully on termination, so a spawned job is never lost
//! silently.

pub mod latch;

mod scheduler;

use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

pub mod prelude {
    pub use super::latch::{Latch, LockLatch};
    pub use super::{ScheduleSystem, ScheduleSystemShared};
}

pub struct ScheduleSystem {
    shared: Arc<ScheduleSystemShared>,
    joins: Mutex<Vec<JoinHandle<()>>>,
}

impl ScheduleSystem {
    /// Creates a new `ScheduleSystem` with `num` worker threads.
    pub fn new(num: u32) -> Self {
        let (scheduler, joins) = scheduler::Scheduler::new(num);

        ScheduleSystem {
            shared: Arc::new(ScheduleSystemShared {
                scheduler: scheduler,
            }),
            joins: Mutex::new(joins),
        }
    }

    /// Returns the multi-thread friendly parts of `ScheduleSystem`.
    pub fn shared(&self) -> Arc<ScheduleSystemShared> {
        self.shared.clone()
    }

    /// Signals the workers to shut down and blocks current thread until all of
    /// them finished their queued jobs gracefully.
    pub fn terminate(&self) {
        self.shared.scheduler.terminate();

        let mut joins = self.joins.lock().unwrap();
        for join in joins.drain(..) {
            let _ = join.join();
        }
    }
}

impl Drop for ScheduleSystem {
    fn drop(&mut self) {
        self.terminate();
    }
}

pub struct ScheduleSystemShared {
    scheduler: Arc<scheduler::Scheduler>,
}

impl ScheduleSystemShared {
    /// Spawns an asynchronous job that will be executed by one of the worker
    /// threads.
    pub fn spawn<F>(&self, func: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.scheduler.inject(Box::new(func));
    }
}
