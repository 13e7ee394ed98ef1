use std::panic;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;

use crossbeam_deque as deque;

use super::latch::{Latch, LockLatch};

type Job = Box<dyn FnOnce() + Send>;

/// How long an idle worker sleeps before re-checking the queue on its own.
/// Wakeups are signalled eagerly; the timeout only bounds the unlucky case of
/// a notification racing past a worker that was about to park.
const PARK_TIMEOUT: Duration = Duration::from_millis(50);

/// A fixed pool of worker threads draining boxed jobs from a shared injection
/// queue.
pub(super) struct Scheduler {
    injector: Mutex<deque::Worker<Job>>,
    stealer: deque::Stealer<Job>,
    watcher: Watcher,

    shutdown: AtomicBool,
    pending: AtomicUsize,
}

struct Watcher(Mutex<()>, Condvar);

impl Scheduler {
    pub fn new(num: u32) -> (Arc<Self>, Vec<thread::JoinHandle<()>>) {
        let (w, s) = deque::fifo();

        let scheduler = Arc::new(Scheduler {
            injector: Mutex::new(w),
            stealer: s,
            watcher: Watcher(Mutex::new(()), Condvar::new()),
            shutdown: AtomicBool::new(false),
            pending: AtomicUsize::new(0),
        });

        let mut joins = Vec::new();
        for index in 0..num {
            let sc = scheduler.clone();
            let primed = Arc::new(LockLatch::new());
            let latch = primed.clone();

            let join = thread::Builder::new()
                .name(format!("satchel-worker-{}", index))
                .spawn(move || Scheduler::main_loop(sc, latch))
                .unwrap();

            primed.wait();
            joins.push(join);
        }

        (scheduler, joins)
    }

    /// Push a job into the injection queue; it will be taken by whatever
    /// worker has nothing to do.
    pub fn inject(&self, job: Job) {
        self.pending.fetch_add(1, Ordering::SeqCst);

        {
            let injector = self.injector.lock().unwrap();
            injector.push(job);
        }

        self.watcher.1.notify_one();
    }

    /// Flips the shutdown flag and wakes every worker. Workers drain whatever
    /// is still queued before exiting.
    pub fn terminate(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.watcher.1.notify_all();
    }

    fn steal(&self) -> Option<Job> {
        loop {
            match self.stealer.steal() {
                deque::Steal::Data(job) => return Some(job),
                deque::Steal::Empty => return None,
                deque::Steal::Retry => {}
            }
        }
    }

    fn main_loop(scheduler: Arc<Scheduler>, primed: Arc<LockLatch>) {
        primed.set();

        loop {
            while let Some(job) = scheduler.steal() {
                // A panicking job must not take the worker down with it.
                if panic::catch_unwind(panic::AssertUnwindSafe(job)).is_err() {
                    warn!("A scheduled job panicked; the worker moves on.");
                }

                scheduler.pending.fetch_sub(1, Ordering::SeqCst);
            }

            let guard = scheduler.watcher.0.lock().unwrap();

            if scheduler.shutdown.load(Ordering::SeqCst)
                && scheduler.pending.load(Ordering::SeqCst) == 0
            {
                return;
            }

            let _ = scheduler
                .watcher
                .1
                .wait_timeout(guard, PARK_TIMEOUT)
                .unwrap();
        }
    }
}
