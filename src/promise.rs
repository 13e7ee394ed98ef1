//! A one-shot latch that publishes the outcome of an in-flight fetch to every
//! caller that joined it.

use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use crate::errors::Result;
use crate::provider::Handle;

enum PromiseState {
    NotReady,
    Done(Result<Handle>),
}

/// A promise starts out empty and is fulfilled exactly once with the shared
/// outcome of a fetch. Waiters block until fulfillment and every one of them
/// observes the identical result.
pub struct Promise {
    m: Mutex<PromiseState>,
    v: Condvar,
}

impl Promise {
    #[inline]
    pub fn new() -> Self {
        Promise {
            m: Mutex::new(PromiseState::NotReady),
            v: Condvar::new(),
        }
    }

    pub(crate) fn set(&self, outcome: Result<Handle>) {
        {
            let mut guard = self.m.lock().unwrap();
            *guard = PromiseState::Done(outcome);
        }

        self.v.notify_all();
    }

    /// Blocks current thread until the outcome is published.
    pub fn wait(&self) -> Result<Handle> {
        let mut guard = self.m.lock().unwrap();
        loop {
            if let PromiseState::Done(ref outcome) = *guard {
                return outcome.clone();
            }

            guard = self.v.wait(guard).unwrap();
        }
    }

    /// Blocks current thread until the outcome is published or the timeout
    /// elapses, in which case `None` is returned and the fetch keeps going.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<Handle>> {
        let deadline = Instant::now() + timeout;
        let mut guard = self.m.lock().unwrap();

        loop {
            if let PromiseState::Done(ref outcome) = *guard {
                return Some(outcome.clone());
            }

            let now = Instant::now();
            if now >= deadline {
                return None;
            }

            let (v, _) = self.v.wait_timeout(guard, deadline - now).unwrap();
            guard = v;
        }
    }

    #[inline]
    pub fn is_set(&self) -> bool {
        let guard = self.m.lock().unwrap();
        if let PromiseState::NotReady = *guard {
            false
        } else {
            true
        }
    }
}
