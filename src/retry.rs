//! Bounded retry execution around fallible fetches.

use crate::key::AssetKey;

/// Executes a fallible fetch up to `max_retries + 1` times in total. Attempts
/// are issued back to back without any backoff delay; callers that want to be
/// gentler to a remote backend should wrap their fetch with a pause themselves.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_retries: u32,
}

impl RetryPolicy {
    #[inline]
    pub fn new(max_retries: u32) -> Self {
        RetryPolicy {
            max_retries: max_retries,
        }
    }

    /// The total number of attempts this policy is willing to make.
    #[inline]
    pub fn attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Runs `fetch` until it succeeds or the attempt budget is exhausted. Every
    /// failed attempt is logged with its index; the error of the final attempt
    /// is the one surfaced to the caller.
    pub fn run<T, F>(&self, key: &AssetKey, mut fetch: F) -> Result<T, failure::Error>
    where
        F: FnMut() -> Result<T, failure::Error>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;

            match fetch() {
                Ok(v) => return Ok(v),
                Err(err) => {
                    warn!(
                        "Attempt {}/{} to fetch '{}' failed. {}",
                        attempt,
                        self.attempts(),
                        key,
                        err
                    );

                    if attempt >= self.attempts() {
                        return Err(err);
                    }
                }
            }
        }
    }
}
