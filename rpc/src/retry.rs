// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Bounded retries of fallible requests.

use std::fmt::Debug;
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::{debug, warn};

/// How long to wait before the next attempt.
pub trait Backoff: Debug + Send + Sync {
    /// Delay before attempt number `next_attempt` (the first retry is attempt 2).
    fn delay(&self, next_attempt: u32) -> Duration;
}

/// Retry right away.
#[derive(Clone, Copy, Debug, Default)]
pub struct Immediate;

impl Backoff for Immediate {
    fn delay(&self, _next_attempt: u32) -> Duration {
        Duration::ZERO
    }
}

/// Wait the same amount of time before each retry.
#[derive(Clone, Copy, Debug)]
pub struct Fixed(pub Duration);

impl Backoff for Fixed {
    fn delay(&self, _next_attempt: u32) -> Duration {
        self.0
    }
}

#[derive(Debug)]
pub struct RetryPolicy {
    attempts: NonZeroU32,
    backoff: Box<dyn Backoff>,
}

impl Default for RetryPolicy {
    /// Five immediate attempts.
    fn default() -> Self {
        Self::new(Self::DEFAULT_ATTEMPTS, Immediate)
    }
}

impl RetryPolicy {
    #[allow(clippy::unwrap_used)] // safe due to const eval
    pub const DEFAULT_ATTEMPTS: NonZeroU32 = NonZeroU32::new(5).unwrap();

    #[must_use]
    pub fn new(attempts: NonZeroU32, backoff: impl Backoff + 'static) -> Self {
        Self {
            attempts,
            backoff: Box::new(backoff),
        }
    }

    #[must_use]
    pub fn attempts(&self) -> NonZeroU32 {
        self.attempts
    }

    /// Run `op` until it succeeds, fails with an error `retryable` rejects, or the attempts are
    /// exhausted. The error of the last attempt is returned.
    ///
    /// `op` receives the (1-based) attempt number.
    pub fn run<T, E: Debug>(
        &self,
        retryable: impl Fn(&E) -> bool,
        mut op: impl FnMut(u32) -> Result<T, E>,
    ) -> Result<T, E> {
        let attempts = self.attempts.get();
        let mut attempt = 1;
        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(e) if attempt < attempts && retryable(&e) => {
                    warn!("Attempt {attempt}/{attempts} failed, retrying: {e:?}");
                    attempt += 1;
                    let delay = self.backoff.delay(attempt);
                    if !delay.is_zero() {
                        debug!("Waiting {delay:?} before attempt {attempt}");
                        std::thread::sleep(delay);
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::RpcError;
    use std::cell::Cell;
    use tracing_test::traced_test;

    fn policy(attempts: u32) -> RetryPolicy {
        RetryPolicy::new(NonZeroU32::new(attempts).unwrap(), Immediate)
    }

    #[traced_test]
    #[test]
    fn timeouts_are_retried_until_exhausted() {
        let calls = Cell::new(0);
        let result: Result<(), RpcError> = policy(5).run(RpcError::is_retryable, |_| {
            calls.set(calls.get() + 1);
            Err(RpcError::Timeout("get_dvr_mac_address_by_host"))
        });
        assert_eq!(result, Err(RpcError::Timeout("get_dvr_mac_address_by_host")));
        assert_eq!(calls.get(), 5);
        assert!(logs_contain("Attempt 4/5 failed, retrying"));
        assert!(!logs_contain("Attempt 5/5"));
    }

    #[test]
    fn success_after_timeouts() {
        let result = policy(5).run(RpcError::is_retryable, |attempt| {
            if attempt < 3 {
                Err(RpcError::Timeout("m"))
            } else {
                Ok(attempt)
            }
        });
        assert_eq!(result, Ok(3));
    }

    #[test]
    fn fatal_errors_are_not_retried() {
        let calls = Cell::new(0);
        let result: Result<(), RpcError> = policy(5).run(RpcError::is_retryable, |_| {
            calls.set(calls.get() + 1);
            Err(RpcError::Remote {
                method: "m",
                message: "no such method".to_string(),
            })
        });
        assert!(matches!(result, Err(RpcError::Remote { .. })));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn backoff_is_consulted() {
        #[derive(Debug)]
        struct Recording(std::sync::Mutex<Vec<u32>>);
        impl Backoff for &'static Recording {
            fn delay(&self, next_attempt: u32) -> Duration {
                self.0.lock().unwrap().push(next_attempt);
                Duration::ZERO
            }
        }
        let recording: &'static Recording = Box::leak(Box::new(Recording(Default::default())));
        let policy = RetryPolicy::new(NonZeroU32::new(3).unwrap(), recording);
        let _: Result<(), RpcError> =
            policy.run(RpcError::is_retryable, |_| Err(RpcError::Timeout("m")));
        assert_eq!(*recording.0.lock().unwrap(), vec![2, 3]);
    }
}
