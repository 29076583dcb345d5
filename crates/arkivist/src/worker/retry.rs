//! Attempt scheduling for stage jobs: bounded retries with backoff and
//! a hard per-attempt timeout.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::bounded;
use log::warn;

use crate::config::PipelineSettings;
use crate::error::ParseError;
use crate::pipeline::PipelineError;

#[derive(Clone, Debug)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Vec<Duration>,
    timeout: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Vec<Duration>, timeout: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
            timeout,
        }
    }

    pub fn from_settings(settings: &PipelineSettings) -> Self {
        Self::new(
            settings.max_attempts,
            settings
                .backoff_secs
                .iter()
                .map(|s| Duration::from_secs(*s))
                .collect(),
            Duration::from_secs(settings.stage_timeout_secs),
        )
    }

    /// Runs `attempt` up to `max_attempts` times, sleeping the backoff
    /// delay between attempts. Deterministic failures (unsupported or
    /// malformed input) surface after the first attempt instead of
    /// burning the budget. Each attempt runs on its own thread so a
    /// hung external tool cannot stall the worker past the timeout; a
    /// timed-out attempt is abandoned, not killed.
    pub fn run<T, F>(&self, operation: &str, attempt: F) -> Result<T, PipelineError>
    where
        T: Send + 'static,
        F: Fn() -> Result<T, PipelineError> + Send + Sync + 'static,
    {
        let attempt = Arc::new(attempt);
        let mut last_error = None;

        for number in 1..=self.max_attempts {
            let (tx, rx) = bounded(1);
            let f = Arc::clone(&attempt);
            thread::spawn(move || {
                let _ = tx.send(f());
            });

            match rx.recv_timeout(self.timeout) {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) if is_permanent(&e) => {
                    warn!("{} failed permanently on attempt {}: {}", operation, number, e);
                    return Err(e);
                }
                Ok(Err(e)) => {
                    warn!(
                        "{} attempt {}/{} failed: {}",
                        operation, number, self.max_attempts, e
                    );
                    last_error = Some(e);
                }
                Err(_) => {
                    warn!(
                        "{} attempt {}/{} timed out after {}s",
                        operation,
                        number,
                        self.max_attempts,
                        self.timeout.as_secs()
                    );
                    last_error = Some(PipelineError::Timeout(self.timeout.as_secs()));
                }
            }

            if number < self.max_attempts {
                thread::sleep(self.delay_after(number));
            }
        }

        match last_error {
            Some(e) => Err(e),
            None => Err(PipelineError::Timeout(self.timeout.as_secs())),
        }
    }

    /// Delay after the n-th failed attempt (1-based). The last backoff
    /// entry repeats when attempts outnumber entries.
    fn delay_after(&self, attempt: u32) -> Duration {
        if self.backoff.is_empty() {
            return Duration::ZERO;
        }
        let index = (attempt as usize - 1).min(self.backoff.len() - 1);
        self.backoff[index]
    }
}

/// Failures a rerun cannot fix: no parser exists for the format, or the
/// input itself is malformed.
fn is_permanent(error: &PipelineError) -> bool {
    matches!(
        error,
        PipelineError::Parse(ParseError::UnsupportedFormat(_) | ParseError::ParseFailure(_))
    )
}
