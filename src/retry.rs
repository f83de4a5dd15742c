//! Exponential backoff shared by the broker client and the file fetcher.
use log::warn;
use std::time::Duration;

use crate::error::GillError;

/// Doubling schedule from `initial` up to and including `cap`.
///
/// Each value is used both as the timeout of one attempt and as the pause after that attempt
/// fails, so the number of attempts is the length of the schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub initial: Duration,
    pub cap: Duration,
}

impl Backoff {
    pub const fn new(initial: Duration, cap: Duration) -> Backoff {
        Backoff { initial, cap }
    }

    /// 1, 2, 4, ..., 128 seconds.
    pub const fn broker() -> Backoff {
        Backoff::new(Duration::from_secs(1), Duration::from_secs(128))
    }

    /// 1, 2, 4, ..., 64 seconds.
    pub const fn fetch() -> Backoff {
        Backoff::new(Duration::from_secs(1), Duration::from_secs(64))
    }

    /// The full schedule. Always holds at least one value.
    ///
    /// ```
    /// use gillstream::Backoff;
    /// use std::time::Duration;
    ///
    /// let delays: Vec<u64> = Backoff::fetch().delays().iter().map(Duration::as_secs).collect();
    /// assert_eq!(delays, vec![1, 2, 4, 8, 16, 32, 64]);
    /// ```
    pub fn delays(&self) -> Vec<Duration> {
        let mut delays = vec![];
        let mut delay = self.initial;
        loop {
            delays.push(delay);
            if delay.is_zero() || delay >= self.cap {
                break;
            }
            delay = std::cmp::min(delay * 2, self.cap);
        }
        delays
    }

    pub fn attempts(&self) -> usize {
        self.delays().len()
    }
}

/// Pauses between retry attempts.
pub trait Sleeper: Send {
    fn sleep(&self, duration: Duration);
}

/// [Sleeper] that blocks the current thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Run `attempt` with each timeout of `backoff` until it succeeds.
///
/// After a failed attempt, `sleeper` pauses for that attempt's timeout before the next one; there
/// is no pause after the last attempt. Once the schedule is exhausted the last error is returned
/// together with the number of attempts made.
pub fn retry_with_backoff<T, F>(
    backoff: &Backoff,
    sleeper: &dyn Sleeper,
    what: &str,
    mut attempt: F,
) -> Result<T, (GillError, usize)>
where
    F: FnMut(Duration) -> Result<T, GillError>,
{
    let delays = backoff.delays();
    let mut attempts = 0;
    loop {
        let delay = delays.get(attempts).copied().unwrap_or(backoff.cap);
        attempts += 1;
        match attempt(delay) {
            Ok(value) => return Ok(value),
            Err(e) if attempts >= delays.len() => {
                warn!("{} failed (attempt {}/{}): {}", what, attempts, delays.len(), e);
                return Err((e, attempts));
            }
            Err(e) => {
                warn!(
                    "{} failed (attempt {}/{}): {}; retrying in {:?}",
                    what,
                    attempts,
                    delays.len(),
                    e,
                    delay
                );
                sleeper.sleep(delay);
            }
        }
    }
}
