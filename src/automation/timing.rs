//! Cancellation token, jitter ranges, and the interruptible sleep every wait
//! in the bot goes through.
//!
//! Sleeping happens in short ticks so an operator stop is observed within
//! one tick no matter how long the requested wait is.

use anyhow::Result;
use rand::Rng;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::error::BotError;

/// Granularity of the interruptible sleep.
pub const TICK: Duration = Duration::from_millis(50);

/// Set-once stop flag shared between the stop listener and the bot.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the token cancelled. Returns true only for the call that flipped it.
    pub fn cancel(&self) -> bool {
        !self.0.swap(true, Ordering::SeqCst)
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Source of monotonic time and real waiting.
pub trait Clock {
    /// Time elapsed since the clock was created.
    fn now(&self) -> Duration;
    fn sleep(&self, d: Duration);
}

pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&self, d: Duration) {
        std::thread::sleep(d);
    }
}

/// Clock that advances only when slept on.
#[cfg(test)]
#[derive(Clone, Default)]
pub struct ManualClock(std::rc::Rc<std::cell::Cell<Duration>>);

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.0.get()
    }

    fn sleep(&self, d: Duration) {
        self.0.set(self.0.get() + d);
    }
}

/// A `[min, max]` range of seconds for uniform random delays.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(try_from = "[f64; 2]")]
pub struct DelayRange {
    pub min: f64,
    pub max: f64,
}

impl DelayRange {
    #[cfg(test)]
    pub fn fixed(secs: f64) -> Self {
        Self {
            min: secs,
            max: secs,
        }
    }

    /// Draws a delay uniformly from the range.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let secs = if self.max > self.min {
            rng.random_range(self.min..=self.max)
        } else {
            self.min
        };
        Duration::from_secs_f64(secs)
    }
}

impl TryFrom<[f64; 2]> for DelayRange {
    type Error = String;

    fn try_from([min, max]: [f64; 2]) -> std::result::Result<Self, Self::Error> {
        if !min.is_finite() || !max.is_finite() || min < 0.0 || min > max {
            return Err(format!("invalid delay range [{}, {}]", min, max));
        }
        if Duration::try_from_secs_f64(max).is_err() {
            return Err(format!("delay range [{}, {}] is too long", min, max));
        }
        Ok(Self { min, max })
    }
}

/// Deserializes a number of seconds into a `Duration`.
///
/// Negative, non-finite and unrepresentably large values are rejected.
pub fn deserialize_secs<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = f64::deserialize(deserializer)?;
    Duration::try_from_secs_f64(secs)
        .map_err(|e| D::Error::custom(format!("invalid duration {} s: {}", secs, e)))
}

/// Interruptible waiting bound to one cancellation token.
pub struct Pacer {
    cancel: CancelToken,
    clock: Box<dyn Clock>,
}

impl Pacer {
    pub fn new(cancel: CancelToken, clock: Box<dyn Clock>) -> Self {
        Self { cancel, clock }
    }

    pub fn token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    /// Fails with [`BotError::Cancelled`] if a stop was requested.
    pub fn check(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(BotError::Cancelled.into());
        }
        Ok(())
    }

    /// Waits `d`, waking every [`TICK`] to observe cancellation.
    pub fn sleep(&self, d: Duration) -> Result<()> {
        let end = self.clock.now() + d;
        loop {
            self.check()?;
            let now = self.clock.now();
            if now >= end {
                return Ok(());
            }
            self.clock.sleep((end - now).min(TICK));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::is_cancelled;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_cancel_is_set_once() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        assert!(token.cancel());
        assert!(!token.cancel());
        assert!(token.clone().is_cancelled());
    }

    #[test]
    fn test_sleep_completes_on_manual_clock() {
        let clock = ManualClock::default();
        let pacer = Pacer::new(CancelToken::new(), Box::new(clock.clone()));
        pacer.sleep(Duration::from_millis(1230)).unwrap();
        assert_eq!(clock.now(), Duration::from_millis(1230));
    }

    #[test]
    fn test_sleep_fails_immediately_when_already_cancelled() {
        let token = CancelToken::new();
        token.cancel();
        let clock = ManualClock::default();
        let pacer = Pacer::new(token, Box::new(clock.clone()));
        let err = pacer.sleep(Duration::from_secs(30)).unwrap_err();
        assert!(is_cancelled(&err));
        assert_eq!(clock.now(), Duration::ZERO);
    }

    #[test]
    fn test_cancel_mid_sleep_returns_within_a_tick() {
        let token = CancelToken::new();
        let pacer = Pacer::new(token.clone(), Box::new(SystemClock::new()));
        let setter = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(150));
            token.cancel();
        });

        let started = Instant::now();
        let err = pacer.sleep(Duration::from_secs(10)).unwrap_err();
        let waited = started.elapsed();
        setter.join().unwrap();

        assert!(is_cancelled(&err));
        assert!(
            waited < Duration::from_millis(150) + TICK * 4,
            "sleep took {:?}",
            waited
        );
    }

    #[test]
    fn test_delay_range_sample_within_bounds() {
        let mut rng = StdRng::seed_from_u64(11);
        let range = DelayRange { min: 0.2, max: 0.5 };
        for _ in 0..500 {
            let d = range.sample(&mut rng).as_secs_f64();
            assert!((0.2 - 1e-9..=0.5 + 1e-9).contains(&d), "{}", d);
        }
        assert_eq!(
            DelayRange::fixed(1.5).sample(&mut rng),
            Duration::from_millis(1500)
        );
    }

    #[test]
    fn test_delay_range_rejects_inverted() {
        assert!(DelayRange::try_from([2.0, 1.0]).is_err());
        assert!(DelayRange::try_from([-1.0, 1.0]).is_err());
        assert!(DelayRange::try_from([0.5, 0.5]).is_ok());
        assert!(DelayRange::try_from([0.5, 1.0e30]).is_err());
    }
}
