//! Monotonic clock and sleep abstraction for poll scheduling.
//!
//! The wait engine never calls `Instant::now` or `thread::sleep` directly;
//! it goes through [`Clock`], so tests swap in [`FakeClock`] and validate
//! timing properties deterministically without real sleeps.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::result::{ComprobarError, ComprobarResult};

/// Monotonic time plus a sleep primitive.
///
/// `sleep` is fallible: an interrupted sleep surfaces
/// [`ComprobarError::Interrupted`], and callers must abandon the
/// in-flight operation rather than resume it.
pub trait Clock: Send + Sync {
    /// Milliseconds since an arbitrary fixed origin. Monotonic.
    fn now_ms(&self) -> u64;

    /// Block for the given duration.
    fn sleep(&self, duration: Duration) -> ComprobarResult<()>;

    /// Milliseconds elapsed since an earlier `now_ms` reading
    fn elapsed_ms(&self, since_ms: u64) -> u64 {
        self.now_ms().saturating_sub(since_ms)
    }
}

/// Real clock: `Instant`-based time, `thread::sleep` for pacing.
#[derive(Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Create a system clock with its origin at construction time
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    fn sleep(&self, duration: Duration) -> ComprobarResult<()> {
        std::thread::sleep(duration);
        Ok(())
    }
}

/// Fake clock for deterministic tests.
///
/// `sleep` advances fake time instead of blocking, so a wait loop that
/// would take seconds of wall-clock time completes instantly while still
/// observing exact poll cadence. `interrupt_after(n)` scripts the nth
/// subsequent sleep to report interruption, for cancellation tests.
#[derive(Debug)]
pub struct FakeClock {
    current_ms: AtomicU64,
    sleeps_until_interrupt: Mutex<Option<u64>>,
    sleep_count: AtomicU64,
}

impl FakeClock {
    /// Create a fake clock starting at time zero
    #[must_use]
    pub fn new() -> Self {
        Self {
            current_ms: AtomicU64::new(0),
            sleeps_until_interrupt: Mutex::new(None),
            sleep_count: AtomicU64::new(0),
        }
    }

    /// Create a fake clock starting at the given time
    #[must_use]
    pub fn starting_at(ms: u64) -> Self {
        let clock = Self::new();
        clock.current_ms.store(ms, Ordering::SeqCst);
        clock
    }

    /// Advance fake time by the given number of milliseconds
    pub fn advance_ms(&self, ms: u64) {
        self.current_ms.fetch_add(ms, Ordering::SeqCst);
    }

    /// Script the `n`th subsequent sleep (1-based) to be interrupted.
    /// Earlier sleeps complete normally; the interrupted sleep does not
    /// advance time.
    pub fn interrupt_after(&self, n: u64) {
        let threshold = self.sleep_count.load(Ordering::SeqCst) + n;
        *self
            .sleeps_until_interrupt
            .lock()
            .expect("fake clock lock poisoned") = Some(threshold);
    }

    /// Total sleeps observed so far
    #[must_use]
    pub fn sleep_count(&self) -> u64 {
        self.sleep_count.load(Ordering::SeqCst)
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now_ms(&self) -> u64 {
        self.current_ms.load(Ordering::SeqCst)
    }

    fn sleep(&self, duration: Duration) -> ComprobarResult<()> {
        let count = self.sleep_count.fetch_add(1, Ordering::SeqCst) + 1;
        let interrupt_at = *self
            .sleeps_until_interrupt
            .lock()
            .expect("fake clock lock poisoned");
        if let Some(threshold) = interrupt_at {
            if count >= threshold {
                return Err(ComprobarError::Interrupted {
                    message: format!("sleep of {}ms interrupted", duration.as_millis()),
                });
            }
        }
        self.advance_ms(duration.as_millis() as u64);
        Ok(())
    }
}
