//! Explicit-wait engine: poll a condition over the UI surface until it
//! holds or a budget elapses.
//!
//! The engine re-resolves the locator on every tick, so it never holds a
//! handle across polls. "Element not found" and "stale element" raised by
//! the surface mid-poll mean *not rendered yet* for presence-like
//! conditions — the loop keeps polling until the budget runs out, which is
//! what separates "not yet rendered" from "will never render".

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::clock::Clock;
use crate::driver::{ElementHandle, UiSurface};
use crate::locator::Locator;
use crate::result::{ComprobarError, ComprobarResult};

/// Default timeout for wait operations (10 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 10_000;

/// Default polling interval (50ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

// =============================================================================
// CONDITIONS
// =============================================================================

/// A condition over the elements a locator resolves to.
///
/// Stateless; re-evaluated from scratch on every poll tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// At least one matching element exists in the DOM
    Present,
    /// At least one matching element is rendered and visible
    Visible,
    /// At least one matching element is visible and enabled
    Clickable,
    /// No matching element is visible (absent counts as invisible)
    Invisible,
    /// Some matching element's text equals the expected string
    TextEquals(String),
    /// Exactly this many elements match
    CountEquals(usize),
}

impl Condition {
    /// Short description used in timeout diagnostics
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Present => "present".to_string(),
            Self::Visible => "visible".to_string(),
            Self::Clickable => "clickable".to_string(),
            Self::Invisible => "invisible".to_string(),
            Self::TextEquals(text) => format!("text == {text:?}"),
            Self::CountEquals(count) => format!("count == {count}"),
        }
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.describe())
    }
}

// =============================================================================
// WAIT OPTIONS
// =============================================================================

/// Options for wait operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl WaitOptions {
    /// Create new wait options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Get poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

// =============================================================================
// WAIT OUTCOME
// =============================================================================

/// Result of a successful (or tolerated) wait
#[derive(Debug, Clone)]
pub struct WaitOutcome {
    /// Whether the condition held before the budget ran out
    pub success: bool,
    /// The matched element, for conditions that yield one
    pub handle: Option<ElementHandle>,
    /// Time spent waiting
    pub elapsed: Duration,
}

impl WaitOutcome {
    /// Condition held
    #[must_use]
    pub const fn success(elapsed: Duration, handle: Option<ElementHandle>) -> Self {
        Self {
            success: true,
            handle,
            elapsed,
        }
    }

    /// Budget ran out; used by callers that tolerate the miss
    #[must_use]
    pub const fn timed_out(elapsed: Duration) -> Self {
        Self {
            success: false,
            handle: None,
            elapsed,
        }
    }
}

// =============================================================================
// WAIT ENGINE
// =============================================================================

/// Outcome of one poll tick
enum Poll {
    Met(Option<ElementHandle>),
    NotYet,
}

/// Polls the UI surface until a condition holds or the budget elapses.
#[derive(Clone)]
pub struct WaitEngine {
    surface: Arc<dyn UiSurface>,
    clock: Arc<dyn Clock>,
    defaults: WaitOptions,
}

impl std::fmt::Debug for WaitEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaitEngine")
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}

impl WaitEngine {
    /// Create a wait engine with default options
    #[must_use]
    pub fn new(surface: Arc<dyn UiSurface>, clock: Arc<dyn Clock>) -> Self {
        Self::with_defaults(surface, clock, WaitOptions::default())
    }

    /// Create a wait engine with custom default options
    #[must_use]
    pub fn with_defaults(
        surface: Arc<dyn UiSurface>,
        clock: Arc<dyn Clock>,
        defaults: WaitOptions,
    ) -> Self {
        Self {
            surface,
            clock,
            defaults,
        }
    }

    /// The engine's default options
    #[must_use]
    pub const fn defaults(&self) -> &WaitOptions {
        &self.defaults
    }

    /// Wait until `condition` holds for `locator`.
    ///
    /// The condition is evaluated before the first sleep, so an
    /// already-true condition returns near-instantly. A condition that
    /// never holds fails with [`ComprobarError::Timeout`] after at most
    /// one poll interval past the budget.
    ///
    /// # Errors
    ///
    /// - [`ComprobarError::Configuration`] for a zero timeout or poll interval
    /// - [`ComprobarError::Timeout`] when the budget elapses
    /// - any non-absence surface error, verbatim
    pub fn wait_until(
        &self,
        locator: &Locator,
        condition: &Condition,
        options: &WaitOptions,
    ) -> ComprobarResult<WaitOutcome> {
        if options.timeout_ms == 0 || options.poll_interval_ms == 0 {
            return Err(ComprobarError::Configuration {
                message: format!(
                    "wait budget must be positive (timeout {}ms, poll {}ms)",
                    options.timeout_ms, options.poll_interval_ms
                ),
            });
        }

        let start = self.clock.now_ms();
        loop {
            if let Poll::Met(handle) = self.evaluate(locator, condition)? {
                let elapsed = Duration::from_millis(self.clock.elapsed_ms(start));
                debug!(%locator, %condition, ?elapsed, "wait satisfied");
                return Ok(WaitOutcome::success(elapsed, handle));
            }
            if self.clock.elapsed_ms(start) >= options.timeout_ms {
                warn!(%locator, %condition, timeout_ms = options.timeout_ms, "wait timed out");
                return Err(ComprobarError::Timeout {
                    locator: locator.to_string(),
                    condition: condition.describe(),
                    ms: options.timeout_ms,
                });
            }
            self.clock.sleep(options.poll_interval())?;
        }
    }

    /// One evaluation of the condition against the current DOM.
    ///
    /// Absence errors from the surface (not found, stale) are downgraded
    /// to `NotYet` for presence-like conditions and count as absence for
    /// `Invisible`/`CountEquals`; everything else propagates.
    fn evaluate(&self, locator: &Locator, condition: &Condition) -> ComprobarResult<Poll> {
        let handles = match self.surface.find_all(locator) {
            Ok(handles) => handles,
            Err(err) if err.is_absence() => Vec::new(),
            Err(err) => return Err(err),
        };

        match condition {
            Condition::Present => Ok(handles
                .into_iter()
                .next()
                .map_or(Poll::NotYet, |handle| Poll::Met(Some(handle)))),
            Condition::Visible => self.first_where(handles, |handle| {
                self.surface.is_visible(handle)
            }),
            Condition::Clickable => self.first_where(handles, |handle| {
                Ok(self.surface.is_visible(handle)? && self.surface.is_enabled(handle)?)
            }),
            Condition::Invisible => {
                for handle in &handles {
                    match self.surface.is_visible(handle) {
                        Ok(true) => return Ok(Poll::NotYet),
                        Ok(false) => {}
                        Err(err) if err.is_absence() => {}
                        Err(err) => return Err(err),
                    }
                }
                Ok(Poll::Met(None))
            }
            Condition::TextEquals(expected) => self.first_where(handles, |handle| {
                Ok(self.surface.text(handle)? == *expected)
            }),
            Condition::CountEquals(expected) => {
                if handles.len() == *expected {
                    Ok(Poll::Met(handles.into_iter().next()))
                } else {
                    Ok(Poll::NotYet)
                }
            }
        }
    }

    /// First handle satisfying the predicate; absence errors on a single
    /// handle skip that handle (it vanished between find and check).
    fn first_where(
        &self,
        handles: Vec<ElementHandle>,
        predicate: impl Fn(&ElementHandle) -> ComprobarResult<bool>,
    ) -> ComprobarResult<Poll> {
        for handle in handles {
            match predicate(&handle) {
                Ok(true) => return Ok(Poll::Met(Some(handle))),
                Ok(false) => {}
                Err(err) if err.is_absence() => {}
                Err(err) => return Err(err),
            }
        }
        Ok(Poll::NotYet)
    }

    // =========================================================================
    // Convenience waits
    // =========================================================================

    /// Wait for presence and return the matched handle
    pub fn present(&self, locator: &Locator) -> ComprobarResult<ElementHandle> {
        self.require_handle(locator, &Condition::Present)
    }

    /// Wait for visibility and return the matched handle
    pub fn visible(&self, locator: &Locator) -> ComprobarResult<ElementHandle> {
        self.require_handle(locator, &Condition::Visible)
    }

    /// Wait for clickability and return the matched handle
    pub fn clickable(&self, locator: &Locator) -> ComprobarResult<ElementHandle> {
        self.require_handle(locator, &Condition::Clickable)
    }

    /// Wait for every matching element to be gone or hidden
    pub fn gone(&self, locator: &Locator) -> ComprobarResult<WaitOutcome> {
        let defaults = self.defaults;
        self.wait_until(locator, &Condition::Invisible, &defaults)
    }

    /// Wait for a matching element whose text equals `expected`
    pub fn text_equals(
        &self,
        locator: &Locator,
        expected: impl Into<String>,
    ) -> ComprobarResult<ElementHandle> {
        self.require_handle(locator, &Condition::TextEquals(expected.into()))
    }

    /// Wait for the match count to equal `expected`
    pub fn count_equals(&self, locator: &Locator, expected: usize) -> ComprobarResult<WaitOutcome> {
        let defaults = self.defaults;
        self.wait_until(locator, &Condition::CountEquals(expected), &defaults)
    }

    /// Wait for an arbitrary predicate, polling at the engine's cadence.
    /// The predicate sees no elements; it is for page-level conditions
    /// (URL changed, counter reached a value) built outside the engine.
    pub fn wait_for_function<F>(
        &self,
        predicate: F,
        options: &WaitOptions,
        description: &str,
    ) -> ComprobarResult<WaitOutcome>
    where
        F: Fn() -> bool,
    {
        if options.timeout_ms == 0 || options.poll_interval_ms == 0 {
            return Err(ComprobarError::Configuration {
                message: format!(
                    "wait budget must be positive (timeout {}ms, poll {}ms)",
                    options.timeout_ms, options.poll_interval_ms
                ),
            });
        }
        let start = self.clock.now_ms();
        loop {
            if predicate() {
                let elapsed = Duration::from_millis(self.clock.elapsed_ms(start));
                return Ok(WaitOutcome::success(elapsed, None));
            }
            if self.clock.elapsed_ms(start) >= options.timeout_ms {
                return Err(ComprobarError::Timeout {
                    locator: "<none>".to_string(),
                    condition: description.to_string(),
                    ms: options.timeout_ms,
                });
            }
            self.clock.sleep(options.poll_interval())?;
        }
    }

    fn require_handle(
        &self,
        locator: &Locator,
        condition: &Condition,
    ) -> ComprobarResult<ElementHandle> {
        let defaults = self.defaults;
        let outcome = self.wait_until(locator, condition, &defaults)?;
        outcome
            .handle
            .ok_or_else(|| ComprobarError::ElementNotFound {
                locator: locator.to_string(),
            })
    }
}

// =============================================================================
// TESTS
// =============================================================================
