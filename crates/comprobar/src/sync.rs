//! Waits for transient UI artifacts: loading spinners, confirmation
//! toasts, and the results-vs-empty-state race.
//!
//! These are best-effort by design. A spinner or toast is optimistic UI —
//! its absence means the operation was already fast enough, and its
//! refusal to disappear is logged, not fatal, because the downstream
//! effect (cart count, order id) is independently verifiable by the
//! caller's own assertions.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::driver::UiSurface;
use crate::locator::Locator;
use crate::result::{ComprobarError, ComprobarResult};
use crate::wait::{Condition, WaitEngine, WaitOptions};

/// Default budget for overlay disappearance (5 seconds)
pub const DEFAULT_OVERLAY_TIMEOUT_MS: u64 = 5_000;

/// Default budget for toast appearance and disappearance (3 seconds each)
pub const DEFAULT_TOAST_TIMEOUT_MS: u64 = 3_000;

/// What the results area settled into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultsState {
    /// Result elements rendered
    Populated,
    /// The explicit empty-state marker rendered instead
    Empty,
}

/// Higher-level waits for transient UI artifacts, built on [`WaitEngine`].
#[derive(Clone)]
pub struct SyncHelper {
    surface: Arc<dyn UiSurface>,
    waits: WaitEngine,
    overlay_options: WaitOptions,
    toast_options: WaitOptions,
}

impl std::fmt::Debug for SyncHelper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncHelper")
            .field("overlay_options", &self.overlay_options)
            .field("toast_options", &self.toast_options)
            .finish_non_exhaustive()
    }
}

impl SyncHelper {
    /// Create a helper with default overlay/toast budgets
    #[must_use]
    pub fn new(surface: Arc<dyn UiSurface>, waits: WaitEngine) -> Self {
        let poll = waits.defaults().poll_interval_ms;
        Self {
            surface,
            waits,
            overlay_options: WaitOptions::new()
                .with_timeout(DEFAULT_OVERLAY_TIMEOUT_MS)
                .with_poll_interval(poll),
            toast_options: WaitOptions::new()
                .with_timeout(DEFAULT_TOAST_TIMEOUT_MS)
                .with_poll_interval(poll),
        }
    }

    /// Override the overlay-disappearance budget
    #[must_use]
    pub const fn with_overlay_options(mut self, options: WaitOptions) -> Self {
        self.overlay_options = options;
        self
    }

    /// Override the toast appear/disappear budget
    #[must_use]
    pub const fn with_toast_options(mut self, options: WaitOptions) -> Self {
        self.toast_options = options;
        self
    }

    /// If the overlay is visible right now, wait for it to clear; if it
    /// never appeared this is a near-instant no-op. A lingering overlay
    /// is logged and tolerated.
    pub fn await_overlay_clear(&self, spinner: &Locator) -> ComprobarResult<()> {
        if !self.currently_visible(spinner)? {
            debug!(locator = %spinner, "overlay never appeared, nothing to wait for");
            return Ok(());
        }
        match self
            .waits
            .wait_until(spinner, &Condition::Invisible, &self.overlay_options)
        {
            Ok(outcome) => {
                debug!(locator = %spinner, elapsed = ?outcome.elapsed, "overlay cleared");
                Ok(())
            }
            Err(ComprobarError::Timeout { ms, .. }) => {
                warn!(locator = %spinner, timeout_ms = ms, "overlay did not clear, proceeding anyway");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Wait for the toast to appear, then to disappear. If it never
    /// appears — it may already have come and gone between polls — the
    /// caller's operation is not failed: the effect it confirms is
    /// independently verifiable.
    pub fn await_toast(&self, toast: &Locator) -> ComprobarResult<()> {
        match self
            .waits
            .wait_until(toast, &Condition::Visible, &self.toast_options)
        {
            Ok(_) => {}
            Err(ComprobarError::Timeout { ms, .. }) => {
                warn!(locator = %toast, timeout_ms = ms, "toast never observed, proceeding");
                return Ok(());
            }
            Err(err) => return Err(err),
        }
        match self
            .waits
            .wait_until(toast, &Condition::Invisible, &self.toast_options)
        {
            Ok(_) => {
                debug!(locator = %toast, "toast shown and dismissed");
                Ok(())
            }
            Err(ComprobarError::Timeout { ms, .. }) => {
                warn!(locator = %toast, timeout_ms = ms, "toast still visible, proceeding");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Wait for results to render; only after that wait times out,
    /// consult the explicit empty-state marker once. Distinguishes
    /// "results not rendered yet" from "legitimately zero results". If
    /// neither state is reached the primary timeout propagates.
    pub fn await_results_or_empty(
        &self,
        results: &Locator,
        empty_marker: &Locator,
    ) -> ComprobarResult<ResultsState> {
        let defaults = *self.waits.defaults();
        match self.waits.wait_until(results, &Condition::Visible, &defaults) {
            Ok(_) => Ok(ResultsState::Populated),
            Err(timeout @ ComprobarError::Timeout { .. }) => {
                if self.currently_visible(empty_marker)? {
                    debug!(locator = %empty_marker, "empty-state marker shown instead of results");
                    Ok(ResultsState::Empty)
                } else {
                    warn!(results = %results, empty = %empty_marker, "neither results nor empty state rendered");
                    Err(timeout)
                }
            }
            Err(err) => Err(err),
        }
    }

    /// Single poll-free visibility probe; absence is `false`
    fn currently_visible(&self, locator: &Locator) -> ComprobarResult<bool> {
        let handles = match self.surface.find_all(locator) {
            Ok(handles) => handles,
            Err(err) if err.is_absence() => return Ok(false),
            Err(err) => return Err(err),
        };
        for handle in handles {
            match self.surface.is_visible(&handle) {
                Ok(true) => return Ok(true),
                Ok(false) => {}
                Err(err) if err.is_absence() => {}
                Err(err) => return Err(err),
            }
        }
        Ok(false)
    }
}

// =============================================================================
// TESTS
// =============================================================================
