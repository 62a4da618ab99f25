//! One execution unit's bundle of surface, clock, and configuration.
//!
//! A [`Session`] is owned exclusively by one test execution for its
//! lifetime — surfaces are never shared between concurrently running
//! executions, and all operations against a session are strictly
//! sequential. Page objects compose against a session's engines.

use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::config::HarnessConfig;
use crate::driver::UiSurface;
use crate::interaction::Interactor;
use crate::sync::SyncHelper;
use crate::wait::{WaitEngine, WaitOptions};

/// The harness entry point for one test execution.
#[derive(Clone)]
pub struct Session {
    surface: Arc<dyn UiSurface>,
    clock: Arc<dyn Clock>,
    config: HarnessConfig,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Create a session over a surface with the real system clock
    #[must_use]
    pub fn new(surface: Arc<dyn UiSurface>, config: HarnessConfig) -> Self {
        Self::with_clock(surface, Arc::new(SystemClock::new()), config)
    }

    /// Create a session with an explicit clock (tests inject a fake one)
    #[must_use]
    pub fn with_clock(
        surface: Arc<dyn UiSurface>,
        clock: Arc<dyn Clock>,
        config: HarnessConfig,
    ) -> Self {
        Self {
            surface,
            clock,
            config,
        }
    }

    /// The session's configuration
    #[must_use]
    pub const fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Wait engine configured with the session's budgets
    #[must_use]
    pub fn waits(&self) -> WaitEngine {
        WaitEngine::with_defaults(
            Arc::clone(&self.surface),
            Arc::clone(&self.clock),
            WaitOptions::new()
                .with_timeout(self.config.wait_timeout_ms)
                .with_poll_interval(self.config.poll_interval_ms),
        )
    }

    /// Interaction layer sharing the session's wait engine
    #[must_use]
    pub fn actions(&self) -> Interactor {
        Interactor::new(
            Arc::clone(&self.surface),
            Arc::clone(&self.clock),
            self.waits(),
        )
    }

    /// Synchronization helpers with the session's overlay/toast budgets
    #[must_use]
    pub fn sync(&self) -> SyncHelper {
        SyncHelper::new(Arc::clone(&self.surface), self.waits())
            .with_overlay_options(
                WaitOptions::new()
                    .with_timeout(self.config.overlay_timeout_ms)
                    .with_poll_interval(self.config.poll_interval_ms),
            )
            .with_toast_options(
                WaitOptions::new()
                    .with_timeout(self.config.toast_timeout_ms)
                    .with_poll_interval(self.config.poll_interval_ms),
            )
    }
}
